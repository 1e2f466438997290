//! HTTP router setup.

use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::middleware;
use crate::state::AppState;

/// Headroom over the transaction wait so `/action` reports its own timeout.
const REQUEST_TIMEOUT_SLACK: Duration = Duration::from_secs(30);

/// Create the application router.
pub fn create(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);
    let request_timeout = state.config.tx_timeout() + REQUEST_TIMEOUT_SLACK;

    Router::new()
        .route("/health", get(handlers::health))
        .route("/status", get(handlers::status))
        .route("/action", post(handlers::action))
        .route("/disconnect", post(handlers::disconnect))
        .route("/api/{token_id}", get(handlers::token_metadata))
        .route("/metrics", get(handlers::metrics))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            request_timeout,
        ))
        .layer(axum::middleware::from_fn(middleware::inject_request_id))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
