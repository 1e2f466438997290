//! HTTP request handlers.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::{Extension, Json};
use cryptodevs_types::{Action, NftMetadata, TokenRotation};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{info, warn};

use crate::metrics::METRICS;
use crate::middleware::RequestId;
use crate::response::{
    ActionRequest, ActionResponse, DisconnectResponse, HealthResponse, StatusResponse,
};
use crate::state::AppState;

/// Health check with session and RPC status. Reads the chain id without
/// touching the session.
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let rpc_status = match state.session.observed_chain_id().await {
        None => "n/a",
        Some(Ok(chain_id)) if chain_id == state.session.required_chain_id() => "ok",
        Some(Ok(_)) => "wrong_network",
        Some(Err(_)) => "unavailable",
    };
    let status = match rpc_status {
        "ok" | "n/a" => "ok",
        _ => "degraded",
    };

    Json(HealthResponse {
        status,
        connected: state.session.is_connected(),
        required_chain_id: state.session.required_chain_id(),
        rpc_status,
        uptime_secs: state.start_time.elapsed().as_secs(),
        requests: state.request_count.load(Ordering::Relaxed),
    })
}

/// Session, derived mint state and the permitted action.
pub async fn status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.request_count.fetch_add(1, Ordering::Relaxed);
    let view = state.mint.snapshot();
    let action = state.gate.current_action();
    Json(StatusResponse {
        session: state.session.snapshot(),
        phase: view.phase,
        role: view.role,
        supply: view.supply,
        action,
        label: action.label(),
        in_flight: state.gate.in_flight(),
        phase_polling: state.poller.phase_polling_active(),
        showcase: view.showcase,
        notices: state.notices.recent(),
    })
}

/// Execute the permitted action through the gate.
pub async fn action(
    State(state): State<Arc<AppState>>,
    Extension(RequestId(request_id)): Extension<RequestId>,
    Json(request): Json<ActionRequest>,
) -> Result<Json<ActionResponse>, crate::Error> {
    state.request_count.fetch_add(1, Ordering::Relaxed);

    let action: Action = request.action.trim().parse()?;
    info!(action = action.as_str(), request_id = %request_id, "Action requested");

    match state.gate.execute(action).await {
        Ok(outcome) => Ok(Json(ActionResponse::ok(outcome))),
        Err(e) => {
            warn!(action = action.as_str(), request_id = %request_id, error = %e, "Action rejected");
            Err(e)
        }
    }
}

/// End the wallet session and stop polling.
pub async fn disconnect(
    State(state): State<Arc<AppState>>,
    Extension(RequestId(request_id)): Extension<RequestId>,
) -> Json<DisconnectResponse> {
    state.request_count.fetch_add(1, Ordering::Relaxed);
    info!(request_id = %request_id, "Disconnect requested");
    state.gate.disconnect().await;
    Json(DisconnectResponse {
        success: true,
        session: state.session.snapshot(),
        next: state.gate.current_action(),
    })
}

/// Token metadata document.
pub async fn token_metadata(
    State(state): State<Arc<AppState>>,
    Path(token_id): Path<String>,
) -> Result<Json<NftMetadata>, crate::Error> {
    let id = TokenRotation::new(state.config.max_token_ids).parse_id(&token_id)?;
    Ok(Json(NftMetadata::for_token(id, &state.config.image_base_url)))
}

/// Prometheus metrics in text exposition format.
pub async fn metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let supply = state.mint.supply();
    let body = METRICS.render(
        supply.minted,
        supply.cap,
        state.gate.in_flight(),
        state.session.is_connected(),
    );
    (
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4",
        )],
        body,
    )
}
