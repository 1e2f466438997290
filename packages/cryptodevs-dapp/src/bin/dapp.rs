//! Crypto Devs dApp binary.

use cryptodevs_dapp::metadata::{run_rotation, MetadataSource};
use cryptodevs_dapp::{create_router, AppState, Config};
use cryptodevs_types::{Action, TokenRotation};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Crypto Devs dApp");

    let config: Config = config::Config::builder()
        .add_source(config::File::with_name("cryptodevs").required(false))
        .add_source(config::Environment::with_prefix("CRYPTODEVS"))
        .build()
        .and_then(|c| c.try_deserialize())
        .unwrap_or_else(|e| {
            // Fall back only when no config exists; parsing errors fail hard.
            let err_str = format!("{e}");
            if err_str.contains("not found") {
                warn!(error = %e, "No config file found, using defaults");
                Config::default()
            } else {
                error!(error = %e, "FATAL: config error, fix CRYPTODEVS_* or cryptodevs.toml");
                std::process::exit(1);
            }
        });

    if let Err(e) = config.validate() {
        error!(error = %e, "FATAL: invalid configuration");
        std::process::exit(1);
    }

    info!(
        contract = %config.contract_address,
        chain_id = config.chain_id,
        network = %config.network_name,
        connectors = config.enabled_connectors().len(),
        "Configuration loaded"
    );

    let bind_address = config.bind_address.clone();
    let state = Arc::new(AppState::new(config)?);

    if state.config.auto_connect {
        // A failed connect leaves the page on "connect wallet"; the user retries.
        match state.gate.execute(Action::ConnectWallet).await {
            Ok(_) => info!("Wallet connected on startup"),
            Err(e) => warn!(error = %e, "Wallet not connected on startup"),
        }
    }

    let source: Arc<dyn MetadataSource> = state.metadata.clone();
    tokio::spawn(run_rotation(
        source,
        state.mint.clone(),
        TokenRotation::new(state.config.max_token_ids),
        state.config.rotation_interval(),
        state.shutdown.clone(),
    ));

    let app = create_router(state.clone());

    info!(address = %bind_address, "Listening");

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // --- Graceful shutdown: stop timers, let an in-flight action finish ---
    info!("HTTP server stopped, stopping background tasks...");
    state.poller.stop();
    state.shutdown.cancel();

    let drain_deadline = tokio::time::Instant::now() + std::time::Duration::from_secs(30);
    while state.gate.in_flight() {
        if tokio::time::Instant::now() >= drain_deadline {
            warn!("Drain timeout, an action may still be pending in the wallet");
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    }

    state.gate.disconnect().await;
    info!("dApp shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT, shutting down..."),
        _ = terminate => info!("Received SIGTERM, shutting down..."),
    }
}
