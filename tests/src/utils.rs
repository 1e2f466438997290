use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use cryptodevs_dapp::testing::{FakeWallet, StaticModal};
use cryptodevs_dapp::{create_router, AppState, Config};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

pub use cryptodevs_dapp::testing::{unix_now, BUYER, OWNER};

/// A dApp wired to an in-memory wallet on the required network (4) unless told otherwise.
pub struct Dapp {
    pub wallet: Arc<FakeWallet>,
    pub state: Arc<AppState>,
    pub app: Router,
}

pub fn test_config() -> Config {
    Config {
        contract_address: FakeWallet::CONTRACT.to_string(),
        receipt_poll_ms: 20,
        ..Config::default()
    }
}

pub fn dapp_on(wallet: FakeWallet) -> anyhow::Result<Dapp> {
    dapp_with(wallet, test_config())
}

pub fn dapp_with(wallet: FakeWallet, config: Config) -> anyhow::Result<Dapp> {
    let wallet = Arc::new(wallet);
    let state = Arc::new(AppState::with_modal(
        config,
        Arc::new(StaticModal::new(wallet.clone())),
    )?);
    let app = create_router(state.clone());
    Ok(Dapp { wallet, state, app })
}

impl Dapp {
    pub async fn get(&self, uri: &str) -> anyhow::Result<(StatusCode, Value)> {
        let req = Request::get(uri).body(Body::empty())?;
        self.send(req).await
    }

    pub async fn action(&self, action: &str) -> anyhow::Result<(StatusCode, Value)> {
        let req = Request::post("/action")
            .header("content-type", "application/json")
            .body(Body::from(serde_json::json!({ "action": action }).to_string()))?;
        self.send(req).await
    }

    pub async fn disconnect(&self) -> anyhow::Result<(StatusCode, Value)> {
        let req = Request::post("/disconnect").body(Body::empty())?;
        self.send(req).await
    }

    async fn send(&self, req: Request<Body>) -> anyhow::Result<(StatusCode, Value)> {
        let resp = self.app.clone().oneshot(req).await?;
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), 1 << 20).await?;
        Ok((status, serde_json::from_slice(&bytes)?))
    }
}
