use anyhow::Result;
use async_trait::async_trait;
use axum::http::StatusCode;
use cryptodevs_dapp::metadata::{run_rotation, HttpMetadataClient, MetadataSource};
use cryptodevs_dapp::testing::FakeWallet;
use cryptodevs_types::{MintPhase, NftMetadata, TokenRotation};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::utils::{dapp_on, unix_now};

/// Serve the router on an ephemeral port, returning its base URL.
async fn serve(app: axum::Router) -> Result<String> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok(format!("http://{addr}"))
}

/// Wraps a source and records the ids the rotation asked for.
struct Recorder {
    inner: HttpMetadataClient,
    seen: Mutex<Vec<u64>>,
}

impl Recorder {
    fn seen(&self) -> Vec<u64> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl MetadataSource for Recorder {
    async fn fetch(&self, token_id: u64) -> Result<NftMetadata, cryptodevs_dapp::Error> {
        self.seen.lock().unwrap().push(token_id);
        self.inner.fetch(token_id).await
    }
}

#[tokio::test]
async fn test_metadata_endpoint_serves_collection() -> Result<()> {
    let d = dapp_on(FakeWallet::new(4))?;

    let (status, body) = d.get("/api/20").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Crypto Dev #20");
    assert_eq!(
        body["description"],
        "Crypto Dev is a collection of developers in crypto"
    );
    assert!(body["image"].as_str().unwrap_or_default().ends_with("/19.svg"));

    for bad in ["0", "21"] {
        let (status, body) = d.get(&format!("/api/{bad}")).await?;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);
    }
    Ok(())
}

#[tokio::test]
async fn test_http_client_reads_own_endpoint() -> Result<()> {
    let d = dapp_on(FakeWallet::new(4))?;
    let base = serve(d.app.clone()).await?;
    let client = HttpMetadataClient::new(&base, Duration::from_secs(5))?;

    let meta = client.fetch(3).await?;
    assert_eq!(meta.name, "Crypto Dev #3");
    assert!(matches!(
        client.fetch(21).await,
        Err(cryptodevs_dapp::Error::Metadata(_))
    ));
    Ok(())
}

// =============================================================================
// E: rotation cycles 1..=20 and wraps, independent of mint phase
// =============================================================================

async fn rotate_once_around(base: &str, d: &crate::utils::Dapp) -> Result<Vec<u64>> {
    let recorder = Arc::new(Recorder {
        inner: HttpMetadataClient::new(base, Duration::from_secs(5))?,
        seen: Mutex::new(Vec::new()),
    });
    let cancel = CancellationToken::new();
    let task = tokio::spawn(run_rotation(
        recorder.clone(),
        d.state.mint.clone(),
        TokenRotation::new(20),
        Duration::from_millis(5),
        cancel.clone(),
    ));

    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    while recorder.seen().len() < 22 {
        assert!(tokio::time::Instant::now() < deadline, "rotation stalled");
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    cancel.cancel();
    task.await?;
    Ok(recorder.seen())
}

#[tokio::test]
async fn test_rotation_wraps_over_http_in_any_phase() -> Result<()> {
    let wallet = FakeWallet::new(4);
    wallet.set_presale(true, unix_now() - 1);
    let d = dapp_on(wallet)?;
    let base = serve(d.app.clone()).await?;
    let expected: Vec<u64> = (1..=20).chain([1, 2]).collect();

    // Before any wallet connection.
    let seen = rotate_once_around(&base, &d).await?;
    assert_eq!(seen[..22], expected[..]);
    assert!(d.state.mint.snapshot().showcase.is_some());

    // Again once the sale is public.
    d.action("connect_wallet").await?;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(d.state.mint.phase(), Some(MintPhase::PublicSale));
    let seen = rotate_once_around(&base, &d).await?;
    assert_eq!(seen[..22], expected[..]);

    d.state.poller.stop();
    Ok(())
}
