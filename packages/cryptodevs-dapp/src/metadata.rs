//! Token metadata: the HTTP client and the showcase rotation.

use async_trait::async_trait;
use cryptodevs_types::{NftMetadata, TokenRotation};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::metrics::METRICS;
use crate::state::{MintState, Showcase};

/// Where the rotation gets token metadata from.
#[async_trait]
pub trait MetadataSource: Send + Sync {
    async fn fetch(&self, token_id: u64) -> Result<NftMetadata, crate::Error>;
}

/// GETs `{base}/api/{id}`.
pub struct HttpMetadataClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpMetadataClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, crate::Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| crate::Error::Config(format!("http client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn url_for(&self, token_id: u64) -> String {
        format!("{}/api/{token_id}", self.base_url)
    }
}

#[async_trait]
impl MetadataSource for HttpMetadataClient {
    async fn fetch(&self, token_id: u64) -> Result<NftMetadata, crate::Error> {
        let url = self.url_for(token_id);
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| crate::Error::Metadata(format!("GET {url}: {e}")))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(crate::Error::Metadata(format!("GET {url}: HTTP {status}")));
        }
        resp.json::<NftMetadata>()
            .await
            .map_err(|e| crate::Error::Metadata(format!("GET {url}: bad body: {e}")))
    }
}

/// Cycle the showcase through the collection until `cancel` fires.
///
/// Fetch, publish, advance, wait. A failed fetch keeps the previous showcase
/// and still advances.
pub async fn run_rotation(
    source: Arc<dyn MetadataSource>,
    mint: Arc<MintState>,
    mut rotation: TokenRotation,
    every: Duration,
    cancel: CancellationToken,
) {
    info!(every_ms = every.as_millis() as u64, "Showcase rotation started");
    loop {
        let token_id = rotation.current();
        match source.fetch(token_id).await {
            Ok(metadata) => {
                debug!(token_id, name = %metadata.name, "Showcase updated");
                mint.set_showcase(Showcase { token_id, metadata });
            }
            Err(e) => {
                METRICS.rotation_errors.fetch_add(1, Ordering::Relaxed);
                warn!(token_id, error = %e, "Showcase fetch failed");
            }
        }
        rotation.advance();

        tokio::select! {
            _ = tokio::time::sleep(every) => {},
            _ = cancel.cancelled() => {
                info!("Showcase rotation shutting down");
                return;
            }
        }
    }
}
