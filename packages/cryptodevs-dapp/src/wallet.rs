//! Wallet selection: picks a provider from the configured connectors.

use async_trait::async_trait;
use std::time::Duration;
use tracing::{info, warn};

use crate::config::ConnectorConfig;
use crate::provider::{WalletLink, WalletProvider};

/// The wallet-selection capability (a modal, in a browser).
#[async_trait]
pub trait WalletModal: Send + Sync {
    async fn select(&self) -> Result<WalletLink, crate::Error>;
}

/// Tries each configured connector in order and returns the first that answers.
pub struct ConnectorModal {
    connectors: Vec<ConnectorConfig>,
    timeout: Duration,
}

impl ConnectorModal {
    pub fn new(connectors: Vec<ConnectorConfig>, timeout: Duration) -> Self {
        Self {
            connectors,
            timeout,
        }
    }
}

#[async_trait]
impl WalletModal for ConnectorModal {
    async fn select(&self) -> Result<WalletLink, crate::Error> {
        if self.connectors.is_empty() {
            return Err(crate::Error::ProviderUnavailable(
                "no wallet connectors configured".into(),
            ));
        }

        let mut failures = Vec::with_capacity(self.connectors.len());
        for connector in &self.connectors {
            let label = connector.kind.as_str();
            let candidate = WalletProvider::new(
                WalletLink::http(label, &connector.url, self.timeout)?,
                self.timeout,
                self.timeout,
            );
            match candidate.chain_id().await {
                Ok(_) => {
                    info!(connector = label, url = %connector.url, "Wallet connector selected");
                    return WalletLink::http(label, &connector.url, self.timeout);
                }
                Err(e) => {
                    warn!(connector = label, error = %e, "Wallet connector unavailable");
                    failures.push(format!("{label}: {e}"));
                }
            }
        }

        Err(crate::Error::ProviderUnavailable(failures.join("; ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConnectorKind;

    #[tokio::test]
    async fn test_no_connectors_is_provider_unavailable() {
        let modal = ConnectorModal::new(vec![], Duration::from_secs(1));
        let err = modal.select().await.err().unwrap();
        assert!(matches!(err, crate::Error::ProviderUnavailable(_)));
    }

    #[tokio::test]
    async fn test_unreachable_connectors_are_reported() {
        let modal = ConnectorModal::new(
            vec![ConnectorConfig {
                kind: ConnectorKind::Injected,
                url: "http://127.0.0.1:1".into(),
            }],
            Duration::from_secs(2),
        );
        match modal.select().await {
            Err(crate::Error::ProviderUnavailable(msg)) => assert!(msg.contains("injected")),
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("port 1 should not answer"),
        }
    }
}
