//! Chain session: owns the wallet connection and hands out network-validated handles.

use alloy::primitives::Address;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{info, warn};

use crate::metrics::METRICS;
use crate::notify::Notifier;
use crate::provider::WalletProvider;
use crate::wallet::WalletModal;

/// Receipt polling interval unless configured.
const DEFAULT_RECEIPT_POLL: Duration = Duration::from_millis(250);

/// Connection state visible to the rest of the core.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Session {
    pub connected: bool,
    /// Last network id the wallet reported.
    pub chain_id: Option<u64>,
    pub signer_address: Option<Address>,
}

/// Write-capable handle bound to one wallet address.
#[derive(Clone)]
pub struct SignerHandle {
    provider: WalletProvider,
    address: Address,
}

impl SignerHandle {
    pub fn address(&self) -> Address {
        self.address
    }

    pub fn provider(&self) -> &WalletProvider {
        &self.provider
    }
}

pub enum Handle {
    Provider(WalletProvider),
    Signer(SignerHandle),
}

/// Wallet session with a single accepted network.
pub struct ChainSession {
    modal: Arc<dyn WalletModal>,
    notifier: Arc<dyn Notifier>,
    required_chain_id: u64,
    network_name: String,
    rpc_timeout: Duration,
    receipt_poll: Duration,
    /// Serializes connection so concurrent callers open the modal once.
    provider: AsyncMutex<Option<WalletProvider>>,
    state: RwLock<Session>,
    modal_opens: AtomicU64,
}

impl ChainSession {
    pub fn new(
        modal: Arc<dyn WalletModal>,
        notifier: Arc<dyn Notifier>,
        required_chain_id: u64,
        network_name: impl Into<String>,
        rpc_timeout: Duration,
    ) -> Self {
        Self {
            modal,
            notifier,
            required_chain_id,
            network_name: network_name.into(),
            rpc_timeout,
            receipt_poll: DEFAULT_RECEIPT_POLL,
            provider: AsyncMutex::new(None),
            state: RwLock::new(Session::default()),
            modal_opens: AtomicU64::new(0),
        }
    }

    pub fn with_receipt_poll(mut self, receipt_poll: Duration) -> Self {
        self.receipt_poll = receipt_poll;
        self
    }

    pub fn required_chain_id(&self) -> u64 {
        self.required_chain_id
    }

    pub fn snapshot(&self) -> Session {
        self.state.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn is_connected(&self) -> bool {
        self.state.read().unwrap_or_else(|e| e.into_inner()).connected
    }

    /// How many times the wallet-selection modal was opened.
    pub fn modal_opens(&self) -> u64 {
        self.modal_opens.load(Ordering::Relaxed)
    }

    /// Establish (or reuse) the provider and validate its network.
    ///
    /// This is the only path that opens the wallet modal.
    pub async fn connect(&self) -> Result<WalletProvider, crate::Error> {
        let provider = {
            let mut slot = self.provider.lock().await;
            match slot.as_ref() {
                Some(p) => p.clone(),
                None => {
                    self.modal_opens.fetch_add(1, Ordering::Relaxed);
                    let link = self.modal.select().await?;
                    let p = WalletProvider::new(link, self.rpc_timeout, self.receipt_poll);
                    *slot = Some(p.clone());
                    p
                }
            }
        };
        self.validated(provider).await
    }

    /// The current provider, network-checked. Never opens the modal: fails
    /// with `ProviderUnavailable` once the session has ended.
    pub async fn provider(&self) -> Result<WalletProvider, crate::Error> {
        let provider = self.provider.lock().await.clone().ok_or_else(|| {
            crate::Error::ProviderUnavailable("wallet is not connected".into())
        })?;
        self.validated(provider).await
    }

    pub async fn signer(&self) -> Result<SignerHandle, crate::Error> {
        let provider = self.provider().await?;
        let address = provider
            .accounts()
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| {
                crate::Error::ProviderUnavailable("wallet has no authorized account".into())
            })?;

        let mut s = self.state.write().unwrap_or_else(|e| e.into_inner());
        if s.signer_address != Some(address) {
            info!(signer = %address, "Signer account selected");
            s.signer_address = Some(address);
        }
        Ok(SignerHandle { provider, address })
    }

    pub async fn provider_or_signer(&self, need_signer: bool) -> Result<Handle, crate::Error> {
        if need_signer {
            self.signer().await.map(Handle::Signer)
        } else {
            self.provider().await.map(Handle::Provider)
        }
    }

    /// Chain id of the held provider, for health checks. Raises no notice
    /// and leaves the session untouched; `None` when no wallet is held.
    pub async fn observed_chain_id(&self) -> Option<Result<u64, crate::Error>> {
        let provider = self.provider.lock().await.clone()?;
        Some(provider.chain_id().await)
    }

    /// Drop the provider and reset the session. The next `connect` opens the modal again.
    pub async fn disconnect(&self) {
        let had_provider = self.provider.lock().await.take().is_some();
        *self.state.write().unwrap_or_else(|e| e.into_inner()) = Session::default();
        if had_provider {
            info!("Wallet disconnected");
        }
    }

    async fn validated(&self, provider: WalletProvider) -> Result<WalletProvider, crate::Error> {
        self.check_network(&provider).await?;

        let newly_connected = {
            let mut s = self.state.write().unwrap_or_else(|e| e.into_inner());
            let was = s.connected;
            s.connected = true;
            s.chain_id = Some(self.required_chain_id);
            !was
        };
        if newly_connected {
            info!(
                connector = provider.label(),
                chain_id = self.required_chain_id,
                "Wallet connected"
            );
        }
        Ok(provider)
    }

    async fn check_network(&self, provider: &WalletProvider) -> Result<(), crate::Error> {
        let actual = provider.chain_id().await?;
        if actual == self.required_chain_id {
            return Ok(());
        }

        METRICS.wrong_network.fetch_add(1, Ordering::Relaxed);
        {
            let mut s = self.state.write().unwrap_or_else(|e| e.into_inner());
            s.connected = false;
            s.chain_id = Some(actual);
        }
        warn!(
            expected = self.required_chain_id,
            actual, "Wallet is on the wrong network"
        );
        self.notifier
            .alert(&format!("Change the network to {}", self.network_name));
        Err(crate::Error::WrongNetwork {
            expected: self.required_chain_id,
            actual,
        })
    }
}
