//! Application state shared across handlers and background tasks.

use cryptodevs_types::{MintPhase, NftMetadata, PhaseObservation, Role, SupplyCounter};
use serde::Serialize;
use std::sync::atomic::AtomicU64;
use std::sync::{Arc, RwLock};
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::Config;
use crate::contract::CryptoDevsContract;
use crate::gate::ActionGate;
use crate::metadata::HttpMetadataClient;
use crate::notify::NoticeBoard;
use crate::phase::PhaseResolver;
use crate::poller::Poller;
use crate::session::ChainSession;
use crate::wallet::{ConnectorModal, WalletModal};

/// Token currently shown by the showcase rotation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Showcase {
    pub token_id: u64,
    #[serde(flatten)]
    pub metadata: NftMetadata,
}

/// Point-in-time copy of the reconciled mint state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MintView {
    pub phase: PhaseObservation,
    pub role: Role,
    pub supply: SupplyCounter,
    pub showcase: Option<Showcase>,
}

/// Derived contract state. Written by the resolver, poller and rotation; read by the gate.
#[derive(Default)]
pub struct MintState {
    inner: RwLock<MintView>,
}

impl MintState {
    pub fn new(cap: u64) -> Self {
        Self {
            inner: RwLock::new(MintView {
                supply: SupplyCounter::new(cap),
                ..MintView::default()
            }),
        }
    }

    pub fn snapshot(&self) -> MintView {
        self.inner.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn observation(&self) -> PhaseObservation {
        self.inner
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .phase
            .clone()
    }

    /// Phase the gate acts on: the latest known one.
    pub fn phase(&self) -> Option<MintPhase> {
        self.inner
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .phase
            .phase()
    }

    pub fn role(&self) -> Role {
        self.inner.read().unwrap_or_else(|e| e.into_inner()).role
    }

    pub fn supply(&self) -> SupplyCounter {
        self.inner.read().unwrap_or_else(|e| e.into_inner()).supply
    }

    /// Returns the previously observed phase.
    pub fn record_phase(&self, phase: MintPhase) -> Option<MintPhase> {
        let mut s = self.inner.write().unwrap_or_else(|e| e.into_inner());
        let prev = s.phase.phase();
        s.phase = PhaseObservation::Known { phase };
        prev
    }

    pub fn record_phase_failure(&self, error: impl Into<String>) {
        let mut s = self.inner.write().unwrap_or_else(|e| e.into_inner());
        s.phase = s.phase.failed(error);
    }

    pub fn set_role(&self, role: Role) {
        self.inner.write().unwrap_or_else(|e| e.into_inner()).role = role;
    }

    /// Record a fresh `tokenIds` read; a lower value than already seen is ignored.
    pub fn observe_supply(&self, minted: u64) -> bool {
        let accepted = self
            .inner
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .supply
            .observe(minted);
        if !accepted {
            warn!(minted, "Ignoring supply read lower than already observed");
        }
        accepted
    }

    pub fn set_cap(&self, cap: u64) {
        self.inner.write().unwrap_or_else(|e| e.into_inner()).supply.cap = cap;
    }

    pub fn set_showcase(&self, showcase: Showcase) {
        self.inner.write().unwrap_or_else(|e| e.into_inner()).showcase = Some(showcase);
    }
}

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub notices: Arc<NoticeBoard>,
    pub session: Arc<ChainSession>,
    pub contract: Arc<CryptoDevsContract>,
    pub mint: Arc<MintState>,
    pub resolver: Arc<PhaseResolver>,
    pub poller: Arc<Poller>,
    pub gate: ActionGate,
    pub metadata: Arc<HttpMetadataClient>,
    /// Cancels the showcase rotation.
    pub shutdown: CancellationToken,
    pub start_time: Instant,
    pub request_count: AtomicU64,
}

impl AppState {
    /// Create application state from configuration, selecting wallets from the configured connectors.
    pub fn new(config: Config) -> Result<Self, crate::Error> {
        let modal = ConnectorModal::new(config.enabled_connectors(), config.rpc_timeout());
        Self::with_modal(config, Arc::new(modal))
    }

    /// Create application state around an explicit wallet modal.
    pub fn with_modal(config: Config, modal: Arc<dyn WalletModal>) -> Result<Self, crate::Error> {
        let address = config.contract_address()?;
        let mint_price = config.mint_price_wei()?;

        let notices = Arc::new(NoticeBoard::new());
        let session = Arc::new(ChainSession::new(
            modal,
            notices.clone(),
            config.chain_id,
            config.network_name.clone(),
            config.rpc_timeout(),
        )
        .with_receipt_poll(config.receipt_poll()));
        let contract = Arc::new(CryptoDevsContract::new(session.clone(), address, mint_price));
        let mint = Arc::new(MintState::new(config.max_token_ids));
        let resolver = Arc::new(PhaseResolver::new(
            session.clone(),
            contract.clone(),
            mint.clone(),
            config.role_refresh,
        ));
        let poller = Arc::new(Poller::new(
            resolver.clone(),
            contract.clone(),
            mint.clone(),
            config.phase_poll(),
            config.supply_poll(),
        ));
        let gate = ActionGate::new(
            session.clone(),
            contract.clone(),
            resolver.clone(),
            poller.clone(),
            mint.clone(),
            notices.clone(),
            config.tx_timeout(),
        );
        let metadata_base_url = config.metadata_base_url();
        let metadata = Arc::new(HttpMetadataClient::new(&metadata_base_url, config.rpc_timeout())?);

        info!(
            contract = %address,
            chain_id = config.chain_id,
            network = %config.network_name,
            metadata = %metadata_base_url,
            "Mint state initialized"
        );

        Ok(Self {
            config,
            notices,
            session,
            contract,
            mint,
            resolver,
            poller,
            gate,
            metadata,
            shutdown: CancellationToken::new(),
            start_time: Instant::now(),
            request_count: AtomicU64::new(0),
        })
    }
}
