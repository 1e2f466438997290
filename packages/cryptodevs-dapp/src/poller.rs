//! Background polling that keeps phase and supply fresh.

use cryptodevs_types::MintPhase;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::contract::CryptoDevsContract;
use crate::metrics::METRICS;
use crate::phase::PhaseResolver;
use crate::state::MintState;

/// Tokens of one polling run, from `start` to `stop`.
struct Run {
    /// Cancels both loops.
    cancel: CancellationToken,
    /// Child of `cancel`; the phase loop also cancels it on reaching public sale.
    phase_cancel: CancellationToken,
}

/// Phase and supply polling loops. At most one run is active; a stopped
/// poller can be started again with fresh tokens.
pub struct Poller {
    resolver: Arc<PhaseResolver>,
    contract: Arc<CryptoDevsContract>,
    mint: Arc<MintState>,
    phase_every: Duration,
    supply_every: Duration,
    run: Mutex<Option<Run>>,
    phase_ticks: AtomicU64,
    supply_ticks: AtomicU64,
}

impl Poller {
    pub fn new(
        resolver: Arc<PhaseResolver>,
        contract: Arc<CryptoDevsContract>,
        mint: Arc<MintState>,
        phase_every: Duration,
        supply_every: Duration,
    ) -> Self {
        Self {
            resolver,
            contract,
            mint,
            phase_every,
            supply_every,
            run: Mutex::new(None),
            phase_ticks: AtomicU64::new(0),
            supply_ticks: AtomicU64::new(0),
        }
    }

    /// Spawn both loops. Returns `false` if a run is already active.
    pub fn start(self: &Arc<Self>) -> bool {
        let (cancel, phase_cancel) = {
            let mut run = self.run.lock().unwrap_or_else(|e| e.into_inner());
            if run.is_some() {
                return false;
            }
            let cancel = CancellationToken::new();
            let phase_cancel = cancel.child_token();
            *run = Some(Run {
                cancel: cancel.clone(),
                phase_cancel: phase_cancel.clone(),
            });
            (cancel, phase_cancel)
        };

        info!(
            phase_every_ms = self.phase_every.as_millis() as u64,
            supply_every_ms = self.supply_every.as_millis() as u64,
            "Polling started"
        );

        let this = Arc::clone(self);
        tokio::spawn(async move { this.run_phase_loop(phase_cancel).await });
        let this = Arc::clone(self);
        tokio::spawn(async move { this.run_supply_loop(cancel).await });
        true
    }

    /// Cancel the active run, if any. Safe to call more than once.
    pub fn stop(&self) {
        let run = self.run.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(run) = run {
            run.cancel.cancel();
            info!("Polling stopped");
        }
    }

    pub fn is_started(&self) -> bool {
        self.run.lock().unwrap_or_else(|e| e.into_inner()).is_some()
    }

    /// Whether the phase loop is still scheduled.
    pub fn phase_polling_active(&self) -> bool {
        self.run
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .is_some_and(|run| !run.phase_cancel.is_cancelled())
    }

    pub fn phase_ticks(&self) -> u64 {
        self.phase_ticks.load(Ordering::Relaxed)
    }

    pub fn supply_ticks(&self) -> u64 {
        self.supply_ticks.load(Ordering::Relaxed)
    }

    /// Tick, then sleep, so ticks of one loop never overlap.
    async fn run_phase_loop(self: Arc<Self>, cancel: CancellationToken) {
        loop {
            if cancel.is_cancelled() {
                return;
            }
            if let Some(MintPhase::PublicSale) = self.phase_tick().await {
                info!("Public sale reached, phase polling finished");
                cancel.cancel();
                return;
            }
            tokio::select! {
                _ = tokio::time::sleep(self.phase_every) => {},
                _ = cancel.cancelled() => {
                    debug!("Phase poller shutting down");
                    return;
                }
            }
        }
    }

    async fn run_supply_loop(self: Arc<Self>, cancel: CancellationToken) {
        if cancel.is_cancelled() {
            return;
        }
        self.confirm_cap().await;
        loop {
            if cancel.is_cancelled() {
                return;
            }
            self.supply_tick().await;
            tokio::select! {
                _ = tokio::time::sleep(self.supply_every) => {},
                _ = cancel.cancelled() => {
                    debug!("Supply poller shutting down");
                    return;
                }
            }
        }
    }

    /// One phase resolution. `None` when it failed.
    pub async fn phase_tick(&self) -> Option<MintPhase> {
        self.phase_ticks.fetch_add(1, Ordering::Relaxed);
        METRICS.phase_polls.fetch_add(1, Ordering::Relaxed);
        match self.resolver.resolve().await {
            Ok(phase) => Some(phase),
            Err(e) => {
                METRICS.phase_poll_errors.fetch_add(1, Ordering::Relaxed);
                debug!(error = %e, "Phase poll tick failed");
                None
            }
        }
    }

    /// One `tokenIds` read.
    pub async fn supply_tick(&self) -> Option<u64> {
        self.supply_ticks.fetch_add(1, Ordering::Relaxed);
        METRICS.supply_polls.fetch_add(1, Ordering::Relaxed);
        match self.contract.token_ids().await {
            Ok(minted) => {
                self.mint.observe_supply(minted);
                Some(minted)
            }
            Err(e) => {
                METRICS.supply_poll_errors.fetch_add(1, Ordering::Relaxed);
                warn!(error = %e, "Supply poll tick failed");
                None
            }
        }
    }

    /// Read `maxTokenIds` once; keep the configured cap if it cannot be read.
    async fn confirm_cap(&self) {
        let configured = self.mint.supply().cap;
        match self.contract.max_token_ids().await {
            Ok(cap) if cap != configured => {
                warn!(configured, on_chain = cap, "Supply cap differs from config, using on-chain value");
                self.mint.set_cap(cap);
            }
            Ok(_) => {}
            Err(e) => warn!(error = %e, cap = configured, "Could not read maxTokenIds, using configured cap"),
        }
    }
}
