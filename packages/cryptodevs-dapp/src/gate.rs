//! Action gate: one permitted action at a time, one mutating call in flight.

use alloy::primitives::hex;
use cryptodevs_types::{permitted_action, Action, MintPhase};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::contract::{CryptoDevsContract, PendingTx};
use crate::metrics::METRICS;
use crate::notify::Notifier;
use crate::phase::PhaseResolver;
use crate::poller::Poller;
use crate::session::ChainSession;
use crate::state::MintState;

pub const MINT_SUCCESS_NOTICE: &str = "You successfully minted a Crypto Dev!";

/// Result of an executed action.
#[derive(Debug, Clone, Serialize)]
pub struct ActionOutcome {
    pub action: Action,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
    /// Phase right after the action, when it was re-resolved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase: Option<MintPhase>,
    /// Action the gate permits now.
    pub next: Action,
}

/// RAII guard for the in-flight flag. Released on drop.
pub struct InFlightGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> InFlightGuard<'a> {
    /// `None` if another mutating action holds the flag.
    pub fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

pub struct ActionGate {
    session: Arc<ChainSession>,
    contract: Arc<CryptoDevsContract>,
    resolver: Arc<PhaseResolver>,
    poller: Arc<Poller>,
    mint: Arc<MintState>,
    notifier: Arc<dyn Notifier>,
    tx_timeout: Duration,
    in_flight: AtomicBool,
    executed: AtomicU64,
}

impl ActionGate {
    pub fn new(
        session: Arc<ChainSession>,
        contract: Arc<CryptoDevsContract>,
        resolver: Arc<PhaseResolver>,
        poller: Arc<Poller>,
        mint: Arc<MintState>,
        notifier: Arc<dyn Notifier>,
        tx_timeout: Duration,
    ) -> Self {
        Self {
            session,
            contract,
            resolver,
            poller,
            mint,
            notifier,
            tx_timeout,
            in_flight: AtomicBool::new(false),
            executed: AtomicU64::new(0),
        }
    }

    /// The single action the page should offer right now.
    pub fn current_action(&self) -> Action {
        permitted_action(
            self.session.is_connected(),
            self.in_flight(),
            self.mint.role().is_owner,
            self.mint.phase(),
        )
    }

    pub fn in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Mutating actions that completed successfully.
    pub fn executed(&self) -> u64 {
        self.executed.load(Ordering::Relaxed)
    }

    /// Run `requested` if it is the permitted action.
    ///
    /// A mutating action holds the in-flight flag from send until mined (or
    /// failed); a concurrent attempt fails with `ActionInFlight` instead of
    /// queueing. Nothing is retried.
    pub async fn execute(&self, requested: Action) -> Result<ActionOutcome, crate::Error> {
        let permitted = self.current_action();
        if requested != permitted {
            METRICS.actions_rejected.fetch_add(1, Ordering::Relaxed);
            if requested.is_mutating() && self.in_flight() {
                return Err(crate::Error::ActionInFlight);
            }
            return Err(crate::Error::ActionNotPermitted {
                requested,
                permitted,
            });
        }

        match requested {
            Action::ConnectWallet => self.connect_wallet().await,
            a if a.is_mutating() => self.execute_mutating(a).await,
            other => {
                METRICS.actions_rejected.fetch_add(1, Ordering::Relaxed);
                Err(crate::Error::InvalidInput(format!(
                    "{} is informational and cannot be executed",
                    other.as_str()
                )))
            }
        }
    }

    /// Connect the session and bootstrap polling (once).
    async fn connect_wallet(&self) -> Result<ActionOutcome, crate::Error> {
        self.session.connect().await?;
        if self.poller.start() {
            info!("Polling bootstrapped after wallet connect");
        }
        Ok(ActionOutcome {
            action: Action::ConnectWallet,
            tx_hash: None,
            block_number: None,
            phase: self.mint.phase(),
            next: self.current_action(),
        })
    }

    /// End the wallet session and stop polling. A later `ConnectWallet`
    /// opens the modal again and restarts polling.
    pub async fn disconnect(&self) {
        self.poller.stop();
        self.session.disconnect().await;
    }

    async fn execute_mutating(&self, action: Action) -> Result<ActionOutcome, crate::Error> {
        let guard = match InFlightGuard::acquire(&self.in_flight) {
            Some(g) => g,
            None => {
                METRICS.actions_rejected.fetch_add(1, Ordering::Relaxed);
                return Err(crate::Error::ActionInFlight);
            }
        };

        let pending = self.send(action).await.inspect_err(|e| {
            warn!(action = action.as_str(), error = %e, "Action failed before submission");
        })?;
        let tx_hash = hex::encode_prefixed(pending.tx_hash().as_slice());
        let receipt = pending.wait(self.tx_timeout).await.inspect_err(|e| {
            warn!(action = action.as_str(), tx = %tx_hash, error = %e, "Action failed");
        })?;
        self.executed.fetch_add(1, Ordering::Relaxed);

        let mut phase = None;
        match action {
            Action::StartPresale => {
                // Re-resolve now instead of waiting for the next tick.
                match self.resolver.resolve().await {
                    Ok(p) => phase = Some(p),
                    Err(e) => warn!(error = %e, "Phase re-resolution after start presale failed"),
                }
            }
            _ => {
                self.notifier.alert(MINT_SUCCESS_NOTICE);
                match self.contract.token_ids().await {
                    Ok(minted) => {
                        self.mint.observe_supply(minted);
                    }
                    Err(e) => warn!(error = %e, "Supply refresh after mint failed"),
                }
            }
        }

        info!(action = action.as_str(), tx = %tx_hash, "Action completed");
        drop(guard);
        Ok(ActionOutcome {
            action,
            tx_hash: Some(tx_hash),
            block_number: receipt.block_number,
            phase,
            next: self.current_action(),
        })
    }

    async fn send(&self, action: Action) -> Result<PendingTx, crate::Error> {
        match action {
            Action::StartPresale => self.contract.start_presale().await,
            Action::PresaleMint => self.contract.presale_mint().await,
            Action::PublicMint => self.contract.mint().await,
            other => Err(crate::Error::InvalidInput(format!(
                "{} does not send a transaction",
                other.as_str()
            ))),
        }
    }
}
