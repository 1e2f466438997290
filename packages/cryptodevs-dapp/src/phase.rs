//! Phase resolution from fresh contract reads.

use cryptodevs_types::{resolve_phase, MintPhase, Role};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn};

use crate::config::RoleRefresh;
use crate::contract::CryptoDevsContract;
use crate::session::ChainSession;
use crate::state::MintState;

pub struct PhaseResolver {
    session: Arc<ChainSession>,
    contract: Arc<CryptoDevsContract>,
    mint: Arc<MintState>,
    role_refresh: RoleRefresh,
}

impl PhaseResolver {
    pub fn new(
        session: Arc<ChainSession>,
        contract: Arc<CryptoDevsContract>,
        mint: Arc<MintState>,
        role_refresh: RoleRefresh,
    ) -> Self {
        Self {
            session,
            contract,
            mint,
            role_refresh,
        }
    }

    /// Re-derive the phase from raw reads, never from the previous phase.
    ///
    /// The role check (when due) completes before the phase is published, so
    /// the gate never pairs a new phase with a stale role. A failed read is
    /// recorded as unknown and returned; it is never reported as `NotStarted`.
    pub async fn resolve(&self) -> Result<MintPhase, crate::Error> {
        let phase = match self.read_phase().await {
            Ok(phase) => phase,
            Err(e) => {
                warn!(error = %e, "Phase resolution failed");
                self.mint.record_phase_failure(e.to_string());
                return Err(e);
            }
        };

        let refresh = match self.role_refresh {
            RoleRefresh::Always => true,
            RoleRefresh::NotStarted => phase == MintPhase::NotStarted,
        };
        if refresh {
            match self.refresh_role().await {
                Ok(_) => {}
                Err(crate::Error::ProviderUnavailable(reason)) => {
                    if self.mint.role() != Role::default() {
                        info!(%reason, "No signer available, role cleared");
                    }
                    self.mint.set_role(Role::default());
                }
                Err(e) => warn!(error = %e, "Role check failed, keeping previous role"),
            }
        }

        let prev = self.mint.record_phase(phase);
        if prev != Some(phase) {
            info!(
                from = prev.map(|p| p.as_str()).unwrap_or("unknown"),
                to = phase.as_str(),
                "Mint phase changed"
            );
        }
        Ok(phase)
    }

    async fn read_phase(&self) -> Result<MintPhase, crate::Error> {
        if !self.contract.presale_started().await? {
            return Ok(MintPhase::NotStarted);
        }
        let ended_at = self.contract.presale_ended().await?;
        Ok(resolve_phase(true, ended_at, unix_now()))
    }

    /// Compare the connected signer with the contract owner and store the role.
    pub async fn refresh_role(&self) -> Result<Role, crate::Error> {
        let signer = self.session.signer().await?;
        let owner = self.contract.owner().await?;
        let role = Role::from_addresses(&signer.address().to_string(), &owner.to_string());
        if self.mint.role() != role {
            info!(signer = %signer.address(), is_owner = role.is_owner, "Role updated");
        } else {
            debug!(is_owner = role.is_owner, "Role unchanged");
        }
        self.mint.set_role(role);
        Ok(role)
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
