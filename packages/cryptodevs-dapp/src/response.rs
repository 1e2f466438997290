//! Response types for the dApp API.

use cryptodevs_types::{Action, PhaseObservation, Role, SupplyCounter};
use serde::{Deserialize, Serialize};

use crate::gate::ActionOutcome;
use crate::notify::Notice;
use crate::session::Session;
use crate::state::Showcase;

/// Response from the health endpoint.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub connected: bool,
    pub required_chain_id: u64,
    pub rpc_status: &'static str,
    pub uptime_secs: u64,
    pub requests: u64,
}

/// Everything the page renders, in one read.
#[derive(Serialize)]
pub struct StatusResponse {
    pub session: Session,
    pub phase: PhaseObservation,
    pub role: Role,
    pub supply: SupplyCounter,
    pub action: Action,
    pub label: &'static str,
    pub in_flight: bool,
    pub phase_polling: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub showcase: Option<Showcase>,
    pub notices: Vec<Notice>,
}

#[derive(Deserialize)]
pub struct ActionRequest {
    pub action: String,
}

/// Response from the action endpoint.
#[derive(Serialize)]
pub struct ActionResponse {
    pub success: bool,
    #[serde(flatten)]
    pub outcome: ActionOutcome,
}

impl ActionResponse {
    pub fn ok(outcome: ActionOutcome) -> Self {
        Self {
            success: true,
            outcome,
        }
    }
}

/// Response from the disconnect endpoint.
#[derive(Serialize)]
pub struct DisconnectResponse {
    pub success: bool,
    pub session: Session,
    pub next: Action,
}
