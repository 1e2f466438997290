//! The single UI action permitted for a given session/phase/role state.

use serde::{Deserialize, Serialize};

use crate::{MintPhase, ParseError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    ConnectWallet,
    /// Nothing is clickable: a transaction is in flight or the phase is not known yet.
    Loading,
    StartPresale,
    /// Informational only, for non-owners before the presale.
    PresaleNotStarted,
    PresaleMint,
    PublicMint,
}

impl Action {
    pub const ALL: [Action; 6] = [
        Action::ConnectWallet,
        Action::Loading,
        Action::StartPresale,
        Action::PresaleNotStarted,
        Action::PresaleMint,
        Action::PublicMint,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ConnectWallet => "connect_wallet",
            Self::Loading => "loading",
            Self::StartPresale => "start_presale",
            Self::PresaleNotStarted => "presale_not_started",
            Self::PresaleMint => "presale_mint",
            Self::PublicMint => "public_mint",
        }
    }

    /// Text the page renders for this action.
    pub fn label(&self) -> &'static str {
        match self {
            Self::ConnectWallet => "Connect your wallet",
            Self::Loading => "Loading...",
            Self::StartPresale => "Start Presale!",
            Self::PresaleNotStarted => "Presale hasn't started!",
            Self::PresaleMint => "Presale Mint",
            Self::PublicMint => "Public Mint",
        }
    }

    /// Sends a transaction through the contract.
    pub fn is_mutating(&self) -> bool {
        matches!(
            self,
            Self::StartPresale | Self::PresaleMint | Self::PublicMint
        )
    }

    /// Something the user can trigger (as opposed to a status display).
    pub fn is_executable(&self) -> bool {
        self.is_mutating() || matches!(self, Self::ConnectWallet)
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Action {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Action::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| ParseError::UnknownAction(s.to_string()))
    }
}

/// Map session state to exactly one action.
///
/// `phase = None` means no resolution has succeeded yet; nothing is offered
/// until one does.
pub fn permitted_action(
    connected: bool,
    in_flight: bool,
    is_owner: bool,
    phase: Option<MintPhase>,
) -> Action {
    if !connected {
        return Action::ConnectWallet;
    }
    if in_flight {
        return Action::Loading;
    }
    match phase {
        None => Action::Loading,
        Some(MintPhase::NotStarted) if is_owner => Action::StartPresale,
        Some(MintPhase::NotStarted) => Action::PresaleNotStarted,
        Some(MintPhase::Presale) => Action::PresaleMint,
        Some(MintPhase::PublicSale) => Action::PublicMint,
    }
}
