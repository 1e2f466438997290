//! Mint phase derivation.

use serde::{Deserialize, Serialize};

/// The three sequential mint phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MintPhase {
    NotStarted,
    Presale,
    PublicSale,
}

impl MintPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::Presale => "presale",
            Self::PublicSale => "public_sale",
        }
    }

    /// `PublicSale` is the last phase; nothing on-chain moves it back.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::PublicSale)
    }
}

impl std::fmt::Display for MintPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Derive the phase from raw contract reads.
///
/// `presale_ended_at` is only meaningful once the presale has started. The
/// boundary `now == presale_ended_at` already counts as public sale.
pub fn resolve_phase(presale_started: bool, presale_ended_at: u64, now_secs: u64) -> MintPhase {
    if !presale_started {
        MintPhase::NotStarted
    } else if presale_ended_at <= now_secs {
        MintPhase::PublicSale
    } else {
        MintPhase::Presale
    }
}

/// Outcome of the most recent phase resolution.
///
/// Keeps "the phase is `NotStarted`" apart from "the phase could not be read".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PhaseObservation {
    /// No resolution has completed yet.
    #[default]
    Pending,
    Known { phase: MintPhase },
    Unknown {
        last_known: Option<MintPhase>,
        error: String,
    },
}

impl PhaseObservation {
    /// The phase to act on: the observed one, else the last known one.
    pub fn phase(&self) -> Option<MintPhase> {
        match self {
            Self::Pending => None,
            Self::Known { phase } => Some(*phase),
            Self::Unknown { last_known, .. } => *last_known,
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self, Self::Known { .. })
    }

    /// Transition after a failed resolution, carrying the last known phase forward.
    pub fn failed(&self, error: impl Into<String>) -> Self {
        Self::Unknown {
            last_known: self.phase(),
            error: error.into(),
        }
    }
}
