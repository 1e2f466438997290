//! Mint phase, role, supply and action-gate logic for the Crypto Devs dApp.
//! No chain or async dependency: the reconciliation core feeds it raw reads.

mod action;
mod error;
mod metadata;
mod phase;
mod role;
mod rotation;
mod supply;

pub use action::{Action, permitted_action};
pub use error::ParseError;
pub use metadata::NftMetadata;
pub use phase::{MintPhase, PhaseObservation, resolve_phase};
pub use role::{Role, addresses_match};
pub use rotation::{FIRST_TOKEN_ID, TokenRotation};
pub use supply::{MAX_TOKEN_IDS, SupplyCounter};
