//! Error types for the dApp core.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use cryptodevs_types::Action;
use std::fmt;

/// dApp error type.
#[derive(Debug, Clone)]
pub enum Error {
    /// Configuration error.
    Config(String),
    /// Wallet provider / JSON-RPC transport error.
    Rpc(String),
    /// The wallet is on a network other than the accepted one.
    WrongNetwork { expected: u64, actual: u64 },
    /// No wallet capability could be reached.
    ProviderUnavailable(String),
    /// A contract view call failed or returned undecodable data.
    ContractRead(String),
    /// The call or transaction reverted on-chain.
    ContractCallReverted(String),
    /// The transaction was sent but not mined within the bound.
    TransactionPendingTimeout { tx_hash: String, waited_secs: u64 },
    /// Another mutating action is still outstanding.
    ActionInFlight,
    /// The requested action is not the one the current state permits.
    ActionNotPermitted { requested: Action, permitted: Action },
    /// Bad request input.
    InvalidInput(String),
    NotFound(String),
    /// Token metadata lookup failed.
    Metadata(String),
}

impl Error {
    /// Failures a later retry of a read may recover from.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Error::Rpc(_) | Error::ContractRead(_) | Error::ProviderUnavailable(_)
        )
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Config(msg) => write!(f, "config error: {msg}"),
            Error::Rpc(msg) => write!(f, "rpc error: {msg}"),
            Error::WrongNetwork { expected, actual } => {
                write!(f, "wrong network: wallet is on chain {actual}, expected {expected}")
            }
            Error::ProviderUnavailable(msg) => write!(f, "no wallet provider: {msg}"),
            Error::ContractRead(msg) => write!(f, "contract read failed: {msg}"),
            Error::ContractCallReverted(msg) => write!(f, "contract call reverted: {msg}"),
            Error::TransactionPendingTimeout {
                tx_hash,
                waited_secs,
            } => write!(f, "transaction {tx_hash} not mined after {waited_secs}s"),
            Error::ActionInFlight => write!(f, "another transaction is still in flight"),
            Error::ActionNotPermitted {
                requested,
                permitted,
            } => write!(f, "action {requested} not permitted (current: {permitted})"),
            Error::InvalidInput(msg) => write!(f, "invalid input: {msg}"),
            Error::NotFound(msg) => write!(f, "not found: {msg}"),
            Error::Metadata(msg) => write!(f, "metadata error: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<cryptodevs_types::ParseError> for Error {
    fn from(e: cryptodevs_types::ParseError) -> Self {
        match e {
            cryptodevs_types::ParseError::InvalidTokenId(_) => Error::NotFound(e.to_string()),
            cryptodevs_types::ParseError::UnknownAction(_) => Error::InvalidInput(e.to_string()),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = match &self {
            Error::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::Rpc(_) | Error::ContractRead(_) | Error::Metadata(_) => StatusCode::BAD_GATEWAY,
            Error::WrongNetwork { .. } => StatusCode::PRECONDITION_FAILED,
            Error::ProviderUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Error::ContractCallReverted(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Error::TransactionPendingTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            Error::ActionInFlight | Error::ActionNotPermitted { .. } => StatusCode::CONFLICT,
            Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
        };
        let body = serde_json::json!({
            "success": false,
            "error": self.to_string()
        });
        (status, Json(body)).into_response()
    }
}
