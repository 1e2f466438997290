//! # Crypto Devs dApp
//!
//! Wallet session and mint-state reconciliation core for the Crypto Devs NFT
//! collection, served to the page as a small local HTTP API.
//!
//! ## Quick Start
//! ```bash
//! CRYPTODEVS_CONTRACT_ADDRESS=0x... cargo run --bin cryptodevs-dapp
//! ```
//!
//! ## Endpoints
//! - `GET /health` - Health check
//! - `GET /status` - Session, phase, role, supply and the permitted action
//! - `POST /action` - Execute the permitted action
//! - `GET /api/{token_id}` - Token metadata
//! - `GET /metrics` - Prometheus counters

pub mod config;
pub mod contract;
mod error;
pub mod gate;
mod handlers;
pub mod metadata;
pub mod metrics;
mod middleware;
pub mod notify;
pub mod phase;
pub mod poller;
pub mod provider;
mod response;
mod router;
pub mod session;
pub mod state;
#[cfg(any(test, feature = "test-utils"))]
pub mod testing;
pub mod wallet;

pub use config::Config;
pub use error::Error;
pub use router::create as create_router;
pub use state::AppState;
