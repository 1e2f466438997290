//! dApp configuration.

use alloy::primitives::{utils::parse_ether, Address, U256};
use serde::Deserialize;
use std::time::Duration;

/// Configuration for the mint dApp core.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// The single accepted network id.
    #[serde(default = "defaults::chain_id")]
    pub chain_id: u64,

    /// Human name used in the wrong-network notice.
    #[serde(default = "defaults::network_name")]
    pub network_name: String,

    #[serde(default)]
    pub contract_address: String,

    /// Price per token, in ether.
    #[serde(default = "defaults::mint_price")]
    pub mint_price: String,

    #[serde(default = "defaults::max_token_ids")]
    pub max_token_ids: u64,

    #[serde(default = "defaults::connectors")]
    pub connectors: Vec<ConnectorConfig>,

    #[serde(default)]
    pub disable_injected: bool,

    #[serde(default = "defaults::role_refresh")]
    pub role_refresh: RoleRefresh,

    #[serde(default = "defaults::rpc_timeout_secs")]
    pub rpc_timeout_secs: u64,

    #[serde(default = "defaults::tx_timeout_secs")]
    pub tx_timeout_secs: u64,

    #[serde(default = "defaults::receipt_poll_ms")]
    pub receipt_poll_ms: u64,

    #[serde(default = "defaults::phase_poll_secs")]
    pub phase_poll_secs: u64,

    #[serde(default = "defaults::supply_poll_secs")]
    pub supply_poll_secs: u64,

    #[serde(default = "defaults::rotation_ms")]
    pub rotation_ms: u64,

    /// Where the showcase rotation fetches `api/{id}` from. Unset means
    /// this service's own endpoint on `bind_address`.
    #[serde(default)]
    pub metadata_base_url: Option<String>,

    #[serde(default = "defaults::image_base_url")]
    pub image_base_url: String,

    #[serde(default = "defaults::bind_address")]
    pub bind_address: String,

    /// Connect on startup, like the page does on mount.
    #[serde(default = "defaults::auto_connect")]
    pub auto_connect: bool,
}

/// A wallet connector offered by the selection modal.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ConnectorConfig {
    pub kind: ConnectorKind,
    pub url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectorKind {
    /// Browser-injected style wallet, reached over its JSON-RPC endpoint.
    Injected,
    /// WalletConnect bridge exposing JSON-RPC.
    WalletConnect,
}

impl ConnectorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Injected => "injected",
            Self::WalletConnect => "walletconnect",
        }
    }
}

/// When the owner role is re-derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleRefresh {
    /// Every phase resolution.
    Always,
    /// Only while the presale has not started.
    NotStarted,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            chain_id: defaults::chain_id(),
            network_name: defaults::network_name(),
            contract_address: String::new(),
            mint_price: defaults::mint_price(),
            max_token_ids: defaults::max_token_ids(),
            connectors: defaults::connectors(),
            disable_injected: false,
            role_refresh: defaults::role_refresh(),
            rpc_timeout_secs: defaults::rpc_timeout_secs(),
            tx_timeout_secs: defaults::tx_timeout_secs(),
            receipt_poll_ms: defaults::receipt_poll_ms(),
            phase_poll_secs: defaults::phase_poll_secs(),
            supply_poll_secs: defaults::supply_poll_secs(),
            rotation_ms: defaults::rotation_ms(),
            metadata_base_url: None,
            image_base_url: defaults::image_base_url(),
            bind_address: defaults::bind_address(),
            auto_connect: defaults::auto_connect(),
        }
    }
}

impl Config {
    pub fn contract_address(&self) -> Result<Address, crate::Error> {
        if self.contract_address.trim().is_empty() {
            return Err(crate::Error::Config(
                "contract_address is not set (CRYPTODEVS_CONTRACT_ADDRESS)".into(),
            ));
        }
        self.contract_address
            .trim()
            .parse()
            .map_err(|e| crate::Error::Config(format!("invalid contract_address: {e}")))
    }

    /// Mint price in wei.
    pub fn mint_price_wei(&self) -> Result<U256, crate::Error> {
        parse_ether(self.mint_price.trim())
            .map_err(|e| crate::Error::Config(format!("invalid mint_price {:?}: {e}", self.mint_price)))
    }

    /// Reject configurations the core cannot run with.
    pub fn validate(&self) -> Result<(), crate::Error> {
        self.contract_address()?;
        self.mint_price_wei()?;
        let intervals = [
            ("rpc_timeout_secs", self.rpc_timeout_secs),
            ("tx_timeout_secs", self.tx_timeout_secs),
            ("receipt_poll_ms", self.receipt_poll_ms),
            ("phase_poll_secs", self.phase_poll_secs),
            ("supply_poll_secs", self.supply_poll_secs),
            ("rotation_ms", self.rotation_ms),
        ];
        if let Some((name, _)) = intervals.iter().find(|(_, v)| *v == 0) {
            return Err(crate::Error::Config(format!("{name} must be > 0")));
        }
        if self.max_token_ids == 0 {
            return Err(crate::Error::Config("max_token_ids must be > 0".into()));
        }
        Ok(())
    }

    /// Connectors the modal may offer, injected first.
    pub fn enabled_connectors(&self) -> Vec<ConnectorConfig> {
        let mut out: Vec<ConnectorConfig> = self
            .connectors
            .iter()
            .filter(|c| !(self.disable_injected && c.kind == ConnectorKind::Injected))
            .cloned()
            .collect();
        out.sort_by_key(|c| c.kind != ConnectorKind::Injected);
        out
    }

    /// Base URL for metadata fetches, derived from `bind_address` when unset.
    pub fn metadata_base_url(&self) -> String {
        if let Some(url) = self.metadata_base_url.as_deref().filter(|u| !u.trim().is_empty()) {
            return url.trim().to_string();
        }
        let bind = self.bind_address.trim();
        match bind.strip_prefix("0.0.0.0:") {
            Some(port) => format!("http://127.0.0.1:{port}"),
            None => format!("http://{bind}"),
        }
    }

    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_secs(self.rpc_timeout_secs)
    }

    pub fn tx_timeout(&self) -> Duration {
        Duration::from_secs(self.tx_timeout_secs)
    }

    pub fn receipt_poll(&self) -> Duration {
        Duration::from_millis(self.receipt_poll_ms)
    }

    pub fn phase_poll(&self) -> Duration {
        Duration::from_secs(self.phase_poll_secs)
    }

    pub fn supply_poll(&self) -> Duration {
        Duration::from_secs(self.supply_poll_secs)
    }

    pub fn rotation_interval(&self) -> Duration {
        Duration::from_millis(self.rotation_ms)
    }
}

mod defaults {
    use super::{ConnectorConfig, ConnectorKind, RoleRefresh};

    pub fn chain_id() -> u64 {
        4
    }

    pub fn network_name() -> String {
        "Rinkeby".into()
    }

    pub fn mint_price() -> String {
        "0.01".into()
    }

    pub fn max_token_ids() -> u64 {
        cryptodevs_types::MAX_TOKEN_IDS
    }

    pub fn connectors() -> Vec<ConnectorConfig> {
        // Priority: CRYPTODEVS_WALLET_URL > local wallet bridge
        let url = std::env::var("CRYPTODEVS_WALLET_URL")
            .ok()
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| "http://127.0.0.1:8545".into());
        vec![ConnectorConfig {
            kind: ConnectorKind::Injected,
            url,
        }]
    }

    pub fn role_refresh() -> RoleRefresh {
        RoleRefresh::Always
    }

    pub fn rpc_timeout_secs() -> u64 {
        15
    }

    pub fn tx_timeout_secs() -> u64 {
        180
    }

    pub fn receipt_poll_ms() -> u64 {
        2_000
    }

    pub fn phase_poll_secs() -> u64 {
        5
    }

    pub fn supply_poll_secs() -> u64 {
        5
    }

    pub fn rotation_ms() -> u64 {
        1_000
    }

    pub fn image_base_url() -> String {
        "https://raw.githubusercontent.com/LearnWeb3DAO/NFT-Collection/main/my-app/public/cryptodevs"
            .into()
    }

    pub fn bind_address() -> String {
        "127.0.0.1:3050".into()
    }

    pub fn auto_connect() -> bool {
        true
    }
}
