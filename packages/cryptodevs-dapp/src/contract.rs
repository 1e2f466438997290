//! Typed facade over the deployed Crypto Devs contract.

use alloy::network::Ethereum;
use alloy::primitives::{hex, Address, B256, U256};
use alloy::providers::{PendingTransactionBuilder, PendingTransactionError, RootProvider, WatchTxError};
use alloy::rpc::types::TransactionReceipt;
use alloy::sol;
use alloy::sol_types::SolCall;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::metrics::METRICS;
use crate::provider::{classify, WalletProvider};
use crate::session::ChainSession;

sol! {
    #[sol(rpc)]
    #[derive(Debug)]
    interface ICryptoDevs {
        function owner() external view returns (address);
        function presaleStarted() external view returns (bool);
        function presaleEnded() external view returns (uint256);
        function tokenIds() external view returns (uint256);
        function maxTokenIds() external view returns (uint256);
        function presaleMint() external payable;
        function mint() external payable;
        function startPresale() external;
    }
}

/// Read/write operations against the contract. Every call goes through the
/// session, so every interaction is network-checked first.
pub struct CryptoDevsContract {
    session: Arc<ChainSession>,
    address: Address,
    mint_price: U256,
}

impl CryptoDevsContract {
    pub fn new(session: Arc<ChainSession>, address: Address, mint_price: U256) -> Self {
        Self {
            session,
            address,
            mint_price,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn mint_price(&self) -> U256 {
        self.mint_price
    }

    // --- Reads ---

    pub async fn owner(&self) -> Result<Address, crate::Error> {
        Ok(self.read(ICryptoDevs::ownerCall {}).await?._0)
    }

    pub async fn presale_started(&self) -> Result<bool, crate::Error> {
        Ok(self.read(ICryptoDevs::presaleStartedCall {}).await?._0)
    }

    /// Presale end as unix seconds.
    pub async fn presale_ended(&self) -> Result<u64, crate::Error> {
        let raw = self.read(ICryptoDevs::presaleEndedCall {}).await?._0;
        Ok(u64::try_from(raw).unwrap_or(u64::MAX))
    }

    pub async fn token_ids(&self) -> Result<u64, crate::Error> {
        let raw = self.read(ICryptoDevs::tokenIdsCall {}).await?._0;
        u64::try_from(raw)
            .map_err(|_| crate::Error::ContractRead(format!("tokenIds out of range: {raw}")))
    }

    pub async fn max_token_ids(&self) -> Result<u64, crate::Error> {
        let raw = self.read(ICryptoDevs::maxTokenIdsCall {}).await?._0;
        u64::try_from(raw)
            .map_err(|_| crate::Error::ContractRead(format!("maxTokenIds out of range: {raw}")))
    }

    // --- Writes ---

    pub async fn presale_mint(&self) -> Result<PendingTx, crate::Error> {
        self.send(ICryptoDevs::presaleMintCall {}, self.mint_price).await
    }

    pub async fn mint(&self) -> Result<PendingTx, crate::Error> {
        self.send(ICryptoDevs::mintCall {}, self.mint_price).await
    }

    pub async fn start_presale(&self) -> Result<PendingTx, crate::Error> {
        self.send(ICryptoDevs::startPresaleCall {}, U256::ZERO).await
    }

    fn bind(&self, provider: &WalletProvider) -> ICryptoDevs::ICryptoDevsInstance<(), RootProvider> {
        ICryptoDevs::new(self.address, provider.root().clone())
    }

    async fn read<C: SolCall + Unpin>(&self, call: C) -> Result<C::Return, crate::Error> {
        let provider = self.session.provider().await?;
        let contract = self.bind(&provider);
        let builder = contract.call_builder(&call);
        provider
            .within(C::SIGNATURE, builder.call())
            .await?
            .map_err(|e| match contract_error(C::SIGNATURE, e) {
                crate::Error::Rpc(msg) => crate::Error::ContractRead(msg),
                other => other,
            })
    }

    async fn send<C: SolCall>(&self, call: C, value: U256) -> Result<PendingTx, crate::Error> {
        let signer = self.session.signer().await?;
        let contract = self.bind(signer.provider());
        let builder = contract
            .call_builder(&call)
            .from(signer.address())
            .value(value);
        let pending = signer
            .provider()
            .within(C::SIGNATURE, builder.send())
            .await?
            .map_err(|e| contract_error(C::SIGNATURE, e))?;
        METRICS.tx_sent.fetch_add(1, Ordering::Relaxed);
        let tx_hash = *pending.tx_hash();
        info!(
            method = C::SIGNATURE,
            tx = %tx_hash,
            from = %signer.address(),
            "Transaction sent"
        );
        Ok(PendingTx {
            inner: pending,
            tx_hash,
            method: C::SIGNATURE,
        })
    }
}

fn contract_error(what: &str, err: alloy::contract::Error) -> crate::Error {
    match err {
        alloy::contract::Error::TransportError(e) => classify(what, e),
        other => crate::Error::ContractRead(format!("{what}: {other}")),
    }
}

/// A sent transaction awaiting its receipt.
pub struct PendingTx {
    inner: PendingTransactionBuilder<Ethereum>,
    tx_hash: B256,
    method: &'static str,
}

impl PendingTx {
    pub fn tx_hash(&self) -> B256 {
        self.tx_hash
    }

    pub fn method(&self) -> &'static str {
        self.method
    }

    /// Resolve once mined. A failed receipt surfaces as `ContractCallReverted`;
    /// no receipt within `timeout` fails with `TransactionPendingTimeout`.
    pub async fn wait(self, timeout: Duration) -> Result<TransactionReceipt, crate::Error> {
        let start = Instant::now();
        let hash = hex::encode_prefixed(self.tx_hash.as_slice());
        let watch = self.inner.with_timeout(Some(timeout)).get_receipt();
        let result = tokio::time::timeout(timeout, watch).await;
        METRICS.record_tx_wait(start);
        match result {
            Ok(Ok(receipt)) if receipt.status() => {
                METRICS.tx_confirmed.fetch_add(1, Ordering::Relaxed);
                info!(method = self.method, tx = %hash, block = ?receipt.block_number, "Transaction mined");
                Ok(receipt)
            }
            Ok(Ok(_)) => {
                METRICS.tx_failed.fetch_add(1, Ordering::Relaxed);
                warn!(method = self.method, tx = %hash, "Transaction reverted");
                Err(crate::Error::ContractCallReverted(format!(
                    "{} reverted in {hash}",
                    self.method
                )))
            }
            Ok(Err(PendingTransactionError::TxWatcher(WatchTxError::Timeout))) | Err(_) => {
                METRICS.tx_failed.fetch_add(1, Ordering::Relaxed);
                warn!(
                    method = self.method,
                    tx = %hash,
                    waited_secs = timeout.as_secs(),
                    "Transaction not mined in time"
                );
                Err(crate::Error::TransactionPendingTimeout {
                    tx_hash: hash,
                    waited_secs: timeout.as_secs(),
                })
            }
            Ok(Err(e)) => {
                METRICS.tx_failed.fetch_add(1, Ordering::Relaxed);
                METRICS.rpc_errors.fetch_add(1, Ordering::Relaxed);
                Err(crate::Error::Rpc(format!("{}: receipt for {hash}: {e}", self.method)))
            }
        }
    }
}
