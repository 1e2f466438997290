//! In-memory wallet and contract for tests.

use alloy::primitives::{hex, Address, B256, U256};
use alloy::rpc::types::TransactionRequest;
use alloy::sol_types::{SolCall, SolValue};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::contract::ICryptoDevs;
use crate::provider::{Eip1193, WalletError, WalletLink};
use crate::wallet::WalletModal;

pub const OWNER: Address = Address::repeat_byte(0x0a);
pub const BUYER: Address = Address::repeat_byte(0x0b);

/// Presale window opened by `startPresale`.
const PRESALE_SECS: u64 = 300;

struct Chain {
    chain_id: u64,
    accounts: Vec<Address>,
    owner: Address,
    presale_started: bool,
    presale_ended: u64,
    token_ids: u64,
    max_token_ids: u64,
    price: U256,
    whitelist: HashSet<Address>,
    balances: HashMap<Address, u64>,
    receipts: HashMap<B256, Mined>,
    next_tx: u64,
    block: u64,
    last_value: Option<U256>,
    last_sender: Option<Address>,
}

struct Mined {
    success: bool,
    block: u64,
    from: Address,
}

/// A wallet connected to a simulated Crypto Devs deployment.
pub struct FakeWallet {
    chain: Mutex<Chain>,
    fail_reads: AtomicBool,
    reject_sends: AtomicBool,
    hold_receipts: AtomicBool,
    sends: AtomicU64,
    calls: AtomicU64,
    accounts_requests: AtomicU64,
}

impl FakeWallet {
    pub const CONTRACT: Address = Address::repeat_byte(0xcd);

    pub fn new(chain_id: u64) -> Self {
        Self {
            chain: Mutex::new(Chain {
                chain_id,
                accounts: vec![BUYER],
                owner: OWNER,
                presale_started: false,
                presale_ended: 0,
                token_ids: 0,
                max_token_ids: cryptodevs_types::MAX_TOKEN_IDS,
                price: U256::from(10_000_000_000_000_000u64),
                whitelist: HashSet::new(),
                balances: HashMap::new(),
                receipts: HashMap::new(),
                next_tx: 0,
                block: 1,
                last_value: None,
                last_sender: None,
            }),
            fail_reads: AtomicBool::new(false),
            reject_sends: AtomicBool::new(false),
            hold_receipts: AtomicBool::new(false),
            sends: AtomicU64::new(0),
            calls: AtomicU64::new(0),
            accounts_requests: AtomicU64::new(0),
        }
    }

    fn chain(&self) -> std::sync::MutexGuard<'_, Chain> {
        self.chain.lock().unwrap()
    }

    pub fn set_chain_id(&self, chain_id: u64) {
        self.chain().chain_id = chain_id;
    }

    pub fn set_accounts(&self, accounts: Vec<Address>) {
        self.chain().accounts = accounts;
    }

    pub fn set_presale(&self, started: bool, ended: u64) {
        let mut c = self.chain();
        c.presale_started = started;
        c.presale_ended = ended;
    }

    pub fn set_token_ids(&self, minted: u64) {
        self.chain().token_ids = minted;
    }

    pub fn set_max_token_ids(&self, cap: u64) {
        self.chain().max_token_ids = cap;
    }

    pub fn whitelist(&self, address: Address) {
        self.chain().whitelist.insert(address);
    }

    /// Make every `eth_call` fail with a node error.
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make the user decline every signature request.
    pub fn reject_sends(&self, reject: bool) {
        self.reject_sends.store(reject, Ordering::SeqCst);
    }

    /// While held, sent transactions stay pending.
    pub fn hold_receipts(&self, hold: bool) {
        self.hold_receipts.store(hold, Ordering::SeqCst);
    }

    pub fn send_count(&self) -> u64 {
        self.sends.load(Ordering::SeqCst)
    }

    pub fn call_count(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn accounts_requests(&self) -> u64 {
        self.accounts_requests.load(Ordering::SeqCst)
    }

    pub fn presale_started(&self) -> bool {
        self.chain().presale_started
    }

    pub fn presale_ended(&self) -> u64 {
        self.chain().presale_ended
    }

    pub fn token_ids(&self) -> u64 {
        self.chain().token_ids
    }

    pub fn balance_of(&self, address: Address) -> u64 {
        self.chain().balances.get(&address).copied().unwrap_or(0)
    }

    pub fn last_value(&self) -> Option<U256> {
        self.chain().last_value
    }

    pub fn last_sender(&self) -> Option<Address> {
        self.chain().last_sender
    }

    fn eth_call(&self, params: &Value) -> Result<Value, WalletError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(WalletError::new(-32000, "header not found"));
        }
        let selector = selector_of(&tx_request(params)?)?;
        let c = self.chain();
        let out = if selector == ICryptoDevs::ownerCall::SELECTOR {
            c.owner.abi_encode()
        } else if selector == ICryptoDevs::presaleStartedCall::SELECTOR {
            c.presale_started.abi_encode()
        } else if selector == ICryptoDevs::presaleEndedCall::SELECTOR {
            U256::from(c.presale_ended).abi_encode()
        } else if selector == ICryptoDevs::tokenIdsCall::SELECTOR {
            U256::from(c.token_ids).abi_encode()
        } else if selector == ICryptoDevs::maxTokenIdsCall::SELECTOR {
            U256::from(c.max_token_ids).abi_encode()
        } else {
            return Err(WalletError::new(3, "execution reverted"));
        };
        Ok(json!(hex::encode_prefixed(out)))
    }

    fn eth_send_transaction(&self, params: &Value) -> Result<Value, WalletError> {
        if self.reject_sends.load(Ordering::SeqCst) {
            return Err(WalletError::new(
                WalletError::USER_REJECTED,
                "User rejected the request.",
            ));
        }
        self.sends.fetch_add(1, Ordering::SeqCst);
        let tx = tx_request(params)?;
        let from = tx
            .from
            .ok_or_else(|| WalletError::new(-32602, "transaction has no sender"))?;
        let value = tx.value.unwrap_or_default();
        let selector = selector_of(&tx)?;

        let mut c = self.chain();
        c.last_value = Some(value);
        c.last_sender = Some(from);
        let success = c.execute(selector, from, value);
        c.next_tx += 1;
        c.block += 1;
        let hash = B256::from(U256::from(c.next_tx).to_be_bytes::<32>());
        let block = c.block;
        c.receipts.insert(
            hash,
            Mined {
                success,
                block,
                from,
            },
        );
        Ok(json!(hash))
    }

    fn eth_get_transaction_receipt(&self, params: &Value) -> Result<Value, WalletError> {
        let hash: B256 = params
            .get(0)
            .cloned()
            .and_then(|v| serde_json::from_value(v).ok())
            .ok_or_else(|| WalletError::new(-32602, "bad tx hash"))?;
        if self.hold_receipts.load(Ordering::SeqCst) {
            return Ok(Value::Null);
        }
        let c = self.chain();
        Ok(match c.receipts.get(&hash) {
            Some(mined) => json!({
                "type": "0x2",
                "status": if mined.success { "0x1" } else { "0x0" },
                "cumulativeGasUsed": "0x5208",
                "logs": [],
                "logsBloom": empty_bloom(),
                "transactionHash": hash,
                "transactionIndex": "0x0",
                "blockHash": block_hash(mined.block),
                "blockNumber": format!("{:#x}", mined.block),
                "gasUsed": "0x5208",
                "effectiveGasPrice": "0x1",
                "from": mined.from,
                "to": Self::CONTRACT,
                "contractAddress": null,
            }),
            None => Value::Null,
        })
    }

    /// Empty block; receipts are what confirm transactions here.
    fn eth_get_block_by_number(&self, params: &Value) -> Result<Value, WalletError> {
        let number = params
            .get(0)
            .and_then(Value::as_str)
            .and_then(|s| u64::from_str_radix(s.trim_start_matches("0x"), 16).ok())
            .unwrap_or_else(|| self.chain().block);
        let zero = B256::ZERO;
        Ok(json!({
            "hash": block_hash(number),
            "parentHash": block_hash(number.saturating_sub(1)),
            "sha3Uncles": zero,
            "miner": Address::ZERO,
            "stateRoot": zero,
            "transactionsRoot": zero,
            "receiptsRoot": zero,
            "logsBloom": empty_bloom(),
            "difficulty": "0x0",
            "number": format!("{number:#x}"),
            "gasLimit": "0x1c9c380",
            "gasUsed": "0x0",
            "timestamp": format!("{:#x}", unix_now()),
            "extraData": "0x",
            "mixHash": zero,
            "nonce": "0x0000000000000000",
            "baseFeePerGas": "0x1",
            "totalDifficulty": "0x0",
            "size": "0x0",
            "uncles": [],
            "transactions": [],
        }))
    }
}

impl Chain {
    /// Apply a write; `false` means the transaction reverted.
    fn execute(&mut self, selector: [u8; 4], from: Address, value: U256) -> bool {
        let now = unix_now();
        if selector == ICryptoDevs::startPresaleCall::SELECTOR {
            if from != self.owner {
                return false;
            }
            self.presale_started = true;
            self.presale_ended = now + PRESALE_SECS;
            true
        } else if selector == ICryptoDevs::presaleMintCall::SELECTOR {
            let open = self.presale_started && now < self.presale_ended;
            if !open || !self.whitelist.contains(&from) {
                return false;
            }
            self.mint_to(from, value)
        } else if selector == ICryptoDevs::mintCall::SELECTOR {
            if !self.presale_started || now < self.presale_ended {
                return false;
            }
            self.mint_to(from, value)
        } else {
            false
        }
    }

    fn mint_to(&mut self, to: Address, value: U256) -> bool {
        if self.token_ids >= self.max_token_ids || value < self.price {
            return false;
        }
        self.token_ids += 1;
        *self.balances.entry(to).or_default() += 1;
        true
    }
}

#[async_trait]
impl Eip1193 for FakeWallet {
    async fn request(&self, method: &str, params: Value) -> Result<Value, WalletError> {
        match method {
            "eth_chainId" => Ok(json!(format!("{:#x}", self.chain().chain_id))),
            "eth_blockNumber" => Ok(json!(format!("{:#x}", self.chain().block))),
            "eth_getBlockByNumber" => self.eth_get_block_by_number(&params),
            "eth_accounts" => {
                self.accounts_requests.fetch_add(1, Ordering::SeqCst);
                Ok(json!(self.chain().accounts))
            }
            "eth_call" => self.eth_call(&params),
            "eth_sendTransaction" => self.eth_send_transaction(&params),
            "eth_getTransactionReceipt" => self.eth_get_transaction_receipt(&params),
            other => Err(WalletError::new(
                -32601,
                format!("{other}: method not supported"),
            )),
        }
    }
}

/// Modal that always picks the same wallet, or none.
pub struct StaticModal {
    wallet: Option<Arc<FakeWallet>>,
    selects: AtomicU64,
}

impl StaticModal {
    pub fn new(wallet: Arc<FakeWallet>) -> Self {
        Self {
            wallet: Some(wallet),
            selects: AtomicU64::new(0),
        }
    }

    pub fn unavailable() -> Self {
        Self {
            wallet: None,
            selects: AtomicU64::new(0),
        }
    }

    pub fn selects(&self) -> u64 {
        self.selects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WalletModal for StaticModal {
    async fn select(&self) -> Result<WalletLink, crate::Error> {
        self.selects.fetch_add(1, Ordering::SeqCst);
        match &self.wallet {
            Some(w) => Ok(WalletLink::eip1193("fake", w.clone())),
            None => Err(crate::Error::ProviderUnavailable(
                "no wallet extension found".into(),
            )),
        }
    }
}

pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

fn tx_request(params: &Value) -> Result<TransactionRequest, WalletError> {
    let tx = params
        .get(0)
        .cloned()
        .ok_or_else(|| WalletError::new(-32602, "missing transaction object"))?;
    serde_json::from_value(tx).map_err(|e| WalletError::new(-32602, format!("bad transaction: {e}")))
}

fn selector_of(tx: &TransactionRequest) -> Result<[u8; 4], WalletError> {
    tx.input
        .input()
        .and_then(|data| data.get(..4))
        .and_then(|s| s.try_into().ok())
        .ok_or_else(|| WalletError::new(-32602, "calldata shorter than a selector"))
}

fn block_hash(number: u64) -> B256 {
    let mut bytes = [0xb1u8; 32];
    bytes[24..].copy_from_slice(&number.to_be_bytes());
    B256::from(bytes)
}

fn empty_bloom() -> String {
    format!("0x{}", "0".repeat(512))
}
