//! Wallet provider boundary: the EIP-1193 request seam and the alloy provider built over it.

use alloy::primitives::Address;
use alloy::providers::{Provider, RootProvider};
use alloy::rpc::client::RpcClient;
use alloy::rpc::json_rpc::{
    ErrorPayload, RequestPacket, Response, ResponsePacket, ResponsePayload, SerializedRequest,
};
use alloy::transports::http::reqwest::{Client, Url};
use alloy::transports::http::Http;
use alloy::transports::{
    BoxTransport, Transport, TransportError, TransportErrorKind, TransportFut, TransportResult,
};
use async_trait::async_trait;
use serde_json::Value;
use std::future::IntoFuture;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tower::Service;
use tracing::debug;

use crate::metrics::METRICS;

/// Anything exposing EIP-1193 `request` semantics, such as an injected wallet.
#[async_trait]
pub trait Eip1193: Send + Sync {
    async fn request(&self, method: &str, params: Value) -> Result<Value, WalletError>;
}

/// JSON-RPC error object as the wallet reports it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletError {
    pub code: i64,
    pub message: String,
}

impl WalletError {
    /// EIP-1193 "user rejected the request".
    pub const USER_REJECTED: i64 = 4001;

    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Exposes an [`Eip1193`] wallet as an alloy transport.
#[derive(Clone)]
pub struct Eip1193Transport {
    wallet: Arc<dyn Eip1193>,
}

impl Eip1193Transport {
    pub fn new(wallet: Arc<dyn Eip1193>) -> Self {
        Self { wallet }
    }

    async fn dispatch(self, packet: RequestPacket) -> TransportResult<ResponsePacket> {
        match packet {
            RequestPacket::Single(req) => Ok(ResponsePacket::Single(self.answer(req).await?)),
            RequestPacket::Batch(reqs) => {
                let mut out = Vec::with_capacity(reqs.len());
                for req in reqs {
                    out.push(self.answer(req).await?);
                }
                Ok(ResponsePacket::Batch(out))
            }
        }
    }

    async fn answer(&self, req: SerializedRequest) -> TransportResult<Response> {
        let params = match req.params() {
            Some(raw) => serde_json::from_str(raw.get()).map_err(TransportErrorKind::custom)?,
            None => Value::Array(Vec::new()),
        };
        let payload = match self.wallet.request(req.method(), params).await {
            Ok(result) => ResponsePayload::Success(
                serde_json::value::to_raw_value(&result).map_err(TransportErrorKind::custom)?,
            ),
            Err(e) => ResponsePayload::Failure(ErrorPayload {
                code: e.code,
                message: e.message.into(),
                data: None,
            }),
        };
        Ok(Response {
            id: req.id().clone(),
            payload,
        })
    }
}

impl Service<RequestPacket> for Eip1193Transport {
    type Response = ResponsePacket;
    type Error = TransportError;
    type Future = TransportFut<'static>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: RequestPacket) -> Self::Future {
        Box::pin(self.clone().dispatch(req))
    }
}

/// A wallet picked by the modal: a transport not yet bound to a client.
pub struct WalletLink {
    pub label: String,
    transport: BoxTransport,
    is_local: bool,
}

impl WalletLink {
    /// JSON-RPC over HTTP (a wallet bridge or node endpoint).
    pub fn http(label: &str, url: &str, timeout: Duration) -> Result<Self, crate::Error> {
        let url: Url = url
            .parse()
            .map_err(|e| crate::Error::Config(format!("connector url {url:?}: {e}")))?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| crate::Error::Config(format!("http client: {e}")))?;
        Ok(Self {
            label: label.to_string(),
            transport: Http::with_client(client, url).boxed(),
            is_local: false,
        })
    }

    /// An in-process EIP-1193 wallet.
    pub fn eip1193(label: &str, wallet: Arc<dyn Eip1193>) -> Self {
        Self {
            label: label.to_string(),
            transport: Eip1193Transport::new(wallet).boxed(),
            is_local: true,
        }
    }
}

/// Ethereum provider over the selected wallet. Every request is bounded by
/// `timeout`; cloning shares the underlying client.
#[derive(Clone)]
pub struct WalletProvider {
    label: String,
    inner: RootProvider,
    timeout: Duration,
}

impl WalletProvider {
    pub fn new(link: WalletLink, timeout: Duration, receipt_poll: Duration) -> Self {
        let client = RpcClient::new(link.transport, link.is_local).with_poll_interval(receipt_poll);
        Self {
            label: link.label,
            inner: RootProvider::new(client),
            timeout,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// The alloy provider, for contract bindings.
    pub fn root(&self) -> &RootProvider {
        &self.inner
    }

    /// Await `fut`, failing with `Rpc` once the request timeout passes.
    pub async fn within<F: IntoFuture>(&self, what: &str, fut: F) -> Result<F::Output, crate::Error> {
        debug!(what, connector = %self.label, "rpc request");
        tokio::time::timeout(self.timeout, fut).await.map_err(|_| {
            METRICS.rpc_errors.fetch_add(1, Ordering::Relaxed);
            crate::Error::Rpc(format!("{what} timed out after {}s", self.timeout.as_secs()))
        })
    }

    pub async fn chain_id(&self) -> Result<u64, crate::Error> {
        self.within("eth_chainId", self.inner.get_chain_id())
            .await?
            .map_err(|e| classify("eth_chainId", e))
    }

    /// Accounts the wallet has authorized for this dApp.
    pub async fn accounts(&self) -> Result<Vec<Address>, crate::Error> {
        self.within("eth_accounts", self.inner.get_accounts())
            .await?
            .map_err(|e| classify("eth_accounts", e))
    }
}

/// Map a transport failure; execution reverts get their own variant.
pub(crate) fn classify(what: &str, err: TransportError) -> crate::Error {
    METRICS.rpc_errors.fetch_add(1, Ordering::Relaxed);
    match err.as_error_resp() {
        Some(resp) if resp.code == 3 || resp.message.to_ascii_lowercase().contains("revert") => {
            crate::Error::ContractCallReverted(format!("{what}: {}", resp.message))
        }
        Some(resp) => crate::Error::Rpc(format!("{what}: [{}] {}", resp.code, resp.message)),
        None => crate::Error::Rpc(format!("{what}: {err}")),
    }
}
