//! Node client with multi-RPC support and automatic failover

use super::{CallMsg, NodeClient};
use crate::config::NodeConfig;
use crate::error::{ContractError, ContractResult};

use async_trait::async_trait;
use ethers::providers::{Http, Middleware, Provider, ProviderError, RpcError};
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{
    Address, BlockId, Bytes, TransactionReceipt, TransactionRequest, H256, U256,
};
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};

/// HTTP node client over one or more RPC endpoints
///
/// Read-only requests move on to the next endpoint when one fails. Broadcasts go
/// to the active endpoint only, so a raw transaction is never submitted twice.
pub struct HttpNodeClient {
    /// Node configuration
    config: NodeConfig,
    /// HTTP providers (multiple for failover)
    http_providers: Vec<Provider<Http>>,
    /// Current active provider index
    current_provider: AtomicUsize,
}

impl HttpNodeClient {
    /// Create a new client without contacting the node
    pub fn new(config: NodeConfig) -> ContractResult<Self> {
        let mut http_providers = Vec::new();

        for url in &config.rpc_urls {
            match Provider::<Http>::try_from(url.as_str()) {
                Ok(provider) => {
                    let provider =
                        provider.interval(Duration::from_millis(config.request_interval_ms));
                    http_providers.push(provider);
                    debug!("Added HTTP provider for chain {}: {}", config.chain_id, url);
                }
                Err(e) => {
                    warn!("Failed to create provider for {}: {}", url, e);
                }
            }
        }

        if http_providers.is_empty() {
            return Err(ContractError::Config(format!(
                "No valid RPC providers for chain {}",
                config.chain_id
            )));
        }

        Ok(Self {
            config,
            http_providers,
            current_provider: AtomicUsize::new(0),
        })
    }

    /// Create a client and check that the node serves the configured chain
    pub async fn connect(config: NodeConfig) -> ContractResult<Self> {
        let client = Self::new(config)?;

        let remote = NodeClient::chain_id(&client).await?;
        if remote != client.config.chain_id {
            return Err(ContractError::Config(format!(
                "Node reports chain {} but chain {} is configured",
                remote, client.config.chain_id
            )));
        }

        info!(
            "Connected to chain {} via {} endpoint(s)",
            remote,
            client.http_providers.len()
        );
        Ok(client)
    }

    /// Get the active HTTP provider
    pub fn http(&self) -> &Provider<Http> {
        let idx = self.current_provider.load(Ordering::Relaxed);
        &self.http_providers[idx % self.http_providers.len()]
    }

    /// Switch to next available provider
    pub fn failover(&self) {
        let len = self.http_providers.len();
        if let Ok(previous) =
            self.current_provider
                .fetch_update(Ordering::AcqRel, Ordering::Acquire, |idx| {
                    Some((idx + 1) % len)
                })
        {
            warn!(
                "Chain {} failover to provider {}",
                self.config.chain_id,
                (previous + 1) % len
            );
        }
    }

    /// Move past the provider at `observed` unless another request already did
    fn advance_from(&self, observed: usize) {
        let next = (observed + 1) % self.http_providers.len();
        if self
            .current_provider
            .compare_exchange(observed, next, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            warn!("Chain {} failover to provider {}", self.config.chain_id, next);
        }
    }

    /// Chain ID from the configuration
    pub fn configured_chain_id(&self) -> u64 {
        self.config.chain_id
    }

    /// Run a read-only request, failing over through every endpoint once
    ///
    /// A JSON-RPC error response is the node's answer, not an endpoint failure,
    /// and is returned without trying the other endpoints.
    async fn with_failover<'a, T, F, Fut>(&'a self, operation: &str, request: F) -> ContractResult<T>
    where
        F: Fn(&'a Provider<Http>) -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let mut last_error = None;

        for _ in 0..self.http_providers.len() {
            let idx = self.current_provider.load(Ordering::Relaxed);
            let provider = &self.http_providers[idx % self.http_providers.len()];

            match request(provider).await {
                Ok(value) => return Ok(value),
                Err(e) if e.as_error_response().is_some() => {
                    debug!("{} rejected on chain {}: {}", operation, self.config.chain_id, e);
                    return Err(provider_error(operation, e));
                }
                Err(e) => {
                    warn!(
                        "{} failed on chain {}: {}",
                        operation, self.config.chain_id, e
                    );
                    last_error = Some(e);
                    self.advance_from(idx);
                }
            }
        }

        Err(ContractError::Network(match last_error {
            Some(e) => format!("{}: {}", operation, e),
            None => format!("{}: all providers failed", operation),
        }))
    }
}

#[async_trait]
impl NodeClient for HttpNodeClient {
    async fn call(&self, msg: &CallMsg, block: BlockId) -> ContractResult<Bytes> {
        let tx = to_typed_transaction(msg);
        self.with_failover("eth_call", |p| p.call(&tx, Some(block)))
            .await
    }

    async fn estimate_gas(&self, msg: &CallMsg) -> ContractResult<u64> {
        let tx = to_typed_transaction(msg);
        let gas = self
            .with_failover("eth_estimateGas", |p| p.estimate_gas(&tx, None))
            .await?;
        to_u64(gas, "gas estimate")
    }

    async fn estimate_gas_for_deployment(&self, data: &Bytes) -> ContractResult<u64> {
        let tx: TypedTransaction = TransactionRequest::new().data(data.clone()).into();
        let gas = self
            .with_failover("eth_estimateGas", |p| p.estimate_gas(&tx, None))
            .await?;
        to_u64(gas, "gas estimate")
    }

    async fn gas_price(&self) -> ContractResult<U256> {
        self.with_failover("eth_gasPrice", |p| p.get_gas_price())
            .await
    }

    async fn get_nonce(&self, address: Address, block: BlockId) -> ContractResult<u64> {
        let nonce = self
            .with_failover("eth_getTransactionCount", |p| {
                p.get_transaction_count(address, Some(block))
            })
            .await?;
        to_u64(nonce, "nonce")
    }

    async fn send_raw_transaction(&self, raw: Bytes) -> ContractResult<H256> {
        let pending = self
            .http()
            .send_raw_transaction(raw)
            .await
            .map_err(|e| provider_error("eth_sendRawTransaction", e))?;
        Ok(pending.tx_hash())
    }

    async fn get_transaction_receipt(
        &self,
        hash: H256,
    ) -> ContractResult<Option<TransactionReceipt>> {
        self.with_failover("eth_getTransactionReceipt", |p| {
            p.get_transaction_receipt(hash)
        })
        .await
    }

    async fn chain_id(&self) -> ContractResult<u64> {
        let id = self
            .with_failover("eth_chainId", |p| p.get_chainid())
            .await?;
        to_u64(id, "chain id")
    }
}

fn to_typed_transaction(msg: &CallMsg) -> TypedTransaction {
    let mut tx = TransactionRequest::new().data(msg.data.clone());
    if let Some(from) = msg.from {
        tx = tx.from(from);
    }
    if let Some(to) = msg.to {
        tx = tx.to(to);
    }
    if let Some(value) = msg.value {
        tx = tx.value(value);
    }
    tx.into()
}

fn provider_error(operation: &str, e: ProviderError) -> ContractError {
    match e.as_error_response() {
        Some(response) => ContractError::Rejected {
            code: response.code,
            message: response.message.clone(),
        },
        None => ContractError::Network(format!("{}: {}", operation, e)),
    }
}

fn to_u64(value: U256, what: &str) -> ContractResult<u64> {
    if value > U256::from(u64::MAX) {
        return Err(ContractError::Decoding(format!(
            "{} {} does not fit in 64 bits",
            what, value
        )));
    }
    Ok(value.as_u64())
}
