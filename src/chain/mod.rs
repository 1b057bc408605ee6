//! Chain module - the node-facing side of the crate
//!
//! This module provides:
//! - The `NodeClient` trait every contract and transaction operation talks through
//! - An HTTP implementation backed by ethers with multi-RPC failover

pub mod provider;

pub use provider::HttpNodeClient;

use crate::error::ContractResult;

use async_trait::async_trait;
use ethers::types::{Address, BlockId, Bytes, TransactionReceipt, H256, U256};

/// Message for read-only calls and gas estimation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallMsg {
    pub from: Option<Address>,
    pub to: Option<Address>,
    pub data: Bytes,
    pub value: Option<U256>,
}

/// Requests the crate needs from an Ethereum node
///
/// Implementations pass transport failures through as
/// [`ContractError::Network`](crate::error::ContractError::Network). A receipt
/// that does not exist yet is `Ok(None)`, never an error.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NodeClient: Send + Sync {
    /// `eth_call` against the given block
    async fn call(&self, msg: &CallMsg, block: BlockId) -> ContractResult<Bytes>;

    async fn estimate_gas(&self, msg: &CallMsg) -> ContractResult<u64>;

    /// Estimate gas for a contract creation carrying `data` as init code
    async fn estimate_gas_for_deployment(&self, data: &Bytes) -> ContractResult<u64>;

    async fn gas_price(&self) -> ContractResult<U256>;

    async fn get_nonce(&self, address: Address, block: BlockId) -> ContractResult<u64>;

    async fn send_raw_transaction(&self, raw: Bytes) -> ContractResult<H256>;

    async fn get_transaction_receipt(
        &self,
        hash: H256,
    ) -> ContractResult<Option<TransactionReceipt>>;

    async fn chain_id(&self) -> ContractResult<u64>;
}
