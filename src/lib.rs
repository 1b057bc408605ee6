//! Contract calls, transaction pipeline and EIP-55 addresses for EVM chains
//!
//! This crate provides:
//! - Contract handles that encode method calls and decode their results
//! - Transaction drafts that resolve gas price, gas limit and nonce, sign with
//!   EIP-155 replay protection, broadcast and wait for the receipt
//! - Event descriptors for filtering and decoding logs
//! - EIP-55 checksum address conversion and verification
//!
//! ABI encoding, RLP, signing and JSON-RPC come from `ethers`; everything
//! node-facing goes through the [`chain::NodeClient`] trait.

pub mod address;
pub mod chain;
pub mod config;
pub mod contract;
pub mod error;
pub mod events;
pub mod logging;
pub mod tx;

#[cfg(test)]
mod test_utils;

pub use address::{is_checksum_address, to_checksum_address};
pub use chain::{CallMsg, HttpNodeClient, NodeClient};
pub use config::Settings;
pub use contract::{deploy, Contract, Decoded};
pub use error::{ContractError, ContractResult};
pub use events::EventDescriptor;
pub use tx::{PendingTransaction, SentTransaction, TransactionSigner};
