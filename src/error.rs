//! Error types for contract calls and the transaction pipeline

use thiserror::Error;

/// Main error type for contract and transaction operations
#[derive(Error, Debug)]
pub enum ContractError {
    /// Unknown method or event name
    #[error("Method {0} not found")]
    MethodNotFound(String),

    #[error("Failed to encode arguments: {0}")]
    Encoding(String),

    #[error("Failed to decode response: {0}")]
    Decoding(String),

    /// Call returned zero bytes (reverted or no code at the address)
    #[error("Empty response")]
    EmptyResponse,

    #[error("Network error: {0}")]
    Network(String),

    /// JSON-RPC error response, e.g. `execution reverted`
    #[error("Request rejected by node (code {code}): {message}")]
    Rejected { code: i64, message: String },

    #[error("Signing error: {0}")]
    Signing(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Timeout waiting for {operation}")]
    Timeout { operation: String },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ContractError {
    /// Check if error is retryable
    ///
    /// Only the failing request itself may be retried. A draft that failed inside
    /// `sign_and_send` must still be rebuilt.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ContractError::Network(_) | ContractError::Timeout { .. }
        )
    }
}

/// Result type for contract operations
pub type ContractResult<T> = Result<T, ContractError>;
