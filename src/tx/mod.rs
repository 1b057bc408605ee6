//! Transaction pipeline: drafting, gas resolution, signing, broadcast and receipts

mod gas;
mod pending;
mod receipt;
mod sender;

pub use gas::GasEstimator;
pub use pending::PendingTransaction;
pub use sender::{load_wallet, SentTransaction, TransactionSigner, DEFAULT_PRIVATE_KEY_ENV};
