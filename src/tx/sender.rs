//! Signing and broadcasting of transaction drafts

use super::pending::PendingTransaction;
use super::receipt::wait_for_receipt;
use crate::chain::NodeClient;
use crate::config::{WaitConfig, WalletConfig};
use crate::error::{ContractError, ContractResult};

use ethers::signers::{LocalWallet, Signer};
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Address, Bytes, TransactionReceipt, H256};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Environment variable holding the key when the config names none
pub const DEFAULT_PRIVATE_KEY_ENV: &str = "WEB3_PRIVATE_KEY";

/// Key material that can sign transactions for a chain
#[cfg_attr(test, mockall::automock)]
pub trait TransactionSigner: Send + Sync {
    /// Address the signatures recover to
    fn signer_address(&self) -> Address;

    /// Sign with the chain ID bound into the signature (EIP-155) and return the
    /// RLP encoding ready for broadcast
    fn sign_and_encode(&self, tx: &TypedTransaction, chain_id: u64) -> ContractResult<Bytes>;
}

impl TransactionSigner for LocalWallet {
    fn signer_address(&self) -> Address {
        Signer::address(self)
    }

    fn sign_and_encode(&self, tx: &TypedTransaction, chain_id: u64) -> ContractResult<Bytes> {
        let mut tx = tx.clone();
        tx.set_chain_id(chain_id);

        let signature = self
            .sign_transaction_sync(&tx)
            .map_err(|e| ContractError::Signing(e.to_string()))?;

        Ok(tx.rlp_signed(&signature))
    }
}

/// Load wallet from the environment variable named in the config
pub fn load_wallet(config: &WalletConfig) -> ContractResult<LocalWallet> {
    let var = config
        .private_key_env
        .as_deref()
        .unwrap_or(DEFAULT_PRIVATE_KEY_ENV);

    let key = std::env::var(var).map_err(|_| {
        ContractError::Config(format!("No wallet configured. Set {} to a private key", var))
    })?;

    key.trim()
        .parse::<LocalWallet>()
        .map_err(|e| ContractError::Signing(format!("Invalid private key in {}: {}", var, e)))
}

/// A transaction the node has accepted
///
/// Only [`PendingTransaction::sign_and_send`] produces this type, so a receipt can
/// only be awaited for a transaction that has a hash.
pub struct SentTransaction {
    client: Arc<dyn NodeClient>,
    hash: H256,
    from: Address,
    nonce: u64,
    chain_id: u64,
}

impl SentTransaction {
    pub fn hash(&self) -> H256 {
        self.hash
    }

    pub fn from(&self) -> Address {
        self.from
    }

    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Wait till the transaction is mined
    ///
    /// Polls with exponential backoff until a receipt shows up, the timeout in
    /// `config` expires or `cancel` fires. Any error other than a missing receipt
    /// ends the wait.
    pub async fn wait(
        &self,
        config: &WaitConfig,
        cancel: &CancellationToken,
    ) -> ContractResult<TransactionReceipt> {
        wait_for_receipt(self.client.as_ref(), self.hash, config, cancel).await
    }
}

impl PendingTransaction {
    /// Sign the draft and send it to the network
    ///
    /// Runs encode, gas price, gas limit, nonce, sign and broadcast strictly in
    /// that order and stops at the first error. The draft is consumed either way;
    /// build a new one to try again.
    pub async fn sign_and_send<S>(
        mut self,
        signer: &S,
        chain_id: u64,
    ) -> ContractResult<SentTransaction>
    where
        S: TransactionSigner + ?Sized,
    {
        let from = self.resolve_sender(signer)?;

        let tx = self.build_transaction(from, chain_id).await?;
        let nonce = tx.nonce().map(|n| n.as_u64()).unwrap_or_default();

        let raw = signer.sign_and_encode(&tx, chain_id)?;
        debug!("Signed {} byte transaction for chain {}", raw.len(), chain_id);

        let hash = self.client.send_raw_transaction(raw).await?;
        info!(
            "Transaction sent: {:?} (from {:?}, nonce {}, chain {})",
            hash, from, nonce, chain_id
        );

        Ok(SentTransaction {
            client: self.client,
            hash,
            from,
            nonce,
            chain_id,
        })
    }

    /// Blocking combination of [`sign_and_send`](Self::sign_and_send) and
    /// [`SentTransaction::wait`]
    pub async fn sign_send_and_wait<S>(
        self,
        signer: &S,
        chain_id: u64,
        config: &WaitConfig,
        cancel: &CancellationToken,
    ) -> ContractResult<TransactionReceipt>
    where
        S: TransactionSigner + ?Sized,
    {
        let sent = self.sign_and_send(signer, chain_id).await?;
        sent.wait(config, cancel).await
    }

    fn resolve_sender<S>(&self, signer: &S) -> ContractResult<Address>
    where
        S: TransactionSigner + ?Sized,
    {
        let signer_address = signer.signer_address();
        match self.from {
            Some(from) if from != signer_address => Err(ContractError::Signing(format!(
                "transaction sender {:?} does not match signer {:?}",
                from, signer_address
            ))),
            _ => Ok(signer_address),
        }
    }
}
