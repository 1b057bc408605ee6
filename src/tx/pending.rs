//! Transaction drafts: encoding, gas resolution and assembly

use super::gas::GasEstimator;
use crate::chain::{CallMsg, NodeClient};
use crate::config::GasConfig;
use crate::error::{ContractError, ContractResult};

use ethers::abi::{Abi, Constructor, Function, Token};
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Address, BlockId, BlockNumber, Bytes, TransactionRequest, U256};
use std::sync::Arc;
use tracing::{debug, warn};

/// What the call data is built from
#[derive(Debug, Clone)]
enum Payload {
    /// Method call: selector followed by encoded arguments
    Method(Function),
    /// Contract creation: bytecode followed by encoded constructor arguments
    Deployment {
        bytecode: Bytes,
        constructor: Option<Constructor>,
    },
}

/// A transaction that has not been sent yet
///
/// Call data is encoded once, on the first [`finalize`](Self::finalize), and never
/// recomputed afterwards. Gas price and gas limit stay unset until the caller
/// provides them or [`sign_and_send`](Self::sign_and_send) resolves them.
pub struct PendingTransaction {
    pub(crate) client: Arc<dyn NodeClient>,
    pub(crate) from: Option<Address>,
    pub(crate) to: Option<Address>,
    payload: Payload,
    args: Vec<Token>,
    data: Option<Bytes>,
    pub(crate) value: Option<U256>,
    pub(crate) gas_price: Option<U256>,
    pub(crate) gas_limit: Option<u64>,
    pub(crate) gas_estimator: GasEstimator,
}

impl PendingTransaction {
    /// Draft a call to `function` on the contract at `to`
    pub(crate) fn method_call(
        client: Arc<dyn NodeClient>,
        to: Address,
        function: Function,
        args: Vec<Token>,
    ) -> Self {
        Self::with_payload(client, Some(to), Payload::Method(function), args)
    }

    /// Draft a contract deployment
    pub fn deploy(
        client: Arc<dyn NodeClient>,
        from: Address,
        abi: &Abi,
        bytecode: Bytes,
        args: Vec<Token>,
    ) -> Self {
        let payload = Payload::Deployment {
            bytecode,
            constructor: abi.constructor().cloned(),
        };

        let mut tx = Self::with_payload(client, None, payload, args);
        tx.from = Some(from);
        tx
    }

    fn with_payload(
        client: Arc<dyn NodeClient>,
        to: Option<Address>,
        payload: Payload,
        args: Vec<Token>,
    ) -> Self {
        Self {
            client,
            from: None,
            to,
            payload,
            args,
            data: None,
            value: None,
            gas_price: None,
            gas_limit: None,
            gas_estimator: GasEstimator::new(),
        }
    }

    /// Replace the arguments; ignored once the data has been encoded
    pub fn with_args(mut self, args: Vec<Token>) -> Self {
        if self.data.is_some() {
            warn!("Arguments changed after the transaction was finalized; keeping encoded data");
        }
        self.args = args;
        self
    }

    pub fn with_from(mut self, from: Address) -> Self {
        self.from = Some(from);
        self
    }

    pub fn with_value(mut self, value: U256) -> Self {
        self.value = Some(value);
        self
    }

    pub fn with_gas_price(mut self, gas_price: U256) -> Self {
        self.gas_price = Some(gas_price);
        self
    }

    pub fn with_gas_limit(mut self, gas_limit: u64) -> Self {
        self.gas_limit = Some(gas_limit);
        self
    }

    pub fn with_gas_config(mut self, config: &GasConfig) -> Self {
        self.gas_estimator = GasEstimator::from_config(config);
        self
    }

    /// Check if this draft creates a contract
    pub fn is_deployment(&self) -> bool {
        matches!(self.payload, Payload::Deployment { .. })
    }

    pub fn from(&self) -> Option<Address> {
        self.from
    }

    pub fn to(&self) -> Option<Address> {
        self.to
    }

    pub fn value(&self) -> Option<U256> {
        self.value
    }

    pub fn gas_price(&self) -> Option<U256> {
        self.gas_price
    }

    pub fn gas_limit(&self) -> Option<u64> {
        self.gas_limit
    }

    /// Encoded call data, if finalized
    pub fn data(&self) -> Option<&Bytes> {
        self.data.as_ref()
    }

    /// Encode the call data unless that already happened
    pub fn finalize(&mut self) -> ContractResult<&Bytes> {
        let data = match self.data.take() {
            Some(data) => data,
            None => {
                let data = self.encode()?;
                debug!(
                    "Encoded {} bytes of {} data",
                    data.len(),
                    if self.is_deployment() { "deployment" } else { "call" }
                );
                data
            }
        };

        let data: &Bytes = self.data.insert(data);
        Ok(data)
    }

    fn encode(&self) -> ContractResult<Bytes> {
        match &self.payload {
            Payload::Method(function) => function
                .encode_input(&self.args)
                .map(Bytes::from)
                .map_err(|e| {
                    ContractError::Encoding(format!("{}: {}", function.name, e))
                }),
            Payload::Deployment {
                bytecode,
                constructor: Some(constructor),
            } => constructor
                .encode_input(bytecode.to_vec(), &self.args)
                .map(Bytes::from)
                .map_err(|e| ContractError::Encoding(format!("constructor: {}", e))),
            Payload::Deployment {
                bytecode,
                constructor: None,
            } => {
                if !self.args.is_empty() {
                    return Err(ContractError::Encoding(format!(
                        "contract has no constructor but {} arguments were given",
                        self.args.len()
                    )));
                }
                Ok(bytecode.clone())
            }
        }
    }

    /// Message describing this draft, with whatever data is encoded so far
    pub(crate) fn call_msg(&self) -> CallMsg {
        CallMsg {
            from: self.from,
            to: self.to,
            data: self.data.clone().unwrap_or_default(),
            value: self.value,
        }
    }

    /// Estimate gas for this draft, finalizing it first
    pub async fn estimate_gas(&mut self) -> ContractResult<u64> {
        self.finalize()?;
        self.gas_estimator
            .estimate(self.client.as_ref(), &self.call_msg(), self.is_deployment())
            .await
    }

    /// Resolve every field and assemble the unsigned transaction
    ///
    /// Encodes the data, fetches the gas price and gas limit when they are unset
    /// and reads the sender's nonce at the latest block, in that order. Resolved
    /// gas values are stored on the draft.
    pub async fn build_transaction(
        &mut self,
        from: Address,
        chain_id: u64,
    ) -> ContractResult<TypedTransaction> {
        self.finalize()?;

        let gas_price = match self.gas_price {
            Some(price) => price,
            None => {
                let price = self.client.gas_price().await?;
                debug!("Fetched gas price {}", price);
                self.gas_price = Some(price);
                price
            }
        };

        let gas_limit = match self.gas_limit {
            Some(limit) => limit,
            None => {
                let mut msg = self.call_msg();
                msg.from = Some(from);
                let estimate = self
                    .gas_estimator
                    .estimate(self.client.as_ref(), &msg, self.is_deployment())
                    .await?;
                let limit = self.gas_estimator.limit_for(estimate);
                self.gas_limit = Some(limit);
                limit
            }
        };

        let nonce = self
            .client
            .get_nonce(from, BlockId::Number(BlockNumber::Latest))
            .await?;
        debug!("Using nonce {} for {:?}", nonce, from);

        let mut request = TransactionRequest::new()
            .from(from)
            .data(self.data.clone().unwrap_or_default())
            .gas_price(gas_price)
            .gas(gas_limit)
            .nonce(nonce)
            .chain_id(chain_id);
        if let Some(to) = self.to {
            request = request.to(to);
        }
        if let Some(value) = self.value {
            request = request.value(value);
        }

        Ok(TypedTransaction::Legacy(request))
    }
}
