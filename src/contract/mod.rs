//! Contract handles: method lookup, read-only calls and transaction drafts

use crate::chain::{CallMsg, NodeClient};
use crate::config::GasConfig;
use crate::error::{ContractError, ContractResult};
use crate::events::EventDescriptor;
use crate::tx::PendingTransaction;

use ethers::abi::{Abi, Function, Param, Token};
use ethers::types::{Address, BlockId, Bytes};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Decoded values keyed by parameter name, or by position for unnamed ones
pub type Decoded = BTreeMap<String, Token>;

/// An Ethereum contract
pub struct Contract {
    address: Address,
    from: Option<Address>,
    abi: Abi,
    client: Arc<dyn NodeClient>,
    gas_config: GasConfig,
}

impl Contract {
    /// Create a new contract instance
    pub fn new(address: Address, abi: Abi, client: Arc<dyn NodeClient>) -> Self {
        Self {
            address,
            from: None,
            abi,
            client,
            gas_config: GasConfig::default(),
        }
    }

    /// Create a contract instance from a JSON ABI
    pub fn from_json(
        address: Address,
        abi_json: &str,
        client: Arc<dyn NodeClient>,
    ) -> ContractResult<Self> {
        let abi: Abi = serde_json::from_str(abi_json)
            .map_err(|e| ContractError::Decoding(format!("invalid ABI: {}", e)))?;
        Ok(Self::new(address, abi, client))
    }

    /// Set the gas policy for transactions created from this contract
    pub fn with_gas_config(mut self, config: GasConfig) -> Self {
        self.gas_config = config;
        self
    }

    pub fn abi(&self) -> &Abi {
        &self.abi
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Set the origin of the calls
    pub fn set_from(&mut self, from: Address) {
        self.from = Some(from);
    }

    /// Look up a method by name or by full signature such as
    /// `transfer(address,uint256)`
    ///
    /// A bare name picks the first overload.
    pub fn method(&self, method: &str) -> ContractResult<&Function> {
        let wanted = method.replace(' ', "");

        let found = if wanted.contains('(') {
            self.abi
                .functions()
                .find(|f| function_signature(f) == wanted)
        } else {
            self.abi.function(&wanted).ok()
        };

        found.ok_or_else(|| ContractError::MethodNotFound(method.to_string()))
    }

    /// Look up an event by name
    pub fn event(&self, name: &str) -> ContractResult<EventDescriptor> {
        self.abi
            .event(name)
            .map(|event| EventDescriptor::new(event.clone()))
            .map_err(|_| ContractError::MethodNotFound(name.to_string()))
    }

    /// Create a transaction draft for a method
    pub fn txn(&self, method: &str, args: &[Token]) -> ContractResult<PendingTransaction> {
        let function = self.method(method)?.clone();

        let mut tx =
            PendingTransaction::method_call(self.client.clone(), self.address, function, args.to_vec())
                .with_gas_config(&self.gas_config);
        if let Some(from) = self.from {
            tx = tx.with_from(from);
        }
        Ok(tx)
    }

    /// Estimate the gas for a contract call
    pub async fn estimate_gas(&self, method: &str, args: &[Token]) -> ContractResult<u64> {
        self.txn(method, args)?.estimate_gas().await
    }

    /// Call a method in the contract without sending a transaction
    pub async fn call(
        &self,
        method: &str,
        args: &[Token],
        block: impl Into<BlockId> + Send,
    ) -> ContractResult<Decoded> {
        let block = block.into();
        let function = self.method(method)?;

        let data = function
            .encode_input(args)
            .map_err(|e| ContractError::Encoding(format!("{}: {}", function.name, e)))?;

        let msg = CallMsg {
            from: self.from,
            to: Some(self.address),
            data: Bytes::from(data),
            value: None,
        };

        let raw = self.client.call(&msg, block).await?;
        if raw.is_empty() {
            return Err(ContractError::EmptyResponse);
        }
        debug!("{} returned {} bytes", function.name, raw.len());

        let tokens = function
            .decode_output(&raw)
            .map_err(|e| ContractError::Decoding(format!("{}: {}", function.name, e)))?;

        Ok(name_values(&function.outputs, tokens))
    }
}

/// Draft the deployment of a contract
pub fn deploy(
    client: Arc<dyn NodeClient>,
    from: Address,
    abi: &Abi,
    bytecode: Bytes,
    args: &[Token],
) -> PendingTransaction {
    PendingTransaction::deploy(client, from, abi, bytecode, args.to_vec())
}

/// Canonical `name(type,...)` form of a function
fn function_signature(function: &Function) -> String {
    let types: Vec<String> = function
        .inputs
        .iter()
        .map(|param| param.kind.to_string())
        .collect();
    format!("{}({})", function.name, types.join(","))
}

fn name_values(params: &[Param], tokens: Vec<Token>) -> Decoded {
    params
        .iter()
        .zip(tokens)
        .enumerate()
        .map(|(i, (param, token))| {
            let key = if param.name.is_empty() {
                i.to_string()
            } else {
                param.name.clone()
            };
            (key, token)
        })
        .collect()
}
