//! Contract event descriptors and log decoding

use crate::contract::Decoded;
use crate::error::{ContractError, ContractResult};

use ethers::abi::{Event, RawLog};
use ethers::types::{Log, H256};

/// A named event schema from a contract ABI
#[derive(Debug, Clone)]
pub struct EventDescriptor {
    event: Event,
}

impl EventDescriptor {
    pub fn new(event: Event) -> Self {
        Self { event }
    }

    pub fn name(&self) -> &str {
        &self.event.name
    }

    /// Topic hash logs of this event carry as their first topic
    pub fn id(&self) -> H256 {
        self.event.signature()
    }

    /// Check if a log was emitted by this event
    ///
    /// Anonymous events have no identifying topic and never match.
    pub fn matches(&self, log: &Log) -> bool {
        !self.event.anonymous && log.topics.first() == Some(&self.id())
    }

    /// Decode the indexed topics and data of a log
    pub fn parse_log(&self, log: &Log) -> ContractResult<Decoded> {
        let raw = RawLog {
            topics: log.topics.clone(),
            data: log.data.to_vec(),
        };

        let parsed = self
            .event
            .parse_log(raw)
            .map_err(|e| ContractError::Decoding(format!("{} log: {}", self.event.name, e)))?;

        Ok(parsed
            .params
            .into_iter()
            .enumerate()
            .map(|(i, param)| {
                let key = if param.name.is_empty() {
                    i.to_string()
                } else {
                    param.name
                };
                (key, param.value)
            })
            .collect())
    }
}
