//! Gas estimation for calls and contract deployments

use crate::chain::{CallMsg, NodeClient};
use crate::config::GasConfig;
use crate::error::ContractResult;

use tracing::debug;

/// Gas estimator for transactions
#[derive(Debug, Clone, Copy, Default)]
pub struct GasEstimator {
    /// Buffer percentage for gas limit (e.g., 20 = 20% buffer)
    gas_limit_buffer_percent: u64,
}

impl GasEstimator {
    /// Create a new gas estimator with no buffer
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &GasConfig) -> Self {
        Self {
            gas_limit_buffer_percent: config.limit_buffer_percent,
        }
    }

    /// Ask the node for a gas estimate
    ///
    /// Deployments are estimated from their init code alone; calls carry sender,
    /// recipient and value as well.
    pub async fn estimate(
        &self,
        client: &dyn NodeClient,
        msg: &CallMsg,
        deployment: bool,
    ) -> ContractResult<u64> {
        let gas = if deployment {
            client.estimate_gas_for_deployment(&msg.data).await?
        } else {
            client.estimate_gas(msg).await?
        };

        debug!(
            "Estimated {} gas for {}",
            gas,
            if deployment { "deployment" } else { "call" }
        );
        Ok(gas)
    }

    /// Gas limit to use for a raw estimate
    pub fn limit_for(&self, estimate: u64) -> u64 {
        let buffer = estimate.saturating_mul(self.gas_limit_buffer_percent) / 100;
        estimate.saturating_add(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::MockNodeClient;
    use ethers::types::{Address, Bytes};

    #[test]
    fn test_limit_without_buffer() {
        assert_eq!(GasEstimator::new().limit_for(21_000), 21_000);
    }

    #[test]
    fn test_limit_with_buffer() {
        let estimator = GasEstimator::from_config(&GasConfig {
            limit_buffer_percent: 20,
        });
        assert_eq!(estimator.limit_for(100_000), 120_000);
        assert_eq!(estimator.limit_for(u64::MAX), u64::MAX);
    }

    #[tokio::test]
    async fn test_deployment_uses_creation_estimate() {
        let mut client = MockNodeClient::new();
        client
            .expect_estimate_gas_for_deployment()
            .withf(|data| data.to_vec() == vec![0x60, 0x80])
            .times(1)
            .returning(|_| Ok(90_000));

        let msg = CallMsg {
            data: Bytes::from(vec![0x60, 0x80]),
            ..Default::default()
        };

        let gas = GasEstimator::new().estimate(&client, &msg, true).await.unwrap();
        assert_eq!(gas, 90_000);
    }

    #[tokio::test]
    async fn test_call_uses_call_estimate() {
        let to = Address::repeat_byte(0x22);
        let mut client = MockNodeClient::new();
        client
            .expect_estimate_gas()
            .withf(move |msg| msg.to == Some(to))
            .times(1)
            .returning(|_| Ok(30_000));

        let msg = CallMsg {
            to: Some(to),
            ..Default::default()
        };

        let gas = GasEstimator::new().estimate(&client, &msg, false).await.unwrap();
        assert_eq!(gas, 30_000);
    }
}
