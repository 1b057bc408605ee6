//! Receipt polling with backoff, timeout and cancellation

use crate::chain::NodeClient;
use crate::config::WaitConfig;
use crate::error::{ContractError, ContractResult};

use ethers::types::{TransactionReceipt, H256};
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Wait for the receipt of `hash`
pub(crate) async fn wait_for_receipt(
    client: &dyn NodeClient,
    hash: H256,
    config: &WaitConfig,
    cancel: &CancellationToken,
) -> ContractResult<TransactionReceipt> {
    tokio::select! {
        biased;

        _ = cancel.cancelled() => {
            info!("Stopped waiting for {:?}: cancelled", hash);
            Err(ContractError::Cancelled)
        }

        result = timeout(config.timeout(), poll_receipt(client, hash, config)) => {
            result.map_err(|_| ContractError::Timeout {
                operation: format!("receipt of {:?}", hash),
            })?
        }
    }
}

async fn poll_receipt(
    client: &dyn NodeClient,
    hash: H256,
    config: &WaitConfig,
) -> ContractResult<TransactionReceipt> {
    let mut delay = config.initial_interval();
    let mut attempts = 0u32;

    loop {
        attempts += 1;

        if let Some(receipt) = client.get_transaction_receipt(hash).await? {
            info!(
                "Transaction {:?} mined in block {:?} after {} polls",
                hash, receipt.block_number, attempts
            );
            return Ok(receipt);
        }

        debug!(
            "Receipt for {:?} not found (attempt {}), next poll in {:?}",
            hash, attempts, delay
        );
        sleep(delay).await;
        delay = config.next_interval(delay);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::MockNodeClient;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    fn wait_config() -> WaitConfig {
        WaitConfig {
            initial_poll_interval_ms: 100,
            max_poll_interval_ms: 1_000,
            backoff_multiplier: 2.0,
            timeout_secs: 10,
        }
    }

    fn receipt(hash: H256) -> TransactionReceipt {
        TransactionReceipt {
            transaction_hash: hash,
            block_number: Some(12u64.into()),
            ..Default::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_until_receipt_appears() {
        let hash = H256::repeat_byte(0x01);
        let mut polls = 0;
        let mut client = MockNodeClient::new();
        client
            .expect_get_transaction_receipt()
            .times(3)
            .returning(move |h| {
                polls += 1;
                if polls < 3 {
                    Ok(None)
                } else {
                    Ok(Some(receipt(h)))
                }
            });

        let result = wait_for_receipt(&client, hash, &wait_config(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(result.transaction_hash, hash);
        assert_eq!(result.block_number, Some(12u64.into()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_grows_between_polls() {
        let hash = H256::repeat_byte(0x02);
        let polls = Arc::new(AtomicU32::new(0));
        let counter = polls.clone();

        let mut client = MockNodeClient::new();
        client
            .expect_get_transaction_receipt()
            .returning(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(None)
            });

        let start = tokio::time::Instant::now();
        let result = wait_for_receipt(&client, hash, &wait_config(), &CancellationToken::new()).await;

        assert!(matches!(result, Err(ContractError::Timeout { .. })));
        assert!(start.elapsed() >= Duration::from_secs(10));
        // 100 + 200 + 400 + 800 ms, then one poll per second until the deadline
        let count = polls.load(Ordering::SeqCst);
        assert!((11..=16).contains(&count), "unexpected poll count {}", count);
    }

    #[tokio::test(start_paused = true)]
    async fn test_node_error_aborts_wait() {
        let mut client = MockNodeClient::new();
        client
            .expect_get_transaction_receipt()
            .times(1)
            .returning(|_| Err(ContractError::Network("503 Service Unavailable".into())));

        let result = wait_for_receipt(
            &client,
            H256::repeat_byte(0x03),
            &wait_config(),
            &CancellationToken::new(),
        )
        .await;

        assert!(matches!(result, Err(ContractError::Network(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_stops_polling() {
        let mut client = MockNodeClient::new();
        client
            .expect_get_transaction_receipt()
            .returning(|_| Ok(None));

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            sleep(Duration::from_millis(500)).await;
            trigger.cancel();
        });

        let result = wait_for_receipt(&client, H256::repeat_byte(0x04), &wait_config(), &cancel).await;
        assert!(matches!(result, Err(ContractError::Cancelled)));
    }

    #[tokio::test]
    async fn test_already_cancelled_does_not_poll() {
        let client = MockNodeClient::new();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = wait_for_receipt(&client, H256::repeat_byte(0x05), &wait_config(), &cancel).await;
        assert!(matches!(result, Err(ContractError::Cancelled)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unvalidated_wait_config_still_times_out() {
        let polls = Arc::new(AtomicU32::new(0));
        let counter = polls.clone();

        let mut client = MockNodeClient::new();
        client
            .expect_get_transaction_receipt()
            .returning(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(None)
            });

        let config = WaitConfig {
            initial_poll_interval_ms: 0,
            max_poll_interval_ms: 0,
            backoff_multiplier: -1.0,
            timeout_secs: 1,
        };
        let result = wait_for_receipt(&client, H256::repeat_byte(0x06), &config, &CancellationToken::new()).await;

        assert!(matches!(result, Err(ContractError::Timeout { .. })));
        // One poll per minimum interval, never a busy loop
        let count = polls.load(Ordering::SeqCst);
        assert!((90..=101).contains(&count), "unexpected poll count {}", count);
    }
}
