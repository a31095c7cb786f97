use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::TxHash;
use thiserror::Error;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::ChainError;
use crate::reads::{ChainReader, TxReceipt};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WaitError {
    #[error("transaction {0} reverted")]
    Reverted(TxHash),

    #[error("no receipt for {hash} after {waited:?}; its fate is unknown")]
    TimedOut { hash: TxHash, waited: Duration },

    #[error("stopped waiting for {0}")]
    Cancelled(TxHash),

    #[error("failed to fetch receipt: {0}")]
    Chain(#[from] ChainError),
}

/// Polls for transaction receipts
#[derive(Clone)]
pub struct ReceiptWaiter {
    reader: Arc<dyn ChainReader>,
    poll_interval: Duration,
    timeout: Duration,
}

impl ReceiptWaiter {
    pub fn new(reader: Arc<dyn ChainReader>, poll_interval: Duration, timeout: Duration) -> Self {
        Self {
            reader,
            poll_interval,
            timeout,
        }
    }

    /// Wait until `hash` is mined. A timeout is reported as an error, never
    /// as success; cancellation stops polling without touching any state.
    pub async fn wait(
        &self,
        hash: TxHash,
        cancel: &CancellationToken,
    ) -> Result<TxReceipt, WaitError> {
        let started = Instant::now();
        let deadline = started + self.timeout;

        loop {
            if cancel.is_cancelled() {
                return Err(WaitError::Cancelled(hash));
            }

            match self.reader.receipt(hash).await? {
                Some(receipt) if receipt.success => {
                    info!(
                        "Transaction {} confirmed in block {:?}",
                        hash, receipt.block_number
                    );
                    return Ok(receipt);
                }
                Some(_) => {
                    warn!("Transaction {} reverted", hash);
                    return Err(WaitError::Reverted(hash));
                }
                None => debug!("Transaction {} still pending", hash),
            }

            let now = Instant::now();
            if now >= deadline {
                warn!("Gave up waiting for {} after {:?}", hash, self.timeout);
                return Err(WaitError::TimedOut {
                    hash,
                    waited: now - started,
                });
            }

            let nap = self.poll_interval.min(deadline - now);
            tokio::select! {
                _ = cancel.cancelled() => return Err(WaitError::Cancelled(hash)),
                _ = time::sleep(nap) => {}
            }
        }
    }
}
