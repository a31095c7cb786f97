use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::board::MarketBoard;
use crate::models::ActiveMarkets;

/// Worker that periodically reloads the market board
pub struct MarketScannerWorker {
    board: MarketBoard,
    active_markets: Arc<RwLock<ActiveMarkets>>,
    scan_interval: Duration,
}

impl MarketScannerWorker {
    pub fn new(
        board: MarketBoard,
        active_markets: Arc<RwLock<ActiveMarkets>>,
        scan_interval_secs: u64,
    ) -> Self {
        Self {
            board,
            active_markets,
            scan_interval: Duration::from_secs(scan_interval_secs),
        }
    }

    /// Run the worker loop until `cancel` fires
    pub async fn run(&self, cancel: CancellationToken) {
        info!("Market scanner started (interval: {:?})", self.scan_interval);

        let mut interval = time::interval(self.scan_interval);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!("Market scanner stopped");
                    return;
                }
                _ = interval.tick() => self.scan(&cancel).await,
            }
        }
    }

    /// Perform a single scan, replacing the shared board on success
    pub async fn scan(&self, cancel: &CancellationToken) {
        info!("Scanning market contract...");

        match self.board.list_markets(cancel).await {
            Ok(markets) => {
                for market in markets.values() {
                    info!(
                        "Market #{}: {} (YES {}% / NO {}%{})",
                        market.id,
                        market.title,
                        market.probabilities.yes(),
                        market.probabilities.no(),
                        if market.resolved { ", resolved" } else { "" }
                    );
                }

                let count = markets.len();
                *self.active_markets.write().await = markets;
                info!("Market scan complete: {} markets", count);
            }
            Err(e) => {
                error!("Failed to scan markets: {}", e);
                warn!("Will retry on next interval");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use alloy::primitives::U256;

    use super::*;
    use crate::models::MarketRecord;
    use crate::reads::{ReadAccessor, ReadRequest, ReadValue};
    use crate::testing::{FakeChain, FakeMetadata};

    fn worker(chain: Arc<FakeChain>, active: Arc<RwLock<ActiveMarkets>>) -> MarketScannerWorker {
        let board = MarketBoard::new(
            Arc::new(ReadAccessor::new(chain)),
            Arc::new(FakeMetadata::new()),
        );
        MarketScannerWorker::new(board, active, 60)
    }

    #[tokio::test]
    async fn test_scan_replaces_board() {
        let chain = Arc::new(FakeChain::new());
        chain.set(ReadRequest::MarketCount, ReadValue::Count(1));
        chain.set(
            ReadRequest::Market(1),
            ReadValue::Market(MarketRecord {
                exists: true,
                liquidity: U256::from(1_000_000u64),
                q_yes: U256::ZERO,
                q_no: U256::ZERO,
                start_time: 0,
                end_time: 0,
                resolved: true,
                yes_won: true,
                question: "Did the vote pass?".to_string(),
                cid: String::new(),
            }),
        );

        let active = Arc::new(RwLock::new(ActiveMarkets::new()));
        worker(chain, active.clone())
            .scan(&CancellationToken::new())
            .await;

        let board = active.read().await;
        assert_eq!(board.len(), 1);
        assert!(board[&1].claim_affordance().yes);
        assert!(!board[&1].claim_affordance().no);
    }

    #[tokio::test]
    async fn test_failed_scan_keeps_previous_board() {
        let chain = Arc::new(FakeChain::new());
        let active = Arc::new(RwLock::new(ActiveMarkets::new()));
        worker(chain, active.clone())
            .scan(&CancellationToken::new())
            .await;
        assert!(active.read().await.is_empty());
    }

    #[tokio::test]
    async fn test_run_stops_on_cancel() {
        let chain = Arc::new(FakeChain::new());
        let active = Arc::new(RwLock::new(ActiveMarkets::new()));
        let cancel = CancellationToken::new();
        cancel.cancel();

        worker(chain, active).run(cancel).await;
    }
}
