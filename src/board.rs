use std::collections::HashMap;
use std::sync::Arc;

use alloy::primitives::U256;
use thiserror::Error;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::api::MetadataStore;
use crate::error::ChainError;
use crate::models::{ActiveMarkets, Market, MarketMetadata, MarketRecord};
use crate::reads::{ReadAccessor, ReadRequest, ReadState};

#[derive(Debug, Error)]
pub enum BoardError {
    #[error("failed to read market count: {0}")]
    Count(ChainError),

    #[error("market listing cancelled")]
    Cancelled,
}

/// Assembles display-ready markets from chain reads and off-chain metadata
pub struct MarketBoard {
    reads: Arc<ReadAccessor>,
    metadata: Arc<dyn MetadataStore>,
}

impl MarketBoard {
    pub fn new(reads: Arc<ReadAccessor>, metadata: Arc<dyn MetadataStore>) -> Self {
        Self { reads, metadata }
    }

    /// Every market the contract knows about. Ids whose record could not be
    /// read are left out; a missing price or metadata document is not fatal.
    pub async fn list_markets(&self, cancel: &CancellationToken) -> Result<ActiveMarkets, BoardError> {
        let count_state = self.reads.query(&ReadRequest::MarketCount, true).await;
        let count = match count_state.value.as_ref().and_then(|v| v.as_count()) {
            Some(count) => count,
            None => return Err(BoardError::Count(read_error(count_state))),
        };

        debug!("Contract reports {} markets", count);
        if count == 0 {
            return Ok(ActiveMarkets::new());
        }

        let ids: Vec<u64> = (1..=count).collect();
        let requests: Vec<ReadRequest> = ids
            .iter()
            .map(|id| ReadRequest::Market(*id))
            .chain(ids.iter().map(|id| ReadRequest::PriceYes(*id)))
            .collect();

        let states = self.reads.query_batch(&requests, true).await;
        let (record_states, price_states) = states.split_at(ids.len());

        let mut records: Vec<(u64, MarketRecord, Option<U256>)> = Vec::new();
        for ((id, record), price) in ids.iter().zip(record_states).zip(price_states) {
            match record.value.as_ref().and_then(|v| v.as_market()) {
                Some(record) if record.exists => {
                    let price = price.value.as_ref().and_then(|v| v.as_price());
                    records.push((*id, record.clone(), price));
                }
                Some(_) => debug!("Market {} does not exist, skipping", id),
                None => warn!("Skipping market {}: record unavailable", id),
            }
        }

        let documents = self
            .fetch_documents(records.iter().map(|(_, r, _)| r.cid.as_str()), cancel)
            .await?;

        let markets: ActiveMarkets = records
            .iter()
            .map(|(id, record, price)| {
                let market = Market::assemble(
                    *id,
                    record,
                    *price,
                    documents.get(&record.cid),
                    |image| self.metadata.resolve_url(image),
                );
                (*id, market)
            })
            .collect();

        info!("Loaded {} of {} markets", markets.len(), count);
        Ok(markets)
    }

    /// A single market, or `None` when the id is unknown or unreadable
    pub async fn market(
        &self,
        id: u64,
        cancel: &CancellationToken,
    ) -> Result<Option<Market>, BoardError> {
        let requests = [ReadRequest::Market(id), ReadRequest::PriceYes(id)];
        let states = self.reads.query_batch(&requests, true).await;

        let record = match states[0].value.as_ref().and_then(|v| v.as_market()) {
            Some(record) if record.exists => record.clone(),
            _ => return Ok(None),
        };
        let price = states[1].value.as_ref().and_then(|v| v.as_price());

        let documents = self
            .fetch_documents(std::iter::once(record.cid.as_str()), cancel)
            .await?;

        Ok(Some(Market::assemble(
            id,
            &record,
            price,
            documents.get(&record.cid),
            |image| self.metadata.resolve_url(image),
        )))
    }

    /// Fetch each distinct non-empty cId once, concurrently. Dropping the
    /// task set on cancellation aborts fetches still in flight.
    async fn fetch_documents<'a>(
        &self,
        cids: impl Iterator<Item = &'a str>,
        cancel: &CancellationToken,
    ) -> Result<HashMap<String, MarketMetadata>, BoardError> {
        let mut tasks = JoinSet::new();
        let mut seen: Vec<&str> = Vec::new();
        for cid in cids {
            if cid.is_empty() || seen.contains(&cid) {
                continue;
            }
            seen.push(cid);

            let store = Arc::clone(&self.metadata);
            let cid = cid.to_string();
            tasks.spawn(async move {
                let document = store.fetch(&cid).await;
                (cid, document)
            });
        }

        let mut documents = HashMap::new();
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(BoardError::Cancelled),
                next = tasks.join_next() => match next {
                    Some(Ok((cid, Ok(document)))) => {
                        documents.insert(cid, document);
                    }
                    Some(Ok((cid, Err(e)))) => warn!("Metadata for {} unavailable: {}", cid, e),
                    Some(Err(e)) => warn!("Metadata fetch task failed: {}", e),
                    None => return Ok(documents),
                },
            }
        }
    }
}

fn read_error(state: ReadState) -> ChainError {
    ChainError::Rpc(state.error.unwrap_or_else(|| "no value returned".to_string()))
}
