use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use super::{ChainReader, ReadRequest, ReadValue};

/// Freshness of a cached read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadStatus {
    /// The query is disabled (e.g. no wallet address yet)
    Disabled,
    /// Never fetched
    Idle,
    /// A network read is in flight
    Loading,
    Fresh,
    /// Invalidated by a confirmed mutation, must be re-read before use
    Stale,
    Failed,
}

/// What a caller sees for one read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadState {
    pub value: Option<ReadValue>,
    pub status: ReadStatus,
    pub error: Option<String>,
    pub fetched_at: Option<DateTime<Utc>>,
}

impl ReadState {
    fn disabled() -> Self {
        Self {
            value: None,
            status: ReadStatus::Disabled,
            error: None,
            fetched_at: None,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.status == ReadStatus::Loading
    }

    /// Value that can be trusted right now, if any
    pub fn fresh_value(&self) -> Option<&ReadValue> {
        match self.status {
            ReadStatus::Fresh => self.value.as_ref(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: Option<ReadValue>,
    stale: bool,
    in_flight: bool,
    error: Option<String>,
    fetched_at: Option<DateTime<Utc>>,
}

impl CacheEntry {
    fn pending() -> Self {
        Self {
            value: None,
            stale: false,
            in_flight: true,
            error: None,
            fetched_at: None,
        }
    }

    fn state(&self) -> ReadState {
        let status = if self.in_flight {
            ReadStatus::Loading
        } else if self.error.is_some() {
            ReadStatus::Failed
        } else if self.stale {
            ReadStatus::Stale
        } else if self.value.is_some() {
            ReadStatus::Fresh
        } else {
            ReadStatus::Idle
        };

        ReadState {
            value: self.value.clone(),
            status,
            error: self.error.clone(),
            fetched_at: self.fetched_at,
        }
    }

    fn is_fresh(&self) -> bool {
        !self.stale && !self.in_flight && self.error.is_none() && self.value.is_some()
    }
}

/// Cache-backed read layer over a [`ChainReader`]
pub struct ReadAccessor {
    reader: Arc<dyn ChainReader>,
    cache: RwLock<HashMap<ReadRequest, CacheEntry>>,
}

impl ReadAccessor {
    pub fn new(reader: Arc<dyn ChainReader>) -> Self {
        Self {
            reader,
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn reader(&self) -> &Arc<dyn ChainReader> {
        &self.reader
    }

    /// Cached state without touching the network
    pub async fn peek(&self, request: &ReadRequest) -> ReadState {
        let cache = self.cache.read().await;
        match cache.get(request) {
            Some(entry) => entry.state(),
            None => ReadState {
                value: None,
                status: ReadStatus::Idle,
                error: None,
                fetched_at: None,
            },
        }
    }

    /// Return the cached value when fresh, otherwise read it.
    /// A disabled query performs no I/O.
    pub async fn query(&self, request: &ReadRequest, enabled: bool) -> ReadState {
        if !enabled {
            return ReadState::disabled();
        }

        {
            let cache = self.cache.read().await;
            if let Some(entry) = cache.get(request) {
                if entry.is_fresh() {
                    return entry.state();
                }
            }
        }

        self.refetch(request).await
    }

    /// Read from the network regardless of cache state
    pub async fn refetch(&self, request: &ReadRequest) -> ReadState {
        self.mark_in_flight(std::slice::from_ref(request)).await;

        let result = self.reader.read(request).await;

        let mut cache = self.cache.write().await;
        let entry = cache
            .entry(request.clone())
            .or_insert_with(CacheEntry::pending);
        store_result(entry, request, result.map_err(|e| e.to_string()));
        entry.state()
    }

    /// Batched variant of [`query`](Self::query). Results keep the order of
    /// `requests`; one failing read never fails the others.
    pub async fn query_batch(&self, requests: &[ReadRequest], enabled: bool) -> Vec<ReadState> {
        if !enabled {
            return requests.iter().map(|_| ReadState::disabled()).collect();
        }

        let missing: Vec<ReadRequest> = {
            let cache = self.cache.read().await;
            let mut seen = Vec::new();
            for request in requests {
                let fresh = cache.get(request).map(|e| e.is_fresh()).unwrap_or(false);
                if !fresh && !seen.contains(request) {
                    seen.push(request.clone());
                }
            }
            seen
        };

        if !missing.is_empty() {
            self.fetch_batch(&missing).await;
        }

        let cache = self.cache.read().await;
        requests
            .iter()
            .map(|r| {
                cache
                    .get(r)
                    .map(|e| e.state())
                    .unwrap_or_else(ReadState::disabled)
            })
            .collect()
    }

    /// Mark the given reads stale so the next query goes to the network
    pub async fn invalidate(&self, keys: &[ReadRequest]) {
        let mut cache = self.cache.write().await;
        for key in keys {
            if let Some(entry) = cache.get_mut(key) {
                debug!("Invalidated {}", key.name());
                entry.stale = true;
            }
        }
    }

    /// Invalidate then immediately re-read the given keys
    pub async fn refresh(&self, keys: &[ReadRequest]) -> Vec<ReadState> {
        self.invalidate(keys).await;
        self.query_batch(keys, true).await
    }

    async fn fetch_batch(&self, requests: &[ReadRequest]) {
        self.mark_in_flight(requests).await;

        let results: Vec<Result<ReadValue, String>> = match self.reader.read_batch(requests).await {
            Ok(results) => results
                .into_iter()
                .map(|r| r.map_err(|e| e.to_string()))
                .collect(),
            Err(e) => {
                warn!("Batch read of {} calls failed: {}", requests.len(), e);
                let message = e.to_string();
                requests.iter().map(|_| Err(message.clone())).collect()
            }
        };

        let mut cache = self.cache.write().await;
        for (request, result) in requests.iter().zip(results) {
            let entry = cache
                .entry(request.clone())
                .or_insert_with(CacheEntry::pending);
            store_result(entry, request, result);
        }
    }

    async fn mark_in_flight(&self, requests: &[ReadRequest]) {
        let mut cache = self.cache.write().await;
        for request in requests {
            cache
                .entry(request.clone())
                .and_modify(|e| e.in_flight = true)
                .or_insert_with(CacheEntry::pending);
        }
    }
}

fn store_result(entry: &mut CacheEntry, request: &ReadRequest, result: Result<ReadValue, String>) {
    entry.in_flight = false;
    entry.fetched_at = Some(Utc::now());

    match result {
        Ok(value) => {
            entry.value = Some(value);
            entry.stale = false;
            entry.error = None;
        }
        Err(message) => {
            // A failed read never falls back to a value that may predate a mutation
            warn!("Read {} failed: {}", request.name(), message);
            entry.value = None;
            entry.error = Some(message);
        }
    }
}
