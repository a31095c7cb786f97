//! In-memory fakes for the chain, the wallet and the metadata store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use alloy::primitives::{Address, TxHash, B256};
use alloy::sol_types::SolCall;
use async_trait::async_trait;

use crate::api::MetadataStore;
use crate::contracts::IERC20;
use crate::error::ChainError;
use crate::models::MarketMetadata;
use crate::reads::{ChainReader, ReadRequest, ReadValue, TxReceipt};
use crate::wallet::{TxRequest, Wallet};

#[derive(Default)]
pub struct FakeChain {
    values: Mutex<HashMap<ReadRequest, ReadValue>>,
    receipts: Mutex<HashMap<TxHash, TxReceipt>>,
    reads: AtomicUsize,
    batches: AtomicUsize,
    batched: Mutex<Vec<ReadRequest>>,
    fail_batches: AtomicBool,
}

impl FakeChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, request: ReadRequest, value: ReadValue) {
        self.values.lock().unwrap().insert(request, value);
    }

    pub fn add_receipt(&self, hash: TxHash, success: bool) {
        self.receipts.lock().unwrap().insert(
            hash,
            TxReceipt {
                hash,
                block_number: Some(1),
                success,
            },
        );
    }

    pub fn fail_batches(&self) {
        self.fail_batches.store(true, Ordering::SeqCst);
    }

    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn batch_count(&self) -> usize {
        self.batches.load(Ordering::SeqCst)
    }

    pub fn batched_requests(&self) -> Vec<ReadRequest> {
        self.batched.lock().unwrap().clone()
    }

    fn lookup(&self, request: &ReadRequest) -> Result<ReadValue, ChainError> {
        self.values
            .lock()
            .unwrap()
            .get(request)
            .cloned()
            .ok_or(ChainError::Reverted(request.name()))
    }
}

#[async_trait]
impl ChainReader for FakeChain {
    async fn read(&self, request: &ReadRequest) -> Result<ReadValue, ChainError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.lookup(request)
    }

    async fn read_batch(
        &self,
        requests: &[ReadRequest],
    ) -> Result<Vec<Result<ReadValue, ChainError>>, ChainError> {
        self.batches.fetch_add(1, Ordering::SeqCst);
        if self.fail_batches.load(Ordering::SeqCst) {
            return Err(ChainError::Rpc("connection refused".to_string()));
        }
        self.batched.lock().unwrap().extend(requests.iter().cloned());
        Ok(requests.iter().map(|r| self.lookup(r)).collect())
    }

    async fn receipt(&self, hash: TxHash) -> Result<Option<TxReceipt>, ChainError> {
        Ok(self.receipts.lock().unwrap().get(&hash).cloned())
    }
}

/// Wallet that records what it sends and mines it instantly on the fake
/// chain. Approvals update the allowance the chain reports.
pub struct FakeWallet {
    address: Address,
    chain: Arc<FakeChain>,
    sent: Mutex<Vec<TxRequest>>,
    reject_with: Mutex<Option<String>>,
    mine: AtomicBool,
}

impl FakeWallet {
    pub fn new(address: Address, chain: Arc<FakeChain>) -> Self {
        Self {
            address,
            chain,
            sent: Mutex::new(Vec::new()),
            reject_with: Mutex::new(None),
            mine: AtomicBool::new(true),
        }
    }

    pub fn reject_with(&self, message: &str) {
        *self.reject_with.lock().unwrap() = Some(message.to_string());
    }

    /// Leave submitted transactions pending forever
    pub fn stop_mining(&self) {
        self.mine.store(false, Ordering::SeqCst);
    }

    pub fn resume_mining(&self) {
        self.mine.store(true, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<TxRequest> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Wallet for FakeWallet {
    fn address(&self) -> Address {
        self.address
    }

    async fn send(&self, tx: TxRequest) -> Result<TxHash, ChainError> {
        if let Some(message) = self.reject_with.lock().unwrap().clone() {
            return Err(ChainError::Rejected(message));
        }

        let mut sent = self.sent.lock().unwrap();
        sent.push(tx.clone());
        let hash = B256::with_last_byte(sent.len() as u8);
        drop(sent);

        if !self.mine.load(Ordering::SeqCst) {
            return Ok(hash);
        }

        if tx.data.starts_with(&IERC20::approveCall::SELECTOR) {
            if let Ok(call) = IERC20::approveCall::abi_decode(&tx.data) {
                self.chain.set(
                    ReadRequest::Allowance {
                        owner: self.address,
                        spender: call.spender,
                    },
                    ReadValue::Amount(call.amount),
                );
            }
        }
        self.chain.add_receipt(hash, true);

        Ok(hash)
    }
}

#[derive(Default)]
pub struct FakeMetadata {
    documents: Mutex<HashMap<String, MarketMetadata>>,
    uploads: AtomicUsize,
}

impl FakeMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, cid: &str, metadata: MarketMetadata) {
        self.documents
            .lock()
            .unwrap()
            .insert(cid.to_string(), metadata);
    }

    pub fn upload_count(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MetadataStore for FakeMetadata {
    async fn upload_json(&self, metadata: &MarketMetadata) -> anyhow::Result<String> {
        let n = self.uploads.fetch_add(1, Ordering::SeqCst) + 1;
        let cid = format!("bafyFake{}", n);
        self.insert(&cid, metadata.clone());
        Ok(cid)
    }

    async fn fetch(&self, cid: &str) -> anyhow::Result<MarketMetadata> {
        self.documents
            .lock()
            .unwrap()
            .get(cid)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("no document for {}", cid))
    }

    fn resolve_url(&self, reference: &str) -> String {
        format!("https://ipfs.test/ipfs/{}", reference.trim_start_matches("ipfs://"))
    }
}
