use alloy::primitives::{Address, Bytes, TxHash};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::types::{TransactionInput, TransactionReceipt, TransactionRequest};
use alloy::sol_types::SolCall;
use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::{debug, info};

use crate::contracts::{Contracts, IMulticall3};
use crate::error::ChainError;
use crate::reads::{ChainReader, ReadRequest, ReadValue, TxReceipt};

/// JSON-RPC backed chain reader
pub struct RpcChain {
    provider: DynProvider,
    contracts: Contracts,
}

impl RpcChain {
    /// Create a reader for the node at `rpc_url`
    pub fn connect(rpc_url: &str, contracts: Contracts) -> Result<Self> {
        let url = rpc_url.parse().context("Invalid RPC URL")?;
        let provider = ProviderBuilder::new().connect_http(url).erased();

        info!("Chain reader connected to {}", rpc_url);
        Ok(Self {
            provider,
            contracts,
        })
    }

    pub fn contracts(&self) -> &Contracts {
        &self.contracts
    }

    async fn eth_call(&self, to: Address, data: Vec<u8>) -> Result<Bytes, ChainError> {
        let tx = TransactionRequest::default()
            .to(to)
            .input(TransactionInput::new(data.into()));

        self.provider
            .call(tx)
            .await
            .map_err(|e| ChainError::Rpc(e.to_string()))
    }
}

#[async_trait]
impl ChainReader for RpcChain {
    async fn read(&self, request: &ReadRequest) -> Result<ReadValue, ChainError> {
        debug!("Reading {}", request.name());

        if let ReadRequest::NativeBalance(owner) = request {
            let balance = self
                .provider
                .get_balance(*owner)
                .await
                .map_err(|e| ChainError::Rpc(e.to_string()))?;
            return Ok(ReadValue::Amount(balance));
        }

        let (to, data) = request.encode(&self.contracts);
        let raw = self.eth_call(to, data).await?;
        request.decode(&raw)
    }

    async fn read_batch(
        &self,
        requests: &[ReadRequest],
    ) -> Result<Vec<Result<ReadValue, ChainError>>, ChainError> {
        if requests.is_empty() {
            return Ok(Vec::new());
        }

        debug!("Batch reading {} calls through multicall", requests.len());

        let calls: Vec<IMulticall3::Call3> = requests
            .iter()
            .map(|request| {
                let (target, data) = request.encode(&self.contracts);
                IMulticall3::Call3 {
                    target,
                    allowFailure: true,
                    callData: data.into(),
                }
            })
            .collect();

        let raw = self
            .eth_call(
                self.contracts.multicall,
                IMulticall3::aggregate3Call { calls }.abi_encode(),
            )
            .await?;

        let results = IMulticall3::aggregate3Call::abi_decode_returns(&raw).map_err(|e| {
            ChainError::Decode {
                call: "aggregate3",
                message: e.to_string(),
            }
        })?;

        if results.len() != requests.len() {
            return Err(ChainError::BatchMismatch {
                expected: requests.len(),
                got: results.len(),
            });
        }

        Ok(requests
            .iter()
            .zip(results)
            .map(|(request, result)| {
                if result.success {
                    request.decode(&result.returnData)
                } else {
                    Err(ChainError::Reverted(request.name()))
                }
            })
            .collect())
    }

    async fn receipt(&self, hash: TxHash) -> Result<Option<TxReceipt>, ChainError> {
        let receipt = self
            .provider
            .get_transaction_receipt(hash)
            .await
            .map_err(|e| ChainError::Rpc(e.to_string()))?;

        Ok(receipt.map(|r| to_receipt(hash, &r)))
    }
}

fn to_receipt(hash: TxHash, receipt: &TransactionReceipt) -> TxReceipt {
    TxReceipt {
        hash,
        block_number: receipt.block_number,
        success: receipt.status(),
    }
}
