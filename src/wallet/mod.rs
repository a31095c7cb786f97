pub mod service;

use std::sync::Arc;

use alloy::network::EthereumWallet;
use alloy::primitives::{Address, Bytes, TxHash, U256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::types::{TransactionInput, TransactionRequest};
use alloy::signers::local::PrivateKeySigner;
use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::{debug, info};

use crate::error::{ActionError, ChainError};

pub use service::WalletService;

/// Unsigned transaction handed to a wallet for signing and submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxRequest {
    pub to: Address,
    pub data: Bytes,
    pub value: U256,
}

impl TxRequest {
    /// Contract call carrying no native value
    pub fn call(to: Address, data: Vec<u8>) -> Self {
        Self {
            to,
            data: data.into(),
            value: U256::ZERO,
        }
    }
}

/// Signs and submits transactions for one account
#[async_trait]
pub trait Wallet: Send + Sync {
    fn address(&self) -> Address;

    /// Submit a transaction, returning its hash once the node accepted it
    async fn send(&self, tx: TxRequest) -> Result<TxHash, ChainError>;
}

/// Wallet backed by a local private key and an HTTP provider
pub struct LocalWallet {
    provider: DynProvider,
    address: Address,
}

impl LocalWallet {
    pub fn from_private_key(private_key: &str, rpc_url: &str) -> Result<Self> {
        let signer: PrivateKeySigner = private_key
            .trim()
            .parse()
            .context("Invalid private key")?;
        let address = signer.address();

        let url = rpc_url.parse().context("Invalid RPC URL")?;
        let provider = ProviderBuilder::new()
            .wallet(EthereumWallet::from(signer))
            .connect_http(url)
            .erased();

        info!("Local wallet loaded for {}", address);
        Ok(Self { provider, address })
    }
}

#[async_trait]
impl Wallet for LocalWallet {
    fn address(&self) -> Address {
        self.address
    }

    async fn send(&self, tx: TxRequest) -> Result<TxHash, ChainError> {
        debug!("Sending transaction to {} ({} bytes)", tx.to, tx.data.len());

        let request = TransactionRequest::default()
            .from(self.address)
            .to(tx.to)
            .value(tx.value)
            .input(TransactionInput::new(tx.data));

        let pending = self
            .provider
            .send_transaction(request)
            .await
            .map_err(|e| ChainError::Rejected(e.to_string()))?;

        Ok(*pending.tx_hash())
    }
}

/// Wallet session, constructed once and passed to whatever needs it
#[derive(Clone, Default)]
pub struct Session {
    ready: bool,
    wallet: Option<Arc<dyn Wallet>>,
}

impl Session {
    /// A session whose wallet provider has not finished initializing
    pub fn new() -> Self {
        Self::default()
    }

    /// A ready session already connected to `wallet`
    pub fn connected(wallet: Arc<dyn Wallet>) -> Self {
        Self {
            ready: true,
            wallet: Some(wallet),
        }
    }

    pub fn mark_ready(&mut self) {
        self.ready = true;
    }

    pub fn connect(&mut self, wallet: Arc<dyn Wallet>) {
        info!("Wallet connected: {}", wallet.address());
        self.wallet = Some(wallet);
    }

    pub fn disconnect(&mut self) {
        if let Some(wallet) = self.wallet.take() {
            info!("Wallet disconnected: {}", wallet.address());
        }
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn is_connected(&self) -> bool {
        self.ready && self.wallet.is_some()
    }

    pub fn address(&self) -> Option<Address> {
        self.wallet.as_ref().map(|w| w.address())
    }

    /// The connected wallet, or the prompt the user should see instead
    pub fn require_wallet(&self) -> Result<Arc<dyn Wallet>, ActionError> {
        if !self.ready {
            return Err(ActionError::WalletNotReady);
        }
        self.wallet.clone().ok_or(ActionError::NotConnected)
    }
}
