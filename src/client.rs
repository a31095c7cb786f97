use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::actions::{AdvancePolicy, MarketActions, Notice, TxPipeline};
use crate::api::{EthFaucet, FaucetApiClient, IpfsGateway, MetadataStore, RpcChain};
use crate::board::MarketBoard;
use crate::config::Config;
use crate::reads::{ChainReader, ReadAccessor};
use crate::receipts::ReceiptWaiter;
use crate::wallet::{LocalWallet, Session, Wallet, WalletService};

const NOTICE_BUFFER: usize = 64;

/// Everything a market front end needs, sharing one read cache
pub struct MarketClient {
    pub session: Session,
    pub board: MarketBoard,
    pub actions: MarketActions,
    pub wallet: WalletService,
}

impl MarketClient {
    /// Connect to the configured RPC, IPFS and faucet endpoints
    pub fn from_config(config: &Config) -> Result<(Self, mpsc::Receiver<Notice>)> {
        let chain = RpcChain::connect(&config.rpc_url, config.contracts)?;
        let metadata = IpfsGateway::new(
            &config.ipfs_gateway_url,
            &config.ipfs_pin_url,
            config.ipfs_jwt.clone(),
        );
        let faucet = FaucetApiClient::new(&config.faucet_api_url);

        let session = match &config.wallet_private_key {
            Some(key) => {
                let wallet = LocalWallet::from_private_key(key, &config.rpc_url)
                    .context("Failed to load WALLET_PRIVATE_KEY")?;
                Session::connected(Arc::new(wallet) as Arc<dyn Wallet>)
            }
            None => {
                warn!("WALLET_PRIVATE_KEY is not set, running read-only");
                let mut session = Session::new();
                session.mark_ready();
                session
            }
        };

        Ok(Self::assemble(
            config,
            Arc::new(chain),
            Arc::new(metadata),
            Arc::new(faucet),
            session,
        ))
    }

    pub fn assemble(
        config: &Config,
        reader: Arc<dyn ChainReader>,
        metadata: Arc<dyn MetadataStore>,
        faucet: Arc<dyn EthFaucet>,
        session: Session,
    ) -> (Self, mpsc::Receiver<Notice>) {
        let reads = Arc::new(ReadAccessor::new(Arc::clone(&reader)));
        let waiter = ReceiptWaiter::new(
            reader,
            config.receipt_poll_interval,
            config.receipt_timeout,
        );
        let (notices, receiver) = mpsc::channel(NOTICE_BUFFER);
        let pipeline = TxPipeline::new(Arc::clone(&reads), waiter, config.contracts, notices);

        let policy = AdvancePolicy::from_flag(config.auto_advance_after_approve);
        info!(
            "Client ready: {:?}, receipts polled every {:?} for up to {:?}",
            policy, config.receipt_poll_interval, config.receipt_timeout
        );

        let client = Self {
            session,
            board: MarketBoard::new(reads, Arc::clone(&metadata)),
            actions: MarketActions::new(pipeline.clone(), metadata, policy),
            wallet: WalletService::new(pipeline, faucet),
        };
        (client, receiver)
    }

    pub fn reads(&self) -> &Arc<ReadAccessor> {
        self.actions.pipeline().reads()
    }
}
