use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lmsr_market::config::Config;
use lmsr_market::server::{self, FaucetState};
use lmsr_market::wallet::{LocalWallet, Wallet};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lmsr_market=info,warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting faucet service");

    // Load configuration
    let config = Config::from_env()?;
    info!("Configuration loaded (chain id {})", config.chain_id);

    // Funding wallet; requests fail with a configuration error without it
    let signer: Option<Arc<dyn Wallet>> = match &config.faucet_private_key {
        Some(key) => match LocalWallet::from_private_key(key, &config.rpc_url) {
            Ok(wallet) => Some(Arc::new(wallet) as Arc<dyn Wallet>),
            Err(e) => {
                error!("Failed to load faucet wallet: {:#}", e);
                None
            }
        },
        None => {
            warn!("FAUCET_PRIVATE_KEY is not set, claims will be refused");
            None
        }
    };

    let app = server::router(FaucetState {
        signer,
        contracts: config.contracts,
    });

    let listener = TcpListener::bind(&config.server_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.server_addr))?;
    info!("Listening on {}", config.server_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Shutdown signal received");
            }
        })
        .await
        .context("Server error")?;

    info!("Faucet service stopped");
    Ok(())
}
