use std::env;
use std::time::Duration;

use alloy::primitives::Address;
use anyhow::{Context, Result};

use crate::contracts::{Contracts, MULTICALL3_ADDRESS};
use crate::units::TOKEN_DECIMALS;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// JSON-RPC endpoint of the chain
    pub rpc_url: String,

    pub chain_id: u64,

    /// Deployed contract addresses
    pub contracts: Contracts,

    /// IPFS gateway used to read metadata documents
    pub ipfs_gateway_url: String,

    /// Pinning endpoint used to upload metadata documents
    pub ipfs_pin_url: String,

    pub ipfs_jwt: Option<String>,

    /// Key of the account funding faucet claims
    pub faucet_private_key: Option<String>,

    /// Key of the CLI session's wallet
    pub wallet_private_key: Option<String>,

    /// Base URL of the faucet service ETH claims go through
    pub faucet_api_url: String,

    /// Listen address of the faucet service
    pub server_addr: String,

    pub receipt_poll_interval: Duration,
    pub receipt_timeout: Duration,

    /// Interval in seconds for rescanning the market board
    pub market_scan_interval: u64,

    /// Continue to the target call once an approval is confirmed
    pub auto_advance_after_approve: bool,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let contracts = Contracts {
            market: required_address("MARKET_CONTRACT_ADDRESS")?,
            token: required_address("PAYMENT_TOKEN_ADDRESS")?,
            faucet: required_address("FAUCET_ADDRESS")?,
            multicall: match env::var("MULTICALL_ADDRESS") {
                Ok(value) => value
                    .parse()
                    .context("MULTICALL_ADDRESS must be a valid address")?,
                Err(_) => MULTICALL3_ADDRESS,
            },
            token_decimals: env::var("PAYMENT_TOKEN_DECIMALS")
                .unwrap_or_else(|_| TOKEN_DECIMALS.to_string())
                .parse()
                .context("PAYMENT_TOKEN_DECIMALS must be a valid number")?,
        };

        Ok(Config {
            rpc_url: env::var("RPC_URL").unwrap_or_else(|_| "https://sepolia.base.org".to_string()),

            chain_id: env::var("CHAIN_ID")
                .unwrap_or_else(|_| "84532".to_string())
                .parse()
                .context("CHAIN_ID must be a valid number")?,

            contracts,

            ipfs_gateway_url: env::var("IPFS_GATEWAY_URL")
                .unwrap_or_else(|_| "https://gateway.pinata.cloud".to_string()),

            ipfs_pin_url: env::var("IPFS_PIN_URL")
                .unwrap_or_else(|_| "https://api.pinata.cloud/pinning/pinJSONToIPFS".to_string()),

            ipfs_jwt: optional("IPFS_JWT"),
            faucet_private_key: optional("FAUCET_PRIVATE_KEY"),
            wallet_private_key: optional("WALLET_PRIVATE_KEY"),

            faucet_api_url: env::var("FAUCET_API_URL")
                .unwrap_or_else(|_| "http://127.0.0.1:3000".to_string()),

            server_addr: env::var("SERVER_ADDR").unwrap_or_else(|_| "127.0.0.1:3000".to_string()),

            receipt_poll_interval: Duration::from_millis(
                env::var("RECEIPT_POLL_INTERVAL_MS")
                    .unwrap_or_else(|_| "2000".to_string())
                    .parse()
                    .context("RECEIPT_POLL_INTERVAL_MS must be a valid number")?,
            ),

            receipt_timeout: Duration::from_secs(
                env::var("RECEIPT_TIMEOUT_SECS")
                    .unwrap_or_else(|_| "120".to_string())
                    .parse()
                    .context("RECEIPT_TIMEOUT_SECS must be a valid number")?,
            ),

            market_scan_interval: env::var("MARKET_SCAN_INTERVAL")
                .unwrap_or_else(|_| "60".to_string())
                .parse()
                .context("MARKET_SCAN_INTERVAL must be a valid number")?,

            auto_advance_after_approve: env::var("AUTO_ADVANCE_AFTER_APPROVE")
                .unwrap_or_else(|_| "true".to_string())
                .parse()
                .context("AUTO_ADVANCE_AFTER_APPROVE must be true or false")?,
        })
    }
}

fn required_address(name: &str) -> Result<Address> {
    env::var(name)
        .with_context(|| format!("{} must be set", name))?
        .parse()
        .with_context(|| format!("{} must be a valid address", name))
}

/// Unset and blank values are both treated as absent
fn optional(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}
