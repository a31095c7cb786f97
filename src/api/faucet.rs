use alloy::primitives::{Address, TxHash};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, info, warn};

/// Hands out native currency to new users
#[async_trait]
pub trait EthFaucet: Send + Sync {
    /// Fund `address`, returning the funding transaction's hash
    async fn claim_eth(&self, address: Address) -> Result<TxHash>;
}

/// Client for the faucet service's claim endpoint
pub struct FaucetApiClient {
    client: Client,
    base_url: String,
}

/// Body returned by `POST /api/faucet/claim-eth`
#[derive(Debug, Deserialize)]
struct ClaimResponse {
    #[serde(default)]
    hash: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl FaucetApiClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl EthFaucet for FaucetApiClient {
    async fn claim_eth(&self, address: Address) -> Result<TxHash> {
        let url = format!("{}/api/faucet/claim-eth", self.base_url);
        debug!("Claiming ETH via {}", url);

        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({ "address": address.to_string() }))
            .send()
            .await
            .context("Failed to reach faucet service")?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let hash = parse_claim_response(status, &body)?;

        info!("Faucet funded {} in {}", address, hash);
        Ok(hash)
    }
}

/// Hash of a successful claim, or the error the service reported
fn parse_claim_response(status: StatusCode, body: &str) -> Result<TxHash> {
    let parsed: Option<ClaimResponse> = serde_json::from_str(body).ok();

    if !status.is_success() {
        let message = parsed
            .and_then(|r| r.error)
            .unwrap_or_else(|| "Failed to claim ETH".to_string());
        warn!("Faucet returned {}: {}", status, message);
        anyhow::bail!(message);
    }

    let response = parsed.context("Failed to parse faucet response")?;
    response
        .hash
        .context("Faucet response has no transaction hash")?
        .parse()
        .context("Faucet returned a malformed transaction hash")
}

#[cfg(test)]
mod tests {
    use alloy::primitives::B256;

    use super::*;

    #[test]
    fn test_successful_claim() {
        let hash = B256::with_last_byte(7);
        let body = format!(r#"{{"success": true, "hash": "{}"}}"#, hash);

        assert_eq!(parse_claim_response(StatusCode::OK, &body).unwrap(), hash);
    }

    #[test]
    fn test_error_status_surfaces_service_message() {
        let err = parse_claim_response(
            StatusCode::BAD_REQUEST,
            r#"{"error": "Wallet address is required"}"#,
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "Wallet address is required");

        let err = parse_claim_response(StatusCode::BAD_GATEWAY, "<html>upstream</html>")
            .unwrap_err();
        assert_eq!(err.to_string(), "Failed to claim ETH");
    }

    #[test]
    fn test_missing_or_malformed_hash() {
        let err = parse_claim_response(StatusCode::OK, r#"{"success": true}"#).unwrap_err();
        assert_eq!(err.to_string(), "Faucet response has no transaction hash");

        let err = parse_claim_response(StatusCode::OK, r#"{"hash": "0x1234"}"#).unwrap_err();
        assert_eq!(err.to_string(), "Faucet returned a malformed transaction hash");

        assert!(parse_claim_response(StatusCode::OK, "not json").is_err());
    }
}
