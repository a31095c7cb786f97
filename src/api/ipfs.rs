use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::models::MarketMetadata;

/// Content-addressed store holding market metadata documents
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Store a metadata document, returning its content identifier
    async fn upload_json(&self, metadata: &MarketMetadata) -> Result<String>;

    async fn fetch(&self, cid: &str) -> Result<MarketMetadata>;

    /// Displayable URL for a cId, `ipfs://` reference or plain URL
    fn resolve_url(&self, reference: &str) -> String;
}

/// IPFS gateway for reads plus a pinning service for uploads
pub struct IpfsGateway {
    client: Client,
    gateway_url: String,
    pin_url: String,
    jwt: Option<String>,
}

/// Pinning service response
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PinResponse {
    ipfs_hash: String,
}

impl IpfsGateway {
    pub fn new(gateway_url: &str, pin_url: &str, jwt: Option<String>) -> Self {
        Self {
            client: Client::new(),
            gateway_url: gateway_url.trim_end_matches('/').to_string(),
            pin_url: pin_url.to_string(),
            jwt,
        }
    }
}

#[async_trait]
impl MetadataStore for IpfsGateway {
    async fn upload_json(&self, metadata: &MarketMetadata) -> Result<String> {
        let jwt = self
            .jwt
            .as_ref()
            .context("IPFS_JWT is not configured")?;

        let response = self
            .client
            .post(&self.pin_url)
            .header("Authorization", format!("Bearer {}", jwt))
            .json(&serde_json::json!({ "pinataContent": metadata }))
            .send()
            .await
            .context("Failed to upload metadata")?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!("Pinning API error: {} - {}", status, text);
        }

        let pinned: PinResponse = response
            .json()
            .await
            .context("Failed to parse pinning response")?;

        info!("Metadata pinned as {}", pinned.ipfs_hash);
        Ok(pinned.ipfs_hash)
    }

    async fn fetch(&self, cid: &str) -> Result<MarketMetadata> {
        let url = self.resolve_url(cid);
        debug!("Fetching metadata from: {}", url);

        let response = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await
            .context("Failed to fetch metadata")?;

        if !response.status().is_success() {
            let status = response.status();
            warn!("Gateway returned {} for {}", status, cid);
            anyhow::bail!("Gateway error: {}", status);
        }

        response
            .json()
            .await
            .context("Failed to parse metadata document")
    }

    fn resolve_url(&self, reference: &str) -> String {
        resolve_gateway_url(&self.gateway_url, reference)
    }
}

/// Map `ipfs://cid`, `/ipfs/cid` or a bare cid onto `gateway`; URLs pass through
pub fn resolve_gateway_url(gateway: &str, reference: &str) -> String {
    let reference = reference.trim();
    if reference.starts_with("http://") || reference.starts_with("https://") {
        return reference.to_string();
    }

    let cid = reference
        .strip_prefix("ipfs://")
        .or_else(|| reference.strip_prefix("/ipfs/"))
        .unwrap_or(reference);

    format!("{}/ipfs/{}", gateway.trim_end_matches('/'), cid)
}
