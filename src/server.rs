use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info, warn};

use crate::contracts::{ContractCall, Contracts};
use crate::forms::parse_address;
use crate::wallet::Wallet;

/// Shared state of the faucet service
#[derive(Clone)]
pub struct FaucetState {
    /// Funding account; `None` when no key is configured
    pub signer: Option<Arc<dyn Wallet>>,
    pub contracts: Contracts,
}

#[derive(Debug, Deserialize)]
pub struct ClaimEthRequest {
    #[serde(default)]
    pub address: Option<String>,
}

pub fn router(state: FaucetState) -> Router {
    Router::new()
        .route("/api/faucet/claim-eth", post(claim_eth))
        .route("/health", get(health))
        .with_state(state)
}

pub async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "Ok" }))
}

/// Fund a new user's address through the faucet contract's `claimEth`
pub async fn claim_eth(
    State(state): State<FaucetState>,
    body: Result<Json<ClaimEthRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match body {
        Ok(body) => body,
        Err(rejection) => {
            warn!("Rejected faucet request: {}", rejection.body_text());
            return error_response(StatusCode::BAD_REQUEST, "Invalid request body");
        }
    };

    let address = request.address.unwrap_or_default();
    if address.trim().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "Wallet address is required");
    }

    let Some(signer) = state.signer.as_ref() else {
        error!("FAUCET_PRIVATE_KEY is not configured");
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Faucet configuration error");
    };

    let Some(recipient) = parse_address(&address) else {
        return error_response(StatusCode::BAD_REQUEST, "Invalid wallet address");
    };

    let tx = ContractCall::FaucetClaimEth { recipient }.encode(&state.contracts);
    match signer.send(tx).await {
        Ok(hash) => {
            info!("Faucet sent ETH to {} in {}", recipient, hash);
            (
                StatusCode::OK,
                Json(json!({ "success": true, "hash": hash.to_string() })),
            )
                .into_response()
        }
        Err(e) => {
            error!("Error sending ETH to {}: {}", recipient, e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to send ETH")
        }
    }
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

#[cfg(test)]
mod tests {
    use alloy::primitives::{Address, B256};
    use alloy::sol_types::SolCall;
    use axum::body::to_bytes;
    use serde_json::Value;

    use super::*;
    use crate::contracts::{IFaucet, MULTICALL3_ADDRESS};
    use crate::testing::{FakeChain, FakeWallet};

    fn contracts() -> Contracts {
        Contracts {
            market: Address::repeat_byte(0xaa),
            token: Address::repeat_byte(0xbb),
            faucet: Address::repeat_byte(0xcc),
            multicall: MULTICALL3_ADDRESS,
            token_decimals: 6,
        }
    }

    fn state_with(signer: Option<Arc<FakeWallet>>) -> FaucetState {
        FaucetState {
            signer: signer.map(|w| w as Arc<dyn Wallet>),
            contracts: contracts(),
        }
    }

    fn signer() -> Arc<FakeWallet> {
        Arc::new(FakeWallet::new(
            Address::repeat_byte(0xfe),
            Arc::new(FakeChain::new()),
        ))
    }

    async fn call(state: FaucetState, body: &str) -> (StatusCode, Value) {
        let body = match serde_json::from_str::<ClaimEthRequest>(body) {
            Ok(request) => Ok(Json(request)),
            Err(_) => Err(invalid_json().await),
        };
        let response = claim_eth(State(state), body).await;
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    /// A real rejection produced by the extractor for a malformed body
    async fn invalid_json() -> JsonRejection {
        use axum::extract::FromRequest;
        let request = axum::http::Request::builder()
            .method("POST")
            .header("content-type", "application/json")
            .body(axum::body::Body::from("{not json"))
            .unwrap();
        match Json::<ClaimEthRequest>::from_request(request, &()).await {
            Err(rejection) => rejection,
            Ok(_) => panic!("malformed body was accepted"),
        }
    }

    #[tokio::test]
    async fn test_claim_sends_from_faucet_signer() {
        let wallet = signer();
        let recipient = Address::repeat_byte(0x42);
        let body = format!(r#"{{"address": "{:?}"}}"#, recipient);

        let (status, json) = call(state_with(Some(wallet.clone())), &body).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], true);
        assert_eq!(json["hash"], B256::with_last_byte(1).to_string());

        let sent = wallet.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, contracts().faucet);
        let claim = IFaucet::claimEthCall::abi_decode(&sent[0].data).unwrap();
        assert_eq!(claim.recipient, recipient);
    }

    #[tokio::test]
    async fn test_missing_address() {
        let wallet = signer();
        let (status, json) = call(state_with(Some(wallet.clone())), "{}").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "Wallet address is required");
        assert!(wallet.sent().is_empty());

        let (status, _) = call(state_with(Some(wallet)), r#"{"address": ""}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_malformed_address() {
        let wallet = signer();
        let (status, json) =
            call(state_with(Some(wallet.clone())), r#"{"address": "0xnothex"}"#).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "Invalid wallet address");
        assert!(wallet.sent().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_body() {
        let (status, json) = call(state_with(Some(signer())), "{not json").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "Invalid request body");
    }

    #[tokio::test]
    async fn test_unconfigured_signer() {
        let body = format!(r#"{{"address": "{:?}"}}"#, Address::repeat_byte(0x42));
        let (status, json) = call(state_with(None), &body).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["error"], "Faucet configuration error");

        // Any supplied address hits the configuration error first
        let (status, json) = call(state_with(None), r#"{"address": "0xnothex"}"#).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["error"], "Faucet configuration error");
    }

    #[tokio::test]
    async fn test_send_failure_hides_detail() {
        let wallet = signer();
        wallet.reject_with("insufficient funds for gas * price + value");
        let body = format!(r#"{{"address": "{:?}"}}"#, Address::repeat_byte(0x42));

        let (status, json) = call(state_with(Some(wallet)), &body).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["error"], "Failed to send ETH");
    }

    #[tokio::test]
    async fn test_health() {
        let Json(body) = health().await;
        assert_eq!(body["status"], "Ok");
    }
}
