use alloy::primitives::Address;

use crate::contracts::{ContractCall, Contracts};
use crate::reads::ReadRequest;

/// Kind of confirmed mutation, used to pick the reads it invalidates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutationKind {
    Approve,
    BuyYes,
    BuyNo,
    CreateMarket,
    TransferToken,
    TransferNative,
    ClaimTokens,
    FaucetClaimEth,
}

impl MutationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MutationKind::Approve => "approve",
            MutationKind::BuyYes => "buy_yes",
            MutationKind::BuyNo => "buy_no",
            MutationKind::CreateMarket => "create_market",
            MutationKind::TransferToken => "transfer_token",
            MutationKind::TransferNative => "transfer_native",
            MutationKind::ClaimTokens => "claim_tokens",
            MutationKind::FaucetClaimEth => "claim_eth",
        }
    }
}

/// Reads whose values a confirmed `call` by `owner` may have changed
pub fn invalidation_keys(
    call: &ContractCall,
    owner: Address,
    contracts: &Contracts,
) -> Vec<ReadRequest> {
    let allowance = ReadRequest::Allowance {
        owner,
        spender: contracts.market,
    };

    match call {
        ContractCall::Approve { spender, .. } => vec![ReadRequest::Allowance {
            owner,
            spender: *spender,
        }],
        ContractCall::BuyYes { market_id, .. } | ContractCall::BuyNo { market_id, .. } => vec![
            ReadRequest::TokenBalance(owner),
            allowance,
            ReadRequest::Market(*market_id),
            ReadRequest::PriceYes(*market_id),
        ],
        ContractCall::CreateMarket { .. } => vec![
            ReadRequest::MarketCount,
            allowance,
            ReadRequest::TokenBalance(owner),
        ],
        ContractCall::TransferToken { .. } => vec![ReadRequest::TokenBalance(owner)],
        ContractCall::TransferNative { .. } => vec![ReadRequest::NativeBalance(owner)],
        ContractCall::ClaimTokens => vec![
            ReadRequest::TokenBalance(owner),
            ReadRequest::FaucetLastClaimedToken(owner),
        ],
        ContractCall::FaucetClaimEth { recipient } => vec![
            ReadRequest::NativeBalance(*recipient),
            ReadRequest::FaucetHasClaimedEth(*recipient),
        ],
    }
}
