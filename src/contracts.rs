use alloy::primitives::{address, Address, Bytes, U256};
use alloy::sol;
use alloy::sol_types::SolCall;

use crate::invalidation::MutationKind;
use crate::wallet::TxRequest;

/// Multicall3 is deployed at the same address on every supported chain
pub const MULTICALL3_ADDRESS: Address = address!("0xcA11bde05977b3631167028862bE2a173976CA11");

sol! {
    /// LMSR market engine
    interface IPredictionMarket {
        function marketCount() external view returns (uint256 count);
        function markets(uint256 id) external view returns (
            bool exists,
            uint256 b,
            uint256 qYes,
            uint256 qNo,
            uint256 startTime,
            uint256 endTime,
            bool resolved,
            bool yesWon,
            string question,
            string cId
        );
        function priceYES(uint256 id) external view returns (uint256 price);
        function createMarket(uint256 b, uint256 startTime, uint256 endTime, string question, string cId) external returns (uint256 id);
        function buyYES(uint256 id, uint256 amount) external;
        function buyNO(uint256 id, uint256 amount) external;
        function hasRole(bytes32 role, address account) external view returns (bool granted);
        function DEFAULT_ADMIN_ROLE() external view returns (bytes32 role);
        function MODERATOR_ROLE() external view returns (bytes32 role);
    }

    /// Payment token (ERC-20 subset)
    interface IERC20 {
        function allowance(address owner, address spender) external view returns (uint256 remaining);
        function approve(address spender, uint256 amount) external returns (bool ok);
        function transfer(address to, uint256 amount) external returns (bool ok);
        function balanceOf(address owner) external view returns (uint256 balance);
    }

    interface IFaucet {
        function claimEth(address recipient) external;
        function claimTokens() external;
        function hasClaimedEth(address account) external view returns (bool claimed);
        function lastClaimedToken(address account) external view returns (uint256 timestamp);
        function TOKEN_COOLDOWN() external view returns (uint256 cooldown);
    }

    interface IMulticall3 {
        struct Call3 {
            address target;
            bool allowFailure;
            bytes callData;
        }

        struct Call3Result {
            bool success;
            bytes returnData;
        }

        function aggregate3(Call3[] calldata calls) external payable returns (Call3Result[] memory returnData);
        function getEthBalance(address addr) external view returns (uint256 balance);
    }
}

/// Deployed contract addresses the client talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Contracts {
    /// LMSR market engine (also the spender for the payment token)
    pub market: Address,

    /// Payment token (USDC-like)
    pub token: Address,

    /// Faucet handing out native and payment tokens
    pub faucet: Address,

    /// Multicall3 used for batched reads
    pub multicall: Address,

    /// Decimal places of the payment token
    pub token_decimals: u8,
}

/// A state-changing call the wallet can submit
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContractCall {
    Approve {
        spender: Address,
        amount: U256,
    },
    BuyYes {
        market_id: u64,
        amount: U256,
    },
    BuyNo {
        market_id: u64,
        amount: U256,
    },
    CreateMarket {
        liquidity: U256,
        start_time: u64,
        end_time: u64,
        question: String,
        metadata_cid: String,
    },
    TransferToken {
        to: Address,
        amount: U256,
    },
    TransferNative {
        to: Address,
        amount: U256,
    },
    ClaimTokens,
    FaucetClaimEth {
        recipient: Address,
    },
}

impl ContractCall {
    pub fn kind(&self) -> MutationKind {
        match self {
            ContractCall::Approve { .. } => MutationKind::Approve,
            ContractCall::BuyYes { .. } => MutationKind::BuyYes,
            ContractCall::BuyNo { .. } => MutationKind::BuyNo,
            ContractCall::CreateMarket { .. } => MutationKind::CreateMarket,
            ContractCall::TransferToken { .. } => MutationKind::TransferToken,
            ContractCall::TransferNative { .. } => MutationKind::TransferNative,
            ContractCall::ClaimTokens => MutationKind::ClaimTokens,
            ContractCall::FaucetClaimEth { .. } => MutationKind::FaucetClaimEth,
        }
    }

    /// Encode into a transaction request against the configured contracts
    pub fn encode(&self, contracts: &Contracts) -> TxRequest {
        match self {
            ContractCall::Approve { spender, amount } => TxRequest::call(
                contracts.token,
                IERC20::approveCall {
                    spender: *spender,
                    amount: *amount,
                }
                .abi_encode(),
            ),
            ContractCall::BuyYes { market_id, amount } => TxRequest::call(
                contracts.market,
                IPredictionMarket::buyYESCall {
                    id: U256::from(*market_id),
                    amount: *amount,
                }
                .abi_encode(),
            ),
            ContractCall::BuyNo { market_id, amount } => TxRequest::call(
                contracts.market,
                IPredictionMarket::buyNOCall {
                    id: U256::from(*market_id),
                    amount: *amount,
                }
                .abi_encode(),
            ),
            ContractCall::CreateMarket {
                liquidity,
                start_time,
                end_time,
                question,
                metadata_cid,
            } => TxRequest::call(
                contracts.market,
                IPredictionMarket::createMarketCall {
                    b: *liquidity,
                    startTime: U256::from(*start_time),
                    endTime: U256::from(*end_time),
                    question: question.clone(),
                    cId: metadata_cid.clone(),
                }
                .abi_encode(),
            ),
            ContractCall::TransferToken { to, amount } => TxRequest::call(
                contracts.token,
                IERC20::transferCall {
                    to: *to,
                    amount: *amount,
                }
                .abi_encode(),
            ),
            ContractCall::TransferNative { to, amount } => TxRequest {
                to: *to,
                data: Bytes::new(),
                value: *amount,
            },
            ContractCall::ClaimTokens => {
                TxRequest::call(contracts.faucet, IFaucet::claimTokensCall {}.abi_encode())
            }
            ContractCall::FaucetClaimEth { recipient } => TxRequest::call(
                contracts.faucet,
                IFaucet::claimEthCall {
                    recipient: *recipient,
                }
                .abi_encode(),
            ),
        }
    }
}
