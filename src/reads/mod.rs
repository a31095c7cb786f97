pub mod accessor;

use alloy::primitives::{Address, TxHash, B256, U256};
use alloy::sol_types::SolCall;
use async_trait::async_trait;

use crate::contracts::{Contracts, IERC20, IFaucet, IMulticall3, IPredictionMarket};
use crate::error::ChainError;
use crate::models::MarketRecord;

pub use accessor::{ReadAccessor, ReadState, ReadStatus};

/// Access-control role checked on the market contract
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Admin,
    Moderator,
}

/// Descriptor of a single contract read. Doubles as its cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ReadRequest {
    MarketCount,
    Market(u64),
    PriceYes(u64),
    Allowance { owner: Address, spender: Address },
    TokenBalance(Address),
    NativeBalance(Address),
    RoleId(Role),
    HasRole { role: B256, account: Address },
    FaucetHasClaimedEth(Address),
    FaucetLastClaimedToken(Address),
    FaucetTokenCooldown,
}

/// Decoded result of a [`ReadRequest`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadValue {
    Count(u64),
    Market(MarketRecord),
    Price(U256),
    Amount(U256),
    Flag(bool),
    RoleId(B256),
    Timestamp(u64),
}

impl ReadValue {
    pub fn as_count(&self) -> Option<u64> {
        match self {
            ReadValue::Count(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_market(&self) -> Option<&MarketRecord> {
        match self {
            ReadValue::Market(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_price(&self) -> Option<U256> {
        match self {
            ReadValue::Price(p) => Some(*p),
            _ => None,
        }
    }

    pub fn as_amount(&self) -> Option<U256> {
        match self {
            ReadValue::Amount(a) => Some(*a),
            _ => None,
        }
    }

    pub fn as_flag(&self) -> Option<bool> {
        match self {
            ReadValue::Flag(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_role_id(&self) -> Option<B256> {
        match self {
            ReadValue::RoleId(r) => Some(*r),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<u64> {
        match self {
            ReadValue::Timestamp(t) => Some(*t),
            _ => None,
        }
    }
}

/// Receipt of a mined transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxReceipt {
    pub hash: TxHash,
    pub block_number: Option<u64>,
    pub success: bool,
}

/// Read side of the chain
#[async_trait]
pub trait ChainReader: Send + Sync {
    async fn read(&self, request: &ReadRequest) -> Result<ReadValue, ChainError>;

    /// Perform independent reads in one round trip. The outer error means
    /// the batch itself failed; each item otherwise succeeds or fails alone.
    async fn read_batch(
        &self,
        requests: &[ReadRequest],
    ) -> Result<Vec<Result<ReadValue, ChainError>>, ChainError>;

    /// Receipt for `hash`, `None` while the transaction is still pending
    async fn receipt(&self, hash: TxHash) -> Result<Option<TxReceipt>, ChainError>;
}

impl ReadRequest {
    pub fn name(&self) -> &'static str {
        match self {
            ReadRequest::MarketCount => "marketCount",
            ReadRequest::Market(_) => "markets",
            ReadRequest::PriceYes(_) => "priceYES",
            ReadRequest::Allowance { .. } => "allowance",
            ReadRequest::TokenBalance(_) => "balanceOf",
            ReadRequest::NativeBalance(_) => "getEthBalance",
            ReadRequest::RoleId(Role::Admin) => "DEFAULT_ADMIN_ROLE",
            ReadRequest::RoleId(Role::Moderator) => "MODERATOR_ROLE",
            ReadRequest::HasRole { .. } => "hasRole",
            ReadRequest::FaucetHasClaimedEth(_) => "hasClaimedEth",
            ReadRequest::FaucetLastClaimedToken(_) => "lastClaimedToken",
            ReadRequest::FaucetTokenCooldown => "TOKEN_COOLDOWN",
        }
    }

    /// Target contract and calldata for an `eth_call`
    pub fn encode(&self, contracts: &Contracts) -> (Address, Vec<u8>) {
        match self {
            ReadRequest::MarketCount => (
                contracts.market,
                IPredictionMarket::marketCountCall {}.abi_encode(),
            ),
            ReadRequest::Market(id) => (
                contracts.market,
                IPredictionMarket::marketsCall { id: U256::from(*id) }.abi_encode(),
            ),
            ReadRequest::PriceYes(id) => (
                contracts.market,
                IPredictionMarket::priceYESCall { id: U256::from(*id) }.abi_encode(),
            ),
            ReadRequest::Allowance { owner, spender } => (
                contracts.token,
                IERC20::allowanceCall {
                    owner: *owner,
                    spender: *spender,
                }
                .abi_encode(),
            ),
            ReadRequest::TokenBalance(owner) => (
                contracts.token,
                IERC20::balanceOfCall { owner: *owner }.abi_encode(),
            ),
            ReadRequest::NativeBalance(addr) => (
                contracts.multicall,
                IMulticall3::getEthBalanceCall { addr: *addr }.abi_encode(),
            ),
            ReadRequest::RoleId(Role::Admin) => (
                contracts.market,
                IPredictionMarket::DEFAULT_ADMIN_ROLECall {}.abi_encode(),
            ),
            ReadRequest::RoleId(Role::Moderator) => (
                contracts.market,
                IPredictionMarket::MODERATOR_ROLECall {}.abi_encode(),
            ),
            ReadRequest::HasRole { role, account } => (
                contracts.market,
                IPredictionMarket::hasRoleCall {
                    role: *role,
                    account: *account,
                }
                .abi_encode(),
            ),
            ReadRequest::FaucetHasClaimedEth(account) => (
                contracts.faucet,
                IFaucet::hasClaimedEthCall { account: *account }.abi_encode(),
            ),
            ReadRequest::FaucetLastClaimedToken(account) => (
                contracts.faucet,
                IFaucet::lastClaimedTokenCall { account: *account }.abi_encode(),
            ),
            ReadRequest::FaucetTokenCooldown => (
                contracts.faucet,
                IFaucet::TOKEN_COOLDOWNCall {}.abi_encode(),
            ),
        }
    }

    /// Decode raw return data into a typed value. This is the only place
    /// that knows the positional layout of the contract's return tuples.
    pub fn decode(&self, data: &[u8]) -> Result<ReadValue, ChainError> {
        let name = self.name();
        let err = |e: alloy::sol_types::Error| ChainError::Decode {
            call: name,
            message: e.to_string(),
        };

        let value = match self {
            ReadRequest::MarketCount => ReadValue::Count(saturating_u64(
                IPredictionMarket::marketCountCall::abi_decode_returns(data).map_err(err)?,
            )),
            ReadRequest::Market(_) => {
                let ret = IPredictionMarket::marketsCall::abi_decode_returns(data).map_err(err)?;
                ReadValue::Market(MarketRecord {
                    exists: ret.exists,
                    liquidity: ret.b,
                    q_yes: ret.qYes,
                    q_no: ret.qNo,
                    start_time: saturating_u64(ret.startTime),
                    end_time: saturating_u64(ret.endTime),
                    resolved: ret.resolved,
                    yes_won: ret.yesWon,
                    question: ret.question,
                    cid: ret.cId,
                })
            }
            ReadRequest::PriceYes(_) => ReadValue::Price(
                IPredictionMarket::priceYESCall::abi_decode_returns(data).map_err(err)?,
            ),
            ReadRequest::Allowance { .. } => {
                ReadValue::Amount(IERC20::allowanceCall::abi_decode_returns(data).map_err(err)?)
            }
            ReadRequest::TokenBalance(_) => {
                ReadValue::Amount(IERC20::balanceOfCall::abi_decode_returns(data).map_err(err)?)
            }
            ReadRequest::NativeBalance(_) => ReadValue::Amount(
                IMulticall3::getEthBalanceCall::abi_decode_returns(data).map_err(err)?,
            ),
            ReadRequest::RoleId(Role::Admin) => ReadValue::RoleId(
                IPredictionMarket::DEFAULT_ADMIN_ROLECall::abi_decode_returns(data)
                    .map_err(err)?,
            ),
            ReadRequest::RoleId(Role::Moderator) => ReadValue::RoleId(
                IPredictionMarket::MODERATOR_ROLECall::abi_decode_returns(data).map_err(err)?,
            ),
            ReadRequest::HasRole { .. } => ReadValue::Flag(
                IPredictionMarket::hasRoleCall::abi_decode_returns(data).map_err(err)?,
            ),
            ReadRequest::FaucetHasClaimedEth(_) => {
                ReadValue::Flag(IFaucet::hasClaimedEthCall::abi_decode_returns(data).map_err(err)?)
            }
            ReadRequest::FaucetLastClaimedToken(_) => ReadValue::Timestamp(saturating_u64(
                IFaucet::lastClaimedTokenCall::abi_decode_returns(data).map_err(err)?,
            )),
            ReadRequest::FaucetTokenCooldown => ReadValue::Timestamp(saturating_u64(
                IFaucet::TOKEN_COOLDOWNCall::abi_decode_returns(data).map_err(err)?,
            )),
        };

        Ok(value)
    }
}

fn saturating_u64(value: U256) -> u64 {
    u64::try_from(value).unwrap_or(u64::MAX)
}
