use alloy::primitives::{Address, TxHash, U256};
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::TxPipeline;
use crate::contracts::ContractCall;
use crate::error::{ActionError, ChainError};
use crate::reads::{ReadRequest, ReadValue};
use crate::wallet::Session;

/// What happens once an approval has been confirmed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AdvancePolicy {
    /// Stop after the approval; the caller invokes the action again
    Manual,
    /// Re-read the allowance and go straight on to the target call when it
    /// now covers the amount
    #[default]
    AutoAdvance,
}

impl AdvancePolicy {
    pub fn from_flag(auto_advance: bool) -> Self {
        if auto_advance {
            AdvancePolicy::AutoAdvance
        } else {
            AdvancePolicy::Manual
        }
    }
}

/// Where the allowance stands for a pending spend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllowanceGate {
    /// The target call may be submitted. `approval` is set when one had to
    /// be confirmed first.
    Ready { approval: Option<TxHash> },
    /// An approval was confirmed but the target call was not submitted
    AwaitingReinvoke { approval: TxHash },
}

impl TxPipeline {
    /// Make sure `spender` may move `amount` of the payment token on behalf
    /// of the session's wallet, approving exactly `amount` when it may not.
    pub async fn ensure_allowance(
        &self,
        session: &Session,
        spender: Address,
        amount: U256,
        policy: AdvancePolicy,
        cancel: &CancellationToken,
    ) -> Result<AllowanceGate, ActionError> {
        let wallet = self.require_wallet(session).await?;
        let key = ReadRequest::Allowance {
            owner: wallet.address(),
            spender,
        };

        let current = self.current_allowance(&key).await?;
        if current >= amount {
            return Ok(AllowanceGate::Ready { approval: None });
        }

        info!(
            "Allowance {} is below {}, requesting approval for {}",
            current, amount, spender
        );
        let pending = self
            .submit(session, ContractCall::Approve { spender, amount })
            .await?;
        self.confirm(&pending, cancel).await?;

        if policy == AdvancePolicy::Manual {
            return Ok(AllowanceGate::AwaitingReinvoke {
                approval: pending.hash,
            });
        }

        let approved = self.current_allowance(&key).await?;
        if approved >= amount {
            Ok(AllowanceGate::Ready {
                approval: Some(pending.hash),
            })
        } else {
            info!("Allowance still {} after approval, waiting for re-invoke", approved);
            Ok(AllowanceGate::AwaitingReinvoke {
                approval: pending.hash,
            })
        }
    }

    /// Always goes to the network; a cached allowance may predate an approval
    async fn current_allowance(&self, key: &ReadRequest) -> Result<U256, ActionError> {
        let state = self.reads().refetch(key).await;
        match state.value.as_ref().and_then(ReadValue::as_amount) {
            Some(amount) => Ok(amount),
            None => Err(ActionError::Read {
                what: "allowance",
                source: ChainError::Rpc(
                    state
                        .error
                        .unwrap_or_else(|| "no value returned".to_string()),
                ),
            }),
        }
    }
}
