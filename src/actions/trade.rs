use std::sync::Arc;

use alloy::primitives::TxHash;
use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::{AdvancePolicy, AllowanceGate, TxPipeline};
use crate::api::MetadataStore;
use crate::contracts::ContractCall;
use crate::error::ActionError;
use crate::forms::{MarketDraft, TradeTicket};
use crate::models::Outcome;
use crate::reads::TxReceipt;
use crate::wallet::Session;

/// How a spend action ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    /// The target call was mined, after `approval` when one was needed
    Completed {
        approval: Option<TxHash>,
        receipt: TxReceipt,
    },
    /// Only the approval went through; invoke the action again to continue
    ApprovalConfirmed { approval: TxHash },
}

/// Spend actions against the market engine: buying shares and creating markets
pub struct MarketActions {
    pipeline: TxPipeline,
    metadata: Arc<dyn MetadataStore>,
    policy: AdvancePolicy,
}

impl MarketActions {
    pub fn new(
        pipeline: TxPipeline,
        metadata: Arc<dyn MetadataStore>,
        policy: AdvancePolicy,
    ) -> Self {
        Self {
            pipeline,
            metadata,
            policy,
        }
    }

    pub fn pipeline(&self) -> &TxPipeline {
        &self.pipeline
    }

    pub fn policy(&self) -> AdvancePolicy {
        self.policy
    }

    /// Buy YES or NO shares for the ticket's amount. The amount is cleared
    /// once the purchase has been submitted and kept on any failure.
    pub async fn buy(
        &self,
        session: &Session,
        ticket: &mut TradeTicket,
        cancel: &CancellationToken,
    ) -> Result<ActionOutcome, ActionError> {
        self.pipeline.require_wallet(session).await?;

        let contracts = *self.pipeline.contracts();
        let amount = ticket.validate(contracts.token_decimals)?;

        let approval = match self
            .pipeline
            .ensure_allowance(session, contracts.market, amount, self.policy, cancel)
            .await?
        {
            AllowanceGate::Ready { approval } => approval,
            AllowanceGate::AwaitingReinvoke { approval } => {
                return Ok(ActionOutcome::ApprovalConfirmed { approval })
            }
        };

        let market_id = ticket.market_id;
        let call = match ticket.outcome {
            Outcome::Yes => ContractCall::BuyYes { market_id, amount },
            Outcome::No => ContractCall::BuyNo { market_id, amount },
        };

        let pending = self.pipeline.submit(session, call).await?;
        ticket.amount.clear();

        let receipt = self.pipeline.confirm(&pending, cancel).await?;
        info!(
            "Bought {} on market {} in {}",
            ticket.outcome.as_str(),
            market_id,
            receipt.hash
        );

        Ok(ActionOutcome::Completed { approval, receipt })
    }

    /// Validate the draft against `now`, approve the liquidity, pin the
    /// metadata and create the market. The schedule is fixed against the
    /// clock at submission, so a start that lapsed during the approval is
    /// moved forward.
    pub async fn create_market(
        &self,
        session: &Session,
        draft: &MarketDraft,
        now: DateTime<Utc>,
        cancel: &CancellationToken,
    ) -> Result<ActionOutcome, ActionError> {
        self.pipeline.require_wallet(session).await?;

        let contracts = *self.pipeline.contracts();
        let market = draft.validate(now, contracts.token_decimals)?;

        let approval = match self
            .pipeline
            .ensure_allowance(
                session,
                contracts.market,
                market.liquidity,
                self.policy,
                cancel,
            )
            .await?
        {
            AllowanceGate::Ready { approval } => approval,
            AllowanceGate::AwaitingReinvoke { approval } => {
                return Ok(ActionOutcome::ApprovalConfirmed { approval })
            }
        };

        let cid = self
            .metadata
            .upload_json(&market.metadata())
            .await
            .map_err(|e| ActionError::Metadata(e.to_string()))?;

        let (start_time, end_time) = market.schedule(Utc::now());
        let call = ContractCall::CreateMarket {
            liquidity: market.liquidity,
            start_time,
            end_time,
            question: market.question.clone(),
            metadata_cid: cid,
        };

        let receipt = self.pipeline.execute(session, call, cancel).await?;
        info!("Market \"{}\" created in {}", market.question, receipt.hash);

        Ok(ActionOutcome::Completed { approval, receipt })
    }
}
