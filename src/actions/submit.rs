use std::sync::Arc;

use alloy::primitives::{Address, TxHash};
use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::Notice;
use crate::contracts::{ContractCall, Contracts};
use crate::error::{ActionError, ChainError};
use crate::invalidation::invalidation_keys;
use crate::reads::{ReadAccessor, TxReceipt};
use crate::receipts::{ReceiptWaiter, WaitError};
use crate::wallet::{Session, Wallet};

/// A submitted mutation whose receipt has not been observed yet
#[derive(Debug, Clone)]
pub struct PendingTransaction {
    pub hash: TxHash,
    pub call: ContractCall,
    pub owner: Address,
    pub submitted_at: DateTime<Utc>,
}

/// Submits contract calls, waits for their receipts and refreshes the
/// reads each confirmed call affects
#[derive(Clone)]
pub struct TxPipeline {
    reads: Arc<ReadAccessor>,
    waiter: ReceiptWaiter,
    contracts: Contracts,
    notices: mpsc::Sender<Notice>,
}

impl TxPipeline {
    pub fn new(
        reads: Arc<ReadAccessor>,
        waiter: ReceiptWaiter,
        contracts: Contracts,
        notices: mpsc::Sender<Notice>,
    ) -> Self {
        Self {
            reads,
            waiter,
            contracts,
            notices,
        }
    }

    pub fn reads(&self) -> &Arc<ReadAccessor> {
        &self.reads
    }

    pub fn contracts(&self) -> &Contracts {
        &self.contracts
    }

    pub fn waiter(&self) -> &ReceiptWaiter {
        &self.waiter
    }

    /// The session's wallet; prompts for a connection when there is none
    pub async fn require_wallet(&self, session: &Session) -> Result<Arc<dyn Wallet>, ActionError> {
        match session.require_wallet() {
            Err(ActionError::NotConnected) => {
                self.notify(Notice::ConnectWallet).await;
                Err(ActionError::NotConnected)
            }
            other => other,
        }
    }

    /// Hand `call` to the wallet. Returns as soon as a hash exists.
    pub async fn submit(
        &self,
        session: &Session,
        call: ContractCall,
    ) -> Result<PendingTransaction, ActionError> {
        let wallet = self.require_wallet(session).await?;
        let kind = call.kind();
        let tx = call.encode(&self.contracts);

        info!("Submitting {} to {}", kind.as_str(), tx.to);

        match wallet.send(tx).await {
            Ok(hash) => {
                info!("{} submitted: {}", kind.as_str(), hash);
                self.notify(Notice::Submitted { kind, hash }).await;
                Ok(PendingTransaction {
                    hash,
                    call,
                    owner: wallet.address(),
                    submitted_at: Utc::now(),
                })
            }
            Err(e) => {
                let message = match &e {
                    ChainError::Rejected(message) => message.clone(),
                    other => other.to_string(),
                };
                warn!("{} failed to submit: {}", kind.as_str(), message);
                self.notify(Notice::Failed { kind, message }).await;
                Err(ActionError::Submission(e))
            }
        }
    }

    /// Wait for `pending` to be mined, then refetch the reads it invalidated
    pub async fn confirm(
        &self,
        pending: &PendingTransaction,
        cancel: &CancellationToken,
    ) -> Result<TxReceipt, ActionError> {
        let kind = pending.call.kind();
        let hash = pending.hash;
        self.notify(Notice::Confirming { kind, hash }).await;

        match self.waiter.wait(hash, cancel).await {
            Ok(receipt) => {
                let keys = invalidation_keys(&pending.call, pending.owner, &self.contracts);
                debug!("{} confirmed, refreshing {} reads", kind.as_str(), keys.len());
                self.reads.refresh(&keys).await;
                self.notify(Notice::Succeeded { kind, hash }).await;
                Ok(receipt)
            }
            Err(WaitError::Cancelled(hash)) => {
                debug!("Stopped tracking {} ({})", kind.as_str(), hash);
                Err(WaitError::Cancelled(hash).into())
            }
            Err(e) => {
                self.notify(Notice::Failed {
                    kind,
                    message: e.to_string(),
                })
                .await;
                Err(e.into())
            }
        }
    }

    /// Submit and confirm in one go
    pub async fn execute(
        &self,
        session: &Session,
        call: ContractCall,
        cancel: &CancellationToken,
    ) -> Result<TxReceipt, ActionError> {
        let pending = self.submit(session, call).await?;
        self.confirm(&pending, cancel).await
    }

    pub(crate) async fn notify(&self, notice: Notice) {
        if self.notices.send(notice).await.is_err() {
            debug!("Notice receiver dropped");
        }
    }
}
