use std::sync::Arc;

use alloy::primitives::Address;
use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::Session;
use crate::actions::{Notice, PendingTransaction, TxPipeline};
use crate::api::EthFaucet;
use crate::contracts::ContractCall;
use crate::error::ActionError;
use crate::forms::{Asset, TransferDraft};
use crate::models::{FaucetStatus, Rights, WalletBalances};
use crate::reads::{ReadRequest, ReadValue, Role, TxReceipt};

/// Account-level operations for the connected wallet: balances, rights,
/// transfers and faucet claims
pub struct WalletService {
    pipeline: TxPipeline,
    faucet: Arc<dyn EthFaucet>,
}

impl WalletService {
    pub fn new(pipeline: TxPipeline, faucet: Arc<dyn EthFaucet>) -> Self {
        Self { pipeline, faucet }
    }

    /// Native and payment-token balances, read in one batch
    pub async fn balances(&self, owner: Address) -> WalletBalances {
        let requests = [
            ReadRequest::NativeBalance(owner),
            ReadRequest::TokenBalance(owner),
        ];
        let states = self.pipeline.reads().query_batch(&requests, true).await;

        WalletBalances {
            native: states[0].value.as_ref().and_then(ReadValue::as_amount),
            token: states[1].value.as_ref().and_then(ReadValue::as_amount),
            token_decimals: self.pipeline.contracts().token_decimals,
        }
    }

    /// Admin and moderator membership. Unreadable roles count as not held.
    pub async fn rights(&self, account: Address) -> Rights {
        let role_ids = [
            ReadRequest::RoleId(Role::Admin),
            ReadRequest::RoleId(Role::Moderator),
        ];
        let ids = self.pipeline.reads().query_batch(&role_ids, true).await;

        let checks: Vec<ReadRequest> = ids
            .iter()
            .filter_map(|state| state.value.as_ref().and_then(ReadValue::as_role_id))
            .map(|role| ReadRequest::HasRole { role, account })
            .collect();
        if checks.len() != role_ids.len() {
            warn!("Role ids unavailable, treating {} as unprivileged", account);
            return Rights::default();
        }

        let held = self.pipeline.reads().query_batch(&checks, true).await;
        let flag = |i: usize| {
            held[i]
                .value
                .as_ref()
                .and_then(ReadValue::as_flag)
                .unwrap_or(false)
        };

        Rights {
            is_admin: flag(0),
            is_moderator: flag(1),
        }
    }

    pub async fn faucet_status(&self, account: Address) -> FaucetStatus {
        let requests = [
            ReadRequest::FaucetHasClaimedEth(account),
            ReadRequest::FaucetLastClaimedToken(account),
            ReadRequest::FaucetTokenCooldown,
        ];
        let states = self.pipeline.reads().query_batch(&requests, true).await;

        FaucetStatus {
            has_claimed_eth: states[0]
                .value
                .as_ref()
                .and_then(ReadValue::as_flag)
                .unwrap_or(false),
            last_claimed_token: states[1]
                .value
                .as_ref()
                .and_then(ReadValue::as_timestamp)
                .unwrap_or(0),
            token_cooldown: states[2]
                .value
                .as_ref()
                .and_then(ReadValue::as_timestamp)
                .unwrap_or(0),
        }
    }

    /// Send ETH or payment tokens to another address
    pub async fn transfer(
        &self,
        session: &Session,
        draft: &TransferDraft,
        cancel: &CancellationToken,
    ) -> Result<TxReceipt, ActionError> {
        self.pipeline.require_wallet(session).await?;

        let transfer = draft.validate(self.pipeline.contracts().token_decimals)?;
        let call = match transfer.asset {
            Asset::Eth => ContractCall::TransferNative {
                to: transfer.recipient,
                amount: transfer.amount,
            },
            Asset::Usdc => ContractCall::TransferToken {
                to: transfer.recipient,
                amount: transfer.amount,
            },
        };

        let receipt = self.pipeline.execute(session, call, cancel).await?;
        info!(
            "Sent {} {} to {}",
            transfer.amount,
            transfer.asset.as_str(),
            transfer.recipient
        );
        Ok(receipt)
    }

    /// Claim payment tokens from the faucet contract
    pub async fn claim_tokens(
        &self,
        session: &Session,
        cancel: &CancellationToken,
    ) -> Result<TxReceipt, ActionError> {
        let wallet = self.pipeline.require_wallet(session).await?;

        let status = self.faucet_status(wallet.address()).await;
        let now = u64::try_from(Utc::now().timestamp()).unwrap_or(0);
        if !status.can_claim_tokens(now) {
            return Err(ActionError::Faucet(
                "Tokens were claimed recently, try again later".to_string(),
            ));
        }

        self.pipeline
            .execute(session, ContractCall::ClaimTokens, cancel)
            .await
    }

    /// Ask the faucet service for native currency, then wait for its
    /// funding transaction like any other mutation
    pub async fn claim_eth(
        &self,
        session: &Session,
        cancel: &CancellationToken,
    ) -> Result<TxReceipt, ActionError> {
        let wallet = self.pipeline.require_wallet(session).await?;
        let recipient = wallet.address();

        let status = self.faucet_status(recipient).await;
        if !status.can_claim_eth() {
            return Err(ActionError::Faucet("ETH already claimed".to_string()));
        }

        let call = ContractCall::FaucetClaimEth { recipient };
        let kind = call.kind();
        let hash = match self.faucet.claim_eth(recipient).await {
            Ok(hash) => hash,
            Err(e) => {
                let message = e.to_string();
                self.pipeline
                    .notify(Notice::Failed {
                        kind,
                        message: message.clone(),
                    })
                    .await;
                return Err(ActionError::Faucet(message));
            }
        };
        self.pipeline.notify(Notice::Submitted { kind, hash }).await;

        let pending = PendingTransaction {
            hash,
            call,
            owner: recipient,
            submitted_at: Utc::now(),
        };
        self.pipeline.confirm(&pending, cancel).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use alloy::primitives::{TxHash, B256, U256};
    use alloy::sol_types::SolCall;
    use async_trait::async_trait;

    use super::*;
    use crate::actions::submit::tests::{contracts, owner, pipeline};
    use crate::contracts::IERC20;
    use crate::testing::{FakeChain, FakeWallet};

    /// Faucet service stand-in that "mines" its funding tx on the fake chain
    struct FakeFaucet {
        chain: Arc<FakeChain>,
        fail: bool,
        claims: Mutex<Vec<Address>>,
    }

    #[async_trait]
    impl EthFaucet for FakeFaucet {
        async fn claim_eth(&self, address: Address) -> anyhow::Result<TxHash> {
            if self.fail {
                anyhow::bail!("Failed to send ETH");
            }
            self.claims.lock().unwrap().push(address);
            let hash = B256::repeat_byte(0xfa);
            self.chain.add_receipt(hash, true);
            Ok(hash)
        }
    }

    fn service(chain: Arc<FakeChain>, fail: bool) -> (WalletService, Arc<FakeFaucet>) {
        let faucet = Arc::new(FakeFaucet {
            chain: chain.clone(),
            fail,
            claims: Mutex::new(Vec::new()),
        });
        let (pipeline, _rx) = pipeline(chain);
        (WalletService::new(pipeline, faucet.clone()), faucet)
    }

    #[tokio::test]
    async fn test_balances_are_formatted() {
        let chain = Arc::new(FakeChain::new());
        chain.set(
            ReadRequest::NativeBalance(owner()),
            ReadValue::Amount(U256::from(1_500_000_000_000_000_000u64)),
        );
        chain.set(
            ReadRequest::TokenBalance(owner()),
            ReadValue::Amount(U256::from(10_500_000u64)),
        );
        let (service, _) = service(chain.clone(), false);

        let balances = service.balances(owner()).await;
        assert_eq!(balances.native_display(), "1.50");
        assert_eq!(balances.token_display(), "10.50");
        assert_eq!(chain.batch_count(), 1);
    }

    #[tokio::test]
    async fn test_moderator_has_creation_rights() {
        let chain = Arc::new(FakeChain::new());
        let admin = B256::ZERO;
        let moderator = B256::repeat_byte(0x4d);
        chain.set(ReadRequest::RoleId(Role::Admin), ReadValue::RoleId(admin));
        chain.set(ReadRequest::RoleId(Role::Moderator), ReadValue::RoleId(moderator));
        chain.set(
            ReadRequest::HasRole {
                role: admin,
                account: owner(),
            },
            ReadValue::Flag(false),
        );
        chain.set(
            ReadRequest::HasRole {
                role: moderator,
                account: owner(),
            },
            ReadValue::Flag(true),
        );
        let (service, _) = service(chain, false);

        let rights = service.rights(owner()).await;
        assert!(!rights.is_admin);
        assert!(rights.is_moderator);
        assert!(rights.has_creation_rights());
    }

    #[tokio::test]
    async fn test_unreadable_roles_grant_nothing() {
        let chain = Arc::new(FakeChain::new());
        let (service, _) = service(chain, false);
        assert_eq!(service.rights(owner()).await, Rights::default());
    }

    #[tokio::test]
    async fn test_token_transfer() {
        let chain = Arc::new(FakeChain::new());
        let wallet = Arc::new(FakeWallet::new(owner(), chain.clone()));
        let (service, _) = service(chain, false);
        let session = Session::connected(wallet.clone());

        let draft = TransferDraft {
            recipient: format!("{:?}", Address::repeat_byte(0x22)),
            amount: "2.25".to_string(),
            asset: Asset::Usdc,
        };
        service
            .transfer(&session, &draft, &CancellationToken::new())
            .await
            .unwrap();

        let sent = wallet.sent();
        assert_eq!(sent[0].to, contracts().token);
        let call = IERC20::transferCall::abi_decode(&sent[0].data).unwrap();
        assert_eq!(call.to, Address::repeat_byte(0x22));
        assert_eq!(call.amount, U256::from(2_250_000u64));
    }

    #[tokio::test]
    async fn test_native_transfer_carries_value() {
        let chain = Arc::new(FakeChain::new());
        let wallet = Arc::new(FakeWallet::new(owner(), chain.clone()));
        let (service, _) = service(chain, false);
        let session = Session::connected(wallet.clone());

        let draft = TransferDraft {
            recipient: format!("{:?}", Address::repeat_byte(0x22)),
            amount: "0.5".to_string(),
            asset: Asset::Eth,
        };
        service
            .transfer(&session, &draft, &CancellationToken::new())
            .await
            .unwrap();

        let sent = wallet.sent();
        assert_eq!(sent[0].to, Address::repeat_byte(0x22));
        assert!(sent[0].data.is_empty());
        assert_eq!(sent[0].value, U256::from(500_000_000_000_000_000u64));
    }

    #[tokio::test]
    async fn test_invalid_transfer_sends_nothing() {
        let chain = Arc::new(FakeChain::new());
        let wallet = Arc::new(FakeWallet::new(owner(), chain.clone()));
        let (service, _) = service(chain, false);
        let session = Session::connected(wallet.clone());

        let draft = TransferDraft {
            recipient: "0x1234".to_string(),
            amount: "1".to_string(),
            asset: Asset::Usdc,
        };
        let err = service
            .transfer(&session, &draft, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, ActionError::Validation(_)));
        assert!(wallet.sent().is_empty());
    }

    #[tokio::test]
    async fn test_token_claim_respects_cooldown() {
        let chain = Arc::new(FakeChain::new());
        let now = u64::try_from(Utc::now().timestamp()).unwrap();
        chain.set(
            ReadRequest::FaucetLastClaimedToken(owner()),
            ReadValue::Timestamp(now - 60),
        );
        chain.set(ReadRequest::FaucetTokenCooldown, ReadValue::Timestamp(86_400));
        let wallet = Arc::new(FakeWallet::new(owner(), chain.clone()));
        let (service, _) = service(chain, false);
        let session = Session::connected(wallet.clone());

        let err = service
            .claim_tokens(&session, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, ActionError::Faucet(_)));
        assert!(wallet.sent().is_empty());
    }

    #[tokio::test]
    async fn test_eth_claim_waits_for_funding() {
        let chain = Arc::new(FakeChain::new());
        chain.set(
            ReadRequest::FaucetHasClaimedEth(owner()),
            ReadValue::Flag(false),
        );
        let wallet = Arc::new(FakeWallet::new(owner(), chain.clone()));
        let (service, faucet) = service(chain, false);
        let session = Session::connected(wallet.clone());

        let receipt = service
            .claim_eth(&session, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(receipt.hash, B256::repeat_byte(0xfa));
        assert_eq!(*faucet.claims.lock().unwrap(), vec![owner()]);
        assert!(wallet.sent().is_empty());
    }

    #[tokio::test]
    async fn test_eth_claim_only_once() {
        let chain = Arc::new(FakeChain::new());
        chain.set(
            ReadRequest::FaucetHasClaimedEth(owner()),
            ReadValue::Flag(true),
        );
        let wallet = Arc::new(FakeWallet::new(owner(), chain.clone()));
        let (service, faucet) = service(chain, false);
        let session = Session::connected(wallet);

        let err = service
            .claim_eth(&session, &CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "faucet request failed: ETH already claimed");
        assert!(faucet.claims.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_eth_claim_surfaces_faucet_error() {
        let chain = Arc::new(FakeChain::new());
        let wallet = Arc::new(FakeWallet::new(owner(), chain.clone()));
        let (service, _) = service(chain, true);
        let session = Session::connected(wallet);

        let err = service
            .claim_eth(&session, &CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "faucet request failed: Failed to send ETH");
    }
}
