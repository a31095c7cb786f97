use thiserror::Error;

use crate::forms::FieldErrors;
use crate::receipts::WaitError;

/// Failure talking to the chain or decoding what it returned
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    #[error("rpc error: {0}")]
    Rpc(String),

    #[error("failed to decode {call}: {message}")]
    Decode {
        call: &'static str,
        message: String,
    },

    #[error("{0} reverted")]
    Reverted(&'static str),

    #[error("batch returned {got} results for {expected} calls")]
    BatchMismatch { expected: usize, got: usize },

    #[error("transaction rejected: {0}")]
    Rejected(String),
}

/// Why a user-facing action did not go through
#[derive(Debug, Error)]
pub enum ActionError {
    #[error("Wallet is initializing, please wait...")]
    WalletNotReady,

    #[error("Please connect your wallet first")]
    NotConnected,

    #[error(transparent)]
    Validation(#[from] FieldErrors),

    #[error("failed to read {what}: {source}")]
    Read {
        what: &'static str,
        #[source]
        source: ChainError,
    },

    #[error("{0}")]
    Submission(#[source] ChainError),

    #[error(transparent)]
    Receipt(#[from] WaitError),

    #[error("metadata upload failed: {0}")]
    Metadata(String),

    #[error("faucet request failed: {0}")]
    Faucet(String),
}
