pub mod approve;
pub mod submit;
pub mod trade;

use std::fmt;

use alloy::primitives::TxHash;

use crate::invalidation::MutationKind;

pub use approve::{AdvancePolicy, AllowanceGate};
pub use submit::{PendingTransaction, TxPipeline};
pub use trade::{ActionOutcome, MarketActions};

/// User-facing status messages raised while a mutation moves along
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// The user has to connect a wallet before continuing
    ConnectWallet,
    Submitted { kind: MutationKind, hash: TxHash },
    Confirming { kind: MutationKind, hash: TxHash },
    Succeeded { kind: MutationKind, hash: TxHash },
    /// Carries the provider's message untouched
    Failed { kind: MutationKind, message: String },
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::ConnectWallet => write!(f, "Please connect your wallet first"),
            Notice::Submitted { kind, hash } => {
                write!(f, "{} submitted: {}", kind.as_str(), hash)
            }
            Notice::Confirming { kind, hash } => {
                write!(f, "Waiting for {} ({}) to confirm", kind.as_str(), hash)
            }
            Notice::Succeeded { kind, .. } => write!(f, "{} confirmed", kind.as_str()),
            Notice::Failed { message, .. } => write!(f, "{}", message),
        }
    }
}
