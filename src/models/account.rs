use alloy::primitives::U256;
use serde::Serialize;

use crate::units::{format_amount, NATIVE_DECIMALS};

/// Holdings of the connected wallet. `None` where the read failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletBalances {
    pub native: Option<U256>,
    pub token: Option<U256>,
    pub token_decimals: u8,
}

impl WalletBalances {
    pub fn native_display(&self) -> String {
        format_amount(self.native.unwrap_or_default(), NATIVE_DECIMALS)
    }

    pub fn token_display(&self) -> String {
        format_amount(self.token.unwrap_or_default(), self.token_decimals)
    }
}

/// Capabilities the connected address holds on the market contract
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Rights {
    pub is_admin: bool,
    pub is_moderator: bool,
}

impl Rights {
    pub fn has_creation_rights(&self) -> bool {
        self.is_admin || self.is_moderator
    }
}

/// Faucet claim state for one address
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FaucetStatus {
    pub has_claimed_eth: bool,

    /// Unix seconds of the last token claim, 0 if never claimed
    pub last_claimed_token: u64,

    /// Seconds between token claims
    pub token_cooldown: u64,
}

impl FaucetStatus {
    pub fn can_claim_tokens(&self, now: u64) -> bool {
        if self.last_claimed_token == 0 || self.token_cooldown == 0 {
            return true;
        }
        now >= self.last_claimed_token.saturating_add(self.token_cooldown)
    }

    pub fn can_claim_eth(&self) -> bool {
        !self.has_claimed_eth
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_creation_rights() {
        assert!(!Rights::default().has_creation_rights());
        assert!(Rights {
            is_admin: false,
            is_moderator: true
        }
        .has_creation_rights());
    }

    #[test]
    fn test_token_cooldown() {
        let status = FaucetStatus {
            has_claimed_eth: true,
            last_claimed_token: 1_000,
            token_cooldown: 86_400,
        };

        assert!(!status.can_claim_tokens(1_000 + 86_399));
        assert!(status.can_claim_tokens(1_000 + 86_400));
        assert!(!status.can_claim_eth());
        assert!(FaucetStatus::default().can_claim_tokens(0));
    }

    #[test]
    fn test_balance_display() {
        let balances = WalletBalances {
            native: Some(U256::from(450_000_000_000_000_000u128)),
            token: None,
            token_decimals: 6,
        };
        assert_eq!(balances.native_display(), "0.45");
        assert_eq!(balances.token_display(), "0.00");
    }
}
