use std::fmt;

use alloy::primitives::{Address, U256};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{MarketMetadata, Outcome};
use crate::units::{parse_amount, NATIVE_DECIMALS};

/// Category that requires free-text `custom_category`
pub const OTHER_CATEGORY: &str = "Other";

/// How far a lapsed start time is pushed into the future at submission
pub const START_TIME_GRACE_SECS: i64 = 60;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

/// Every field-level problem found in one submission
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(Vec<FieldError>);

impl FieldErrors {
    fn push(&mut self, field: &'static str, message: &str) {
        self.0.push(FieldError {
            field,
            message: message.to_string(),
        });
    }

    pub fn single(field: &'static str, message: &str) -> Self {
        let mut errors = Self::default();
        errors.push(field, message);
        errors
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.0
    }

    /// First message attached to `field`
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|e| e.field == field)
            .map(|e| e.message.as_str())
    }

    fn into_result<T>(self, value: impl FnOnce() -> T) -> Result<T, FieldErrors> {
        if self.is_empty() {
            Ok(value())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|e| format!("{}: {}", e.field, e.message))
            .collect();
        write!(f, "{}", parts.join("; "))
    }
}

impl std::error::Error for FieldErrors {}

/// Market creation form as entered
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MarketDraft {
    pub question: String,
    pub description: String,
    /// Image URL produced by the upload step, if any
    pub image: String,
    pub category: String,
    pub custom_category: String,
    pub resolution_source: String,
    /// Initial liquidity in whole payment-token units
    pub liquidity: String,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

/// Market draft that passed validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidMarket {
    pub question: String,
    pub description: String,
    pub image: String,
    /// Resolved category (custom text when "Other" was chosen)
    pub category: String,
    pub resolution_source: String,
    /// Liquidity in token units
    pub liquidity: U256,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl MarketDraft {
    pub fn validate(&self, now: DateTime<Utc>, token_decimals: u8) -> Result<ValidMarket, FieldErrors> {
        let mut errors = FieldErrors::default();

        if self.question.chars().count() < 10 {
            errors.push("question", "Question must be at least 10 characters.");
        }
        if self.description.chars().count() < 10 {
            errors.push("description", "Description must be at least 10 characters.");
        }
        if self.category.is_empty() {
            errors.push("category", "Category is required.");
        }
        if self.category == OTHER_CATEGORY && self.custom_category.trim().is_empty() {
            errors.push(
                "customCategory",
                "Custom category is required when 'Other' is selected.",
            );
        }
        if self.resolution_source.chars().count() < 3 {
            errors.push("resolutionSource", "Resolution source is required.");
        }

        let one_token = U256::from(10u64).pow(U256::from(token_decimals));
        let liquidity = match parse_amount(&self.liquidity, token_decimals) {
            Ok(units) if units >= one_token => Some(units),
            _ => {
                errors.push("liquidity", "Initial liquidity must be at least 1.");
                None
            }
        };

        match self.start_date {
            None => errors.push("startDate", "Start date is required."),
            Some(start) if start <= now => {
                errors.push("startDate", "Start date must be in the future.")
            }
            _ => {}
        }
        match self.end_date {
            None => errors.push("endDate", "End date is required."),
            Some(end) if end <= now => errors.push("endDate", "End date must be in the future."),
            _ => {}
        }
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if end <= start {
                errors.push("endDate", "End date must be after start date.");
            }
        }

        let category = if self.category == OTHER_CATEGORY {
            self.custom_category.trim().to_string()
        } else {
            self.category.clone()
        };

        errors.into_result(|| ValidMarket {
            question: self.question.clone(),
            description: self.description.clone(),
            image: self.image.clone(),
            category,
            resolution_source: self.resolution_source.clone(),
            liquidity: liquidity.unwrap_or_default(),
            start: self.start_date.unwrap_or(now),
            end: self.end_date.unwrap_or(now),
        })
    }
}

impl ValidMarket {
    pub fn metadata(&self) -> MarketMetadata {
        MarketMetadata {
            question: self.question.clone(),
            description: self.description.clone(),
            image: self.image.clone(),
            image_source: if self.image.is_empty() {
                String::new()
            } else {
                "cloudinary".to_string()
            },
            category: self.category.clone(),
            resolution_source: self.resolution_source.clone(),
        }
    }

    /// Start/end as unix seconds for submission. A start time that has
    /// lapsed while the user was busy is moved just past `now`.
    pub fn schedule(&self, now: DateTime<Utc>) -> (u64, u64) {
        let start = if self.start <= now {
            now + Duration::seconds(START_TIME_GRACE_SECS)
        } else {
            self.start
        };
        (unix_secs(start), unix_secs(self.end))
    }
}

fn unix_secs(t: DateTime<Utc>) -> u64 {
    u64::try_from(t.timestamp()).unwrap_or(0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Asset {
    Eth,
    Usdc,
}

impl Asset {
    pub fn as_str(&self) -> &'static str {
        match self {
            Asset::Eth => "ETH",
            Asset::Usdc => "USDC",
        }
    }
}

/// Wallet transfer form as entered
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferDraft {
    pub recipient: String,
    pub amount: String,
    pub asset: Asset,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidTransfer {
    pub recipient: Address,
    pub amount: U256,
    pub asset: Asset,
}

impl TransferDraft {
    pub fn validate(&self, token_decimals: u8) -> Result<ValidTransfer, FieldErrors> {
        let mut errors = FieldErrors::default();

        let recipient = parse_address(&self.recipient);
        if recipient.is_none() {
            errors.push("recipient", "Invalid address");
        }

        let decimals = match self.asset {
            Asset::Eth => NATIVE_DECIMALS,
            Asset::Usdc => token_decimals,
        };
        let amount = match parse_amount(&self.amount, decimals) {
            Ok(units) if !units.is_zero() => Some(units),
            _ => {
                errors.push("amount", "Required");
                None
            }
        };

        errors.into_result(|| ValidTransfer {
            recipient: recipient.unwrap_or_default(),
            amount: amount.unwrap_or_default(),
            asset: self.asset,
        })
    }
}

/// Amount entered for a YES/NO purchase
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradeTicket {
    pub market_id: u64,
    pub outcome: Outcome,
    pub amount: String,
}

impl TradeTicket {
    pub fn new(market_id: u64, outcome: Outcome) -> Self {
        Self {
            market_id,
            outcome,
            amount: String::new(),
        }
    }

    pub fn with_amount(mut self, amount: &str) -> Self {
        self.amount = amount.to_string();
        self
    }

    /// Amount in token units, rejecting empty, zero and over-precise input
    pub fn validate(&self, token_decimals: u8) -> Result<U256, FieldErrors> {
        match parse_amount(&self.amount, token_decimals) {
            Ok(units) if !units.is_zero() => Ok(units),
            _ => Err(FieldErrors::single("amount", "Enter a valid amount")),
        }
    }
}

/// Parse a `0x`-prefixed 20-byte address. Mixed-case input must carry a
/// valid EIP-55 checksum.
pub fn parse_address(input: &str) -> Option<Address> {
    let s = input.trim();
    if s.len() != 42 || !s.starts_with("0x") {
        return None;
    }

    let address: Address = s.parse().ok()?;

    let hex = &s[2..];
    let mixed_case = hex.chars().any(|c| c.is_ascii_uppercase())
        && hex.chars().any(|c| c.is_ascii_lowercase());
    if mixed_case && address.to_checksum(None) != s {
        return None;
    }

    Some(address)
}
