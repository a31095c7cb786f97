use alloy::primitives::utils::{format_units, parse_units};
use alloy::primitives::U256;
use thiserror::Error;

/// Decimal places of the payment token
pub const TOKEN_DECIMALS: u8 = 6;

/// Decimal places of the native asset
pub const NATIVE_DECIMALS: u8 = 18;

/// Decimal places of the `priceYES` fixed-point value
pub const PRICE_DECIMALS: u8 = 18;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountError {
    #[error("amount is empty")]
    Empty,

    #[error("'{0}' is not a decimal number")]
    Invalid(String),

    #[error("amount has more than {0} decimal places")]
    TooPrecise(u8),
}

/// Convert a decimal string into fixed-point integer units.
///
/// Only plain decimal notation is accepted (`"10"`, `"10.5"`, `".5"`).
/// Signs, exponents and separators are rejected, and so is any fractional
/// part longer than `decimals`: the conversion never rounds.
pub fn parse_amount(input: &str, decimals: u8) -> Result<U256, AmountError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(AmountError::Empty);
    }

    let (whole, fraction) = trimmed.split_once('.').unwrap_or((trimmed, ""));

    let all_digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());
    if (whole.is_empty() && fraction.is_empty()) || !all_digits(whole) || !all_digits(fraction) {
        return Err(AmountError::Invalid(trimmed.to_string()));
    }

    if fraction.len() > decimals as usize {
        return Err(AmountError::TooPrecise(decimals));
    }

    let whole = if whole.is_empty() { "0" } else { whole };
    let normalized = if fraction.is_empty() {
        whole.to_string()
    } else {
        format!("{}.{}", whole, fraction)
    };

    parse_units(&normalized, decimals)
        .map(|parsed| parsed.get_absolute())
        .map_err(|_| AmountError::Invalid(trimmed.to_string()))
}

/// Format fixed-point units for display, keeping at least two decimals
pub fn format_amount(value: U256, decimals: u8) -> String {
    let full = match format_units(value, decimals) {
        Ok(s) => s,
        Err(_) => return value.to_string(),
    };

    match full.split_once('.') {
        Some((whole, fraction)) => {
            let trimmed = fraction.trim_end_matches('0');
            let fraction = if trimmed.len() < 2 {
                &fraction[..fraction.len().min(2)]
            } else {
                trimmed
            };
            if fraction.is_empty() {
                whole.to_string()
            } else {
                format!("{}.{}", whole, fraction)
            }
        }
        None => full,
    }
}
