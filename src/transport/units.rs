use alloy::primitives::U256;
use alloy::primitives::utils::{format_units, parse_units};

use crate::error::{HarnessError, HarnessResult};

/// Convert `amount` denominated in `unit` ("ether", "gwei", "wei", ...) to wei
pub fn to_wei(amount: &str, unit: &str) -> HarnessResult<U256> {
    if amount.trim_start().starts_with('-') {
        return Err(HarnessError::InvalidArgument(format!(
            "amount must not be negative: {}",
            amount
        )));
    }

    parse_units(amount, unit)
        .map(|parsed| parsed.get_absolute())
        .map_err(|e| {
            HarnessError::InvalidArgument(format!("invalid amount '{} {}': {}", amount, unit, e))
        })
}

/// Parse a human amount such as `"6 ether"`; a bare number is taken as wei
pub fn parse_amount(text: &str) -> HarnessResult<U256> {
    let mut parts = text.split_whitespace();
    let amount = parts
        .next()
        .ok_or_else(|| HarnessError::invalid_argument("empty amount"))?;
    let unit = parts.next().unwrap_or("wei");

    if parts.next().is_some() {
        return Err(HarnessError::InvalidArgument(format!(
            "expected '<amount> <unit>', got '{}'",
            text
        )));
    }

    to_wei(amount, unit)
}

/// Render wei as ether for display
pub fn format_ether(wei: U256) -> String {
    format_units(wei, "ether").unwrap_or_else(|_| format!("{} wei", wei))
}
