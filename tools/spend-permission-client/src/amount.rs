//! Decimal amount parsing into a token's smallest unit.

use std::sync::OnceLock;

use alloy_primitives::U256;
use regex::Regex;

use crate::error::AmountError;

fn amount_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^(\d*)(?:\.(\d*))?$").expect("amount pattern is valid"))
}

/// Scale `amount` by `10^decimals`.
///
/// Fractional digits beyond `decimals` are rounded half-up on the first dropped digit,
/// so `parse_units("1.0000005", 6)` is `1000001`.
pub fn parse_units(amount: &str, decimals: u8) -> Result<U256, AmountError> {
    let amount = amount.trim();
    if amount.is_empty() {
        return Err(AmountError::Empty);
    }
    if amount.starts_with('-') {
        return Err(AmountError::Negative);
    }
    let captures = amount_pattern()
        .captures(amount)
        .ok_or_else(|| AmountError::Invalid(amount.to_string()))?;
    let integer = captures.get(1).map_or("", |m| m.as_str());
    let fraction = captures.get(2).map_or("", |m| m.as_str());
    if integer.is_empty() && fraction.is_empty() {
        return Err(AmountError::Invalid(amount.to_string()));
    }

    let decimals = usize::from(decimals);
    let (kept, dropped) = if fraction.len() > decimals {
        fraction.split_at(decimals)
    } else {
        (fraction, "")
    };
    let round_up = dropped.bytes().next().is_some_and(|d| d >= b'5');

    let mut digits = String::with_capacity(integer.len() + decimals);
    digits.push_str(integer);
    digits.push_str(kept);
    digits.extend(std::iter::repeat('0').take(decimals - kept.len()));
    let digits = digits.trim_start_matches('0');

    let scaled = if digits.is_empty() {
        U256::ZERO
    } else {
        U256::from_str_radix(digits, 10).map_err(|_| AmountError::Overflow)?
    };
    if round_up {
        scaled
            .checked_add(U256::from(1u64))
            .ok_or(AmountError::Overflow)
    } else {
        Ok(scaled)
    }
}
