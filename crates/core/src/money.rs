//! Decimal helpers shared by the fee and allocation engines.
//!
//! Values are carried at full precision through every computation and only
//! rounded to [`MONEY_DP`] places when they are displayed or stored.

use crate::error::ValidationError;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use std::str::FromStr;

/// Decimal places used for stored and displayed monetary values.
pub const MONEY_DP: u32 = 2;

pub const ONE_HUNDRED: Decimal = dec!(100);

/// Largest investment or platform amount the engines accept. Keeps every
/// intermediate product well inside `Decimal`'s range.
pub const MAX_AMOUNT: Decimal = dec!(1_000_000_000_000);

/// Round half away from zero to two places, as invoices do.
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(MONEY_DP, RoundingStrategy::MidpointAwayFromZero)
}

/// Parse a raw form value such as `" 12,500.00 "` into a decimal.
///
/// Empty input parses as zero so a cleared field behaves like an unset one.
pub fn parse_money(field: &str, raw: &str) -> Result<Decimal, ValidationError> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| *c != ',' && *c != '_' && !c.is_whitespace())
        .collect();
    if cleaned.is_empty() {
        return Ok(Decimal::ZERO);
    }
    Decimal::from_str(&cleaned).map_err(|_| ValidationError::InvalidNumber {
        field: field.to_string(),
        raw: raw.to_string(),
    })
}

/// Parse a raw percentage, tolerating a trailing `%`.
pub fn parse_percentage(field: &str, raw: &str) -> Result<Decimal, ValidationError> {
    let trimmed = raw.trim();
    parse_money(field, trimmed.strip_suffix('%').unwrap_or(trimmed))
}
