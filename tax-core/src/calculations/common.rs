//! Shared helpers for the accrual calculations.
//!
//! Decimal parsing for text coming from storage or user input, the
//! zero floor applied to tax figures, and display rounding.

use rust_decimal::{Decimal, RoundingStrategy};
use thiserror::Error;

/// Error returned when text cannot be read as a [`Decimal`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid decimal '{input}': {reason}")]
pub struct ParseDecimalError {
    pub input: String,
    pub reason: String,
}

/// Trims whitespace and drops the comma thousands separator.
fn normalize_decimal_input(s: &str) -> String {
    s.trim().replace(',', "")
}

/// Parses text into a [`Decimal`], accepting `1,234.56`.
///
/// Blank input is an error; use [`parse_optional_decimal`] where a blank
/// cell means "nothing recorded".
///
/// ```
/// use rust_decimal_macros::dec;
/// use tax_core::calculations::common::parse_decimal;
///
/// assert_eq!(parse_decimal(" 1,234.50 "), Ok(dec!(1234.50)));
/// assert!(parse_decimal("12a").is_err());
/// assert!(parse_decimal("").is_err());
/// ```
pub fn parse_decimal(s: &str) -> Result<Decimal, ParseDecimalError> {
    let normalized = normalize_decimal_input(s);
    if normalized.is_empty() {
        return Err(ParseDecimalError {
            input: s.to_string(),
            reason: "value is empty".to_string(),
        });
    }
    normalized
        .parse::<Decimal>()
        .or_else(|_| Decimal::from_scientific(&normalized))
        .map_err(|e| ParseDecimalError {
            input: s.to_string(),
            reason: e.to_string(),
        })
}

/// Parses optional text into a [`Decimal`]; `None` and blank read as zero.
pub fn parse_optional_decimal(s: Option<&str>) -> Result<Decimal, ParseDecimalError> {
    match s {
        Some(text) if !text.trim().is_empty() => parse_decimal(text),
        _ => Ok(Decimal::ZERO),
    }
}

/// Rounds to two places, midpoints away from zero. Display only; the engine
/// itself never rounds.
///
/// ```
/// use rust_decimal_macros::dec;
/// use tax_core::calculations::common::round_half_up;
///
/// assert_eq!(round_half_up(dec!(123.455)), dec!(123.46));
/// assert_eq!(round_half_up(dec!(-123.455)), dec!(-123.46));
/// ```
pub fn round_half_up(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Clamps a tax figure at zero.
pub fn floor_at_zero(value: Decimal) -> Decimal {
    if value > Decimal::ZERO {
        value
    } else {
        Decimal::ZERO
    }
}
