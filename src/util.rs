//! Small shared helpers.

use chrono::{SecondsFormat, Utc};
use rust_decimal::Decimal;
use std::str::FromStr;

/// Parses a decimal from the textual form of a number. Plain notation first,
/// scientific notation as the fallback.
pub fn parse_decimal(text: &str) -> Result<Decimal, rust_decimal::Error> {
    Decimal::from_str(text).or_else(|_| Decimal::from_scientific(text))
}

/// Current UTC time as an ISO-8601 string.
pub fn utc_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}
