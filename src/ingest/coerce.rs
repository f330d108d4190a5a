//! Decimal coercion for incoming snapshot records.
//!
//! The store keeps numbers in a fixed-precision decimal representation.
//! Every float-form number token in a record is re-parsed as a `Decimal`
//! from its literal text and re-emitted as an exact decimal token; integer
//! tokens pass through untouched.

use serde_json::{Map, Number, Value};
use thiserror::Error;

use crate::util::parse_decimal;

#[derive(Debug, Error)]
pub enum CoerceError {
    #[error("numeric value '{0}' does not fit the store's decimal range")]
    OutOfRange(String),
    #[error("failed to re-encode numeric value: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Recursively coerces every float-form number in `value`, descending into
/// nested objects and arrays.
pub fn coerce_decimals(value: Value) -> Result<Value, CoerceError> {
    match value {
        Value::Object(map) => {
            let mut out = Map::with_capacity(map.len());
            for (key, item) in map {
                out.insert(key, coerce_decimals(item)?);
            }
            Ok(Value::Object(out))
        }
        Value::Array(items) => Ok(Value::Array(
            items
                .into_iter()
                .map(coerce_decimals)
                .collect::<Result<_, _>>()?,
        )),
        Value::Number(number) if !number.is_i64() && !number.is_u64() => {
            let text = number.to_string();
            let decimal = parse_decimal(&text).map_err(|_| CoerceError::OutOfRange(text))?;
            let exact: Number = serde_json::from_str(&decimal.to_string())?;
            Ok(Value::Number(exact))
        }
        other => Ok(other),
    }
}
