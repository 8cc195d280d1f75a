//! JSON to native parameter coercion.
//!
//! Only numeric literals receive a native type. Every other JSON value is
//! handed to the procedure as its JSON text, quotes included, and the
//! procedure reinterprets it as it sees fit.
//!
//! serde_json runs with `arbitrary_precision`, so a number's text is the
//! literal the caller sent and the decimal step sees every digit.

use std::str::FromStr;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde_json::{Number, Value};

/// A parameter value ready to bind.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Integer(i64),
    Decimal(Decimal),
    Float(f64),
    /// Raw JSON text of a non-numeric value.
    Text(String),
    Null,
}

/// Coerce a JSON value into a bindable scalar.
///
/// Numbers take the first representation that fits: 64-bit integer, then
/// fixed-point decimal, then double.
pub fn coerce(value: &Value) -> Scalar {
    match value {
        Value::Number(number) => coerce_number(number),
        other => Scalar::Text(other.to_string()),
    }
}

fn coerce_number(number: &Number) -> Scalar {
    if let Some(i) = number.as_i64() {
        return Scalar::Integer(i);
    }
    let literal = number.as_str();
    if let Ok(d) = Decimal::from_str_exact(literal).or_else(|_| Decimal::from_scientific(literal)) {
        return Scalar::Decimal(d);
    }
    match number.as_f64() {
        Some(f) => Scalar::Float(f),
        None => Scalar::Null,
    }
}

impl From<Scalar> for libsql::Value {
    fn from(scalar: Scalar) -> Self {
        match scalar {
            Scalar::Integer(i) => libsql::Value::Integer(i),
            // SQLite's only fractional type is REAL.
            Scalar::Decimal(d) => match d.to_f64() {
                Some(f) => libsql::Value::Real(f),
                None => libsql::Value::Text(d.to_string()),
            },
            Scalar::Float(f) => libsql::Value::Real(f),
            Scalar::Text(s) => libsql::Value::Text(s),
            Scalar::Null => libsql::Value::Null,
        }
    }
}
