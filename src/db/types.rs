//! Result-set types for query execution.
//!
//! A query either yields rows or fails with a message; each row is a
//! fixed-length tuple of scalar `Value`s in the column order returned by
//! the database.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A row of data from a query result.
pub type Row = Vec<Value>;

/// Outcome of one SQL execution attempt. Exactly one variant holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum ExecutionOutcome {
    /// The statement ran; all rows were fetched eagerly.
    Rows(Vec<Row>),
    /// The statement could not run. Holds the driver's error text verbatim.
    Failure(String),
}

impl ExecutionOutcome {
    /// Creates a failure outcome with the given message.
    pub fn failure(msg: impl Into<String>) -> Self {
        Self::Failure(msg.into())
    }

    /// Returns the rows if the execution succeeded.
    pub fn rows(&self) -> Option<&[Row]> {
        match self {
            Self::Rows(rows) => Some(rows),
            Self::Failure(_) => None,
        }
    }

    /// Returns the failure message if the execution failed.
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Rows(_) => None,
            Self::Failure(msg) => Some(msg),
        }
    }

    /// Returns true if the execution failed.
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failure(_))
    }
}

/// Represents a single value from a database query.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub enum Value {
    /// NULL value.
    #[default]
    Null,

    /// Boolean value.
    Bool(bool),

    /// Signed integer (up to i64).
    Int(i64),

    /// Floating point number.
    Float(f64),

    /// Arbitrary-precision decimal, kept in its canonical text form.
    Numeric(String),

    /// Text/string value (also dates, times, JSON and UUIDs in text form).
    String(String),

    /// Binary data.
    Bytes(Vec<u8>),

    /// Array or other composite value.
    Array(Vec<Value>),

    /// Value of a type the client cannot decode, kept as raw wire bytes.
    Opaque { type_name: String, raw: Vec<u8> },
}

/// Hashable, type-tolerant identity of a scalar value.
///
/// Numbers that are numerically equal map to the same key regardless of
/// whether they came back as integers, floats or decimals. Booleans count
/// as the integers 0 and 1.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ValueKey {
    Null,
    Int(i64),
    Float(u64),
    String(String),
    Bytes(Vec<u8>),
    Opaque(String, Vec<u8>),
}

impl Value {
    /// Returns the hashable identity of this value.
    ///
    /// Composite values have no key; results containing them cannot be
    /// compared as hash multisets.
    pub fn hash_key(&self) -> Option<ValueKey> {
        match self {
            Value::Null => Some(ValueKey::Null),
            Value::Bool(b) => Some(ValueKey::Int(i64::from(*b))),
            Value::Int(i) => Some(ValueKey::Int(*i)),
            Value::Float(f) => Some(float_key(*f)),
            Value::Numeric(s) => Some(numeric_key(s)),
            Value::String(s) => Some(ValueKey::String(s.clone())),
            Value::Bytes(b) => Some(ValueKey::Bytes(b.clone())),
            Value::Array(_) => None,
            Value::Opaque { type_name, raw } => {
                Some(ValueKey::Opaque(type_name.clone(), raw.clone()))
            }
        }
    }

    /// Type-tolerant equality used by the result comparator.
    ///
    /// Scalars are equal when their keys are equal; arrays are equal
    /// element-wise.
    pub fn matches(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Array(a), Value::Array(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.matches(y))
            }
            (Value::Array(_), _) | (_, Value::Array(_)) => false,
            _ => self.hash_key() == other.hash_key(),
        }
    }

    /// Returns a textual representation suitable for sorting rows.
    ///
    /// Opaque values have no textual form, so neither do arrays holding them.
    pub fn sort_repr(&self) -> Option<String> {
        match self {
            Value::Null => Some("None".to_string()),
            Value::Bool(true) => Some("True".to_string()),
            Value::Bool(false) => Some("False".to_string()),
            Value::Int(i) => Some(i.to_string()),
            Value::Float(f) => Some(format!("{f:?}")),
            Value::Numeric(s) => Some(s.clone()),
            Value::String(s) => Some(format!("{s:?}")),
            Value::Bytes(b) => Some(format!("b{b:?}")),
            Value::Array(items) => {
                let parts = items
                    .iter()
                    .map(Value::sort_repr)
                    .collect::<Option<Vec<_>>>()?;
                Some(format!("[{}]", parts.join(", ")))
            }
            Value::Opaque { .. } => None,
        }
    }

    /// Attempts to convert the value to a string representation.
    pub fn to_display_string(&self) -> String {
        match self {
            Value::Null => "NULL".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => f.to_string(),
            Value::Numeric(s) => s.clone(),
            Value::String(s) => s.clone(),
            Value::Bytes(b) => format!("<{} bytes>", b.len()),
            Value::Array(items) => {
                let parts: Vec<String> = items.iter().map(Value::to_display_string).collect();
                format!("{{{}}}", parts.join(","))
            }
            Value::Opaque { type_name, raw } => format!("<{type_name}: {} bytes>", raw.len()),
        }
    }
}

fn float_key(f: f64) -> ValueKey {
    if f.is_nan() {
        return ValueKey::Float(f64::NAN.to_bits());
    }
    // Integral floats collapse onto the integer key; this also folds -0.0 into 0.
    // The upper bound is 2^63, the first float past i64::MAX.
    if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
        return ValueKey::Int(f as i64);
    }
    ValueKey::Float(f.to_bits())
}

fn numeric_key(s: &str) -> ValueKey {
    if s.contains(['e', 'E']) {
        return match s.parse::<f64>() {
            Ok(f) => float_key(f),
            Err(_) => ValueKey::String(s.to_string()),
        };
    }

    let trimmed = match s.split_once('.') {
        Some((int, frac)) => {
            let frac = frac.trim_end_matches('0');
            if frac.is_empty() {
                int.to_string()
            } else {
                format!("{int}.{frac}")
            }
        }
        None => s.to_string(),
    };

    if let Ok(i) = trimmed.parse::<i64>() {
        return ValueKey::Int(i);
    }
    match trimmed.parse::<f64>() {
        Ok(f) => float_key(f),
        Err(_) => ValueKey::String(trimmed),
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_display_string())
    }
}

// Conversion implementations for common types
impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl<T> From<Option<T>> for Value
where
    T: Into<Value>,
{
    fn from(v: Option<T>) -> Self {
        match v {
            Some(val) => val.into(),
            None => Value::Null,
        }
    }
}

impl<T> From<Vec<T>> for Value
where
    T: Into<Value>,
{
    fn from(v: Vec<T>) -> Self {
        Value::Array(v.into_iter().map(Into::into).collect())
    }
}
