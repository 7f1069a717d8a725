//! # Batch Keys
//!
//! Orderable primary-key values used as keyset cursor positions and as
//! inclusive window bounds.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single-column, orderable primary-key value.
///
/// Integer and text keys are supported. Keys of different variants are never
/// mixed within one table, so the derived cross-variant ordering is only used
/// to keep `Ord` total.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BatchKey {
    Integer(i64),
    Text(String),
}

impl BatchKey {
    /// Read a key out of a JSON value. Returns `None` for null and for
    /// values that are not integers or strings.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Number(n) => n.as_i64().map(BatchKey::Integer),
            serde_json::Value::String(s) => Some(BatchKey::Text(s.clone())),
            _ => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            BatchKey::Integer(i) => serde_json::Value::from(*i),
            BatchKey::Text(s) => serde_json::Value::String(s.clone()),
        }
    }

    /// Parse a key from user input: integers when the text is numeric, text otherwise
    pub fn parse(input: &str) -> Self {
        input
            .parse::<i64>()
            .map(BatchKey::Integer)
            .unwrap_or_else(|_| BatchKey::Text(input.to_string()))
    }

    /// The smallest integer key strictly greater than this one.
    ///
    /// Bounds are inclusive, so resuming a pass after `last_seen` uses
    /// `begin_at = last_seen.successor()`. Text keys have no successor.
    pub fn successor(&self) -> Option<Self> {
        match self {
            BatchKey::Integer(i) => i.checked_add(1).map(BatchKey::Integer),
            BatchKey::Text(_) => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            BatchKey::Integer(i) => Some(*i),
            BatchKey::Text(_) => None,
        }
    }
}

impl fmt::Display for BatchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BatchKey::Integer(i) => write!(f, "{i}"),
            BatchKey::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<i64> for BatchKey {
    fn from(value: i64) -> Self {
        BatchKey::Integer(value)
    }
}

impl From<i32> for BatchKey {
    fn from(value: i32) -> Self {
        BatchKey::Integer(i64::from(value))
    }
}

impl From<String> for BatchKey {
    fn from(value: String) -> Self {
        BatchKey::Text(value)
    }
}

impl From<&str> for BatchKey {
    fn from(value: &str) -> Self {
        BatchKey::Text(value.to_string())
    }
}

impl From<BatchKey> for serde_json::Value {
    fn from(key: BatchKey) -> Self {
        key.to_json()
    }
}
