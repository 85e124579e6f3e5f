//! Record identity.
//!
//! Stores merge fetched records into their local cache by primary key. The key
//! is whatever the server uses (numeric or string); [`Record`] tells the store
//! how to read and assign it.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Attribute name used for keys of plain JSON records.
pub const DEFAULT_ID_ATTRIBUTE: &str = "id";

/// A record primary key.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordKey {
    /// Numeric key
    Int(i64),
    /// String key (UUIDs, slugs)
    Text(String),
}

impl RecordKey {
    /// Read a key out of a JSON scalar. Returns `None` for null, objects and arrays.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_i64().map(Self::Int),
            Value::String(s) if !s.is_empty() => Some(Self::Text(s.clone())),
            _ => None,
        }
    }

    /// The key as a JSON scalar.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Int(n) => Value::from(*n),
            Self::Text(s) => Value::String(s.clone()),
        }
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for RecordKey {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<&str> for RecordKey {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for RecordKey {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// A model record held in a store's local cache.
///
/// Records handed out by a store are shared: mutate a clone when an
/// independent draft is needed.
pub trait Record: Clone + Send + Sync + 'static {
    /// The record's primary key, if it has one.
    fn key(&self) -> Option<RecordKey>;

    /// Assign a primary key to a record that arrived without one.
    fn assign_key(&mut self, key: RecordKey);
}

impl Record for Value {
    fn key(&self) -> Option<RecordKey> {
        self.get(DEFAULT_ID_ATTRIBUTE).and_then(RecordKey::from_json)
    }

    fn assign_key(&mut self, key: RecordKey) {
        if let Value::Object(map) = self {
            map.insert(DEFAULT_ID_ATTRIBUTE.to_string(), key.to_json());
        }
    }
}
