//! # Fact Snapshot
//!
//! Facts are the inputs every rule test reads. The engine keeps exactly one
//! snapshot at a time and replaces it wholesale on `update_facts`; a pass holds a
//! cheap clone of the snapshot it started with, so every read inside the pass
//! sees the same values.

use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::warn;

use crate::error::Result;

/// Immutable, shareable tree of facts.
///
/// The root is always a JSON object. Nested values are reachable with dot
/// paths such as `user.address.city` or `orders.0.total`.
#[derive(Debug, Clone, PartialEq)]
pub struct Facts(Arc<Value>);

impl Facts {
    /// Wraps a JSON value. Anything other than an object is replaced by an
    /// empty object.
    pub fn new(value: Value) -> Self {
        match value {
            Value::Object(_) => Self(Arc::new(value)),
            other => {
                warn!("Facts must be an object, got {}; using empty facts", other);
                Self::empty()
            }
        }
    }

    pub fn empty() -> Self {
        Self(Arc::new(Value::Object(Map::new())))
    }

    pub fn from_serializable<T: Serialize>(value: &T) -> Result<Self> {
        Ok(Self::new(serde_json::to_value(value)?))
    }

    pub fn value(&self) -> &Value {
        &self.0
    }

    /// Deep copy of the whole snapshot.
    pub fn to_value(&self) -> Value {
        self.0.as_ref().clone()
    }

    /// Resolves a dot path. `None` when any segment is missing.
    pub fn get(&self, path: &str) -> Option<&Value> {
        if path.is_empty() {
            return Some(&self.0);
        }
        path.split('.').try_fold(self.0.as_ref(), |current, segment| match current {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        })
    }

    pub fn is_truthy(&self, path: &str) -> bool {
        self.get(path).is_some_and(is_truthy)
    }

    pub fn ptr_eq(&self, other: &Facts) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Default for Facts {
    fn default() -> Self {
        Self::empty()
    }
}

impl From<Value> for Facts {
    fn from(value: Value) -> Self {
        Self::new(value)
    }
}

impl From<Map<String, Value>> for Facts {
    fn from(map: Map<String, Value>) -> Self {
        Self(Arc::new(Value::Object(map)))
    }
}

/// Loose truthiness: null, false, zero, empty string and empty
/// collections are false.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}
