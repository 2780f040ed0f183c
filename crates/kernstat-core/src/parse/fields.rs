//! Named numeric values accumulated while a record is being parsed.

use std::collections::BTreeMap;

use serde::Serialize;

/// A decoded numeric value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Unsigned(u64),
    Signed(i64),
}

impl Value {
    /// Returns the value as u64 if it is non-negative.
    pub fn as_u64(self) -> Option<u64> {
        match self {
            Value::Unsigned(v) => Some(v),
            Value::Signed(v) => u64::try_from(v).ok(),
        }
    }

    /// Returns the value as i64 if it fits.
    pub fn as_i64(self) -> Option<i64> {
        match self {
            Value::Unsigned(v) => i64::try_from(v).ok(),
            Value::Signed(v) => Some(v),
        }
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::Unsigned(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Signed(v)
    }
}

/// Mapping from field name to decoded value.
///
/// Keys are unique; inserting an existing name replaces its value. Iteration
/// is ordered by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldSet {
    fields: BTreeMap<String, Value>,
}

impl FieldSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(name.into(), value.into());
    }

    pub fn value(&self, name: &str) -> Option<Value> {
        self.fields.get(name).copied()
    }

    /// Unsigned view of a field; `None` if absent or negative.
    pub fn get(&self, name: &str) -> Option<u64> {
        self.value(name).and_then(Value::as_u64)
    }

    /// Signed view of a field; `None` if absent or too large.
    pub fn get_signed(&self, name: &str) -> Option<i64> {
        self.value(name).and_then(Value::as_i64)
    }

    /// Unsigned view of a field, zero when absent.
    pub fn get_or_zero(&self, name: &str) -> u64 {
        self.get(name).unwrap_or(0)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for FieldSet {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}
