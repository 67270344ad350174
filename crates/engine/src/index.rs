//! Primary and unique index buckets, keyed by a field's canonical value
//! string (spec §4.1.3). Nulls are never recorded in either index.

use std::collections::{HashMap, HashSet};
use syncopate_core::value::Value;

/// One field's primary index: canonical value -> every id holding it.
/// Many entities may share a bucket.
#[derive(Debug, Default, Clone)]
pub struct PrimaryIndex {
    buckets: HashMap<String, HashSet<String>>,
}

impl PrimaryIndex {
    /// Record `id` under `value`'s bucket. No-op for `Value::Null`.
    pub fn insert(&mut self, value: &Value, id: &str) {
        if matches!(value, Value::Null) {
            return;
        }
        self.buckets
            .entry(value.canonical_string())
            .or_default()
            .insert(id.to_string());
    }

    /// Remove `id` from `value`'s bucket, dropping the bucket once empty.
    pub fn remove(&mut self, value: &Value, id: &str) {
        if matches!(value, Value::Null) {
            return;
        }
        let key = value.canonical_string();
        if let Some(bucket) = self.buckets.get_mut(&key) {
            bucket.remove(id);
            if bucket.is_empty() {
                self.buckets.remove(&key);
            }
        }
    }

    /// Every id sharing `value`'s bucket.
    pub fn lookup(&self, value: &Value) -> Option<&HashSet<String>> {
        self.buckets.get(&value.canonical_string())
    }
}

/// One field's unique index: canonical value -> the single id holding it.
#[derive(Debug, Default, Clone)]
pub struct UniqueIndex {
    owners: HashMap<String, String>,
}

impl UniqueIndex {
    /// The id currently holding `value`, if any.
    pub fn owner(&self, value: &Value) -> Option<&str> {
        if matches!(value, Value::Null) {
            return None;
        }
        self.owners.get(&value.canonical_string()).map(String::as_str)
    }

    /// Record `id` as `value`'s owner. No-op for `Value::Null`.
    pub fn insert(&mut self, value: &Value, id: &str) {
        if matches!(value, Value::Null) {
            return;
        }
        self.owners.insert(value.canonical_string(), id.to_string());
    }

    /// Clear `value`'s ownership entry, if any.
    pub fn remove(&mut self, value: &Value) {
        if matches!(value, Value::Null) {
            return;
        }
        self.owners.remove(&value.canonical_string());
    }
}
