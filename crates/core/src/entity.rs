//! [`Entity`] — a stored record (spec §3).

use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A typed record.
///
/// `fields` is a `BTreeMap` so iteration order (used when serializing for
/// snapshots and when computing join projections) is deterministic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// String representation of the id, regardless of the generator kind
    /// that produced it.
    pub id: String,
    /// Name of the registered type this entity belongs to.
    pub entity_type: String,
    /// Field values. Absent key means "not set", not `Value::Null`.
    pub fields: BTreeMap<String, Value>,
}

impl Entity {
    /// Construct a new entity.
    pub fn new(id: impl Into<String>, entity_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            entity_type: entity_type.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Merge a partial field update in place, returning the set of field
    /// names whose value changed (used by the engine to recompute only the
    /// affected index buckets).
    pub fn merge(&mut self, partial: BTreeMap<String, Value>) -> Vec<String> {
        let mut changed = Vec::with_capacity(partial.len());
        for (name, value) in partial {
            changed.push(name.clone());
            self.fields.insert(name, value);
        }
        changed
    }
}
