//! [`EntityDefinition`] — the registered schema for an entity type (spec §3).

use crate::field::FieldDefinition;
use crate::{CREATED_AT_FIELD, UPDATED_AT_FIELD};
use serde::{Deserialize, Serialize};

/// The four ID generator strategies a type may be created with (spec §4.2).
///
/// Chosen once at `register_type` and never changed afterwards
/// (`update_type` must preserve it — `Error::IdGeneratorChange` otherwise).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdGeneratorKind {
    /// Atomic 64-bit counter, one per type, with tombstone-based non-reuse.
    MonotonicInteger,
    /// 16 random bytes formatted as a canonical v4 UUID.
    Random128,
    /// Time-ordered short id: `<letter><base36 millis><base36 counter><hex rand><hex fingerprint>`.
    TimeOrderedShort,
    /// Any non-empty string the client supplies; the generator never produces one.
    ClientSupplied,
}

impl Default for IdGeneratorKind {
    fn default() -> Self {
        IdGeneratorKind::MonotonicInteger
    }
}

/// The immutable schema for an entity type.
///
/// `name` and `id_generator` are fixed at registration; `fields` may
/// evolve via `update_type`'s migration plan (spec §4.1.2).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityDefinition {
    /// Type name; immutable identity, unique across the registry.
    pub name: String,
    /// Ordered field list, including the two internal timestamp fields.
    pub fields: Vec<FieldDefinition>,
    /// The ID generator this type was created with.
    pub id_generator: IdGeneratorKind,
}

impl EntityDefinition {
    /// Build a definition from a name, generator, and user-declared
    /// fields, appending `_created_at`/`_updated_at` if not already
    /// present (spec §3).
    pub fn new(
        name: impl Into<String>,
        id_generator: IdGeneratorKind,
        mut fields: Vec<FieldDefinition>,
    ) -> Self {
        for internal in FieldDefinition::internal_timestamp_fields() {
            if !fields.iter().any(|f| f.name == internal.name) {
                fields.push(internal);
            }
        }
        Self {
            name: name.into(),
            fields,
            id_generator,
        }
    }

    /// Look up a field definition by name.
    pub fn field(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// All fields flagged `indexed`.
    pub fn indexed_fields(&self) -> impl Iterator<Item = &FieldDefinition> {
        self.fields.iter().filter(|f| f.indexed)
    }

    /// All fields flagged `unique`.
    pub fn unique_fields(&self) -> impl Iterator<Item = &FieldDefinition> {
        self.fields.iter().filter(|f| f.unique)
    }

    /// All fields not flagged `internal` — the default projection set for
    /// join results (spec §4.3.4).
    pub fn visible_fields(&self) -> impl Iterator<Item = &FieldDefinition> {
        self.fields.iter().filter(|f| !f.internal)
    }

    /// True for the two engine-managed timestamp fields.
    pub fn is_internal_name(name: &str) -> bool {
        name == CREATED_AT_FIELD || name == UPDATED_AT_FIELD
    }
}
