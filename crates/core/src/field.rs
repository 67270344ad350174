//! [`FieldType`] and [`FieldDefinition`] (spec §3).

use crate::value::Value;
use serde::{Deserialize, Serialize};

/// The declared type of a field, closed over the set spec §3 names.
///
/// Represented as a tagged enum (spec §9 "Tagged variants for filters /
/// operators / ID generators") rather than string dispatch, so every match
/// on it is exhaustive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    /// `boolean`
    Boolean,
    /// `date` — an instant; distinguished from `DateTime` only for schema
    /// documentation purposes, both accept the same runtime categories.
    Date,
    /// `datetime`
    DateTime,
    /// `string`
    String,
    /// `text`
    Text,
    /// `json`
    Json,
    /// `integer`
    Integer,
    /// `float`
    Float,
    /// `array`
    Array,
    /// `object`
    Object,
}

impl FieldType {
    /// Validate a runtime value against the declared type table (spec §4.1.1).
    /// Nullability and presence are checked separately by the caller.
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            FieldType::Boolean => matches!(value, Value::Bool(_)),
            FieldType::Integer => match value {
                Value::Integer(_) => true,
                Value::Float(f) => f.fract() == 0.0,
                _ => false,
            },
            FieldType::Float => matches!(value, Value::Integer(_) | Value::Float(_)),
            FieldType::String | FieldType::Text => matches!(value, Value::String(_)),
            FieldType::Date | FieldType::DateTime => match value {
                Value::DateTime(_) => true,
                Value::String(s) => chrono::DateTime::parse_from_rfc3339(s).is_ok(),
                _ => false,
            },
            FieldType::Json => match value {
                Value::Object(_) | Value::Array(_) => true,
                Value::String(s) => serde_json::from_str::<serde_json::Value>(s).is_ok(),
                _ => false,
            },
            FieldType::Array => matches!(value, Value::Array(_)),
            FieldType::Object => matches!(value, Value::Object(_)),
        }
    }

    /// Compatible type-change paths for schema evolution (spec §4.1.2):
    /// integer→float, string→text, date→datetime. All others are rejected.
    pub fn compatible_change_to(&self, other: FieldType) -> bool {
        matches!(
            (self, other),
            (FieldType::Integer, FieldType::Float)
                | (FieldType::String, FieldType::Text)
                | (FieldType::Date, FieldType::DateTime)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_accepts_whole_floats_only() {
        assert!(FieldType::Integer.accepts(&Value::Integer(3)));
        assert!(FieldType::Integer.accepts(&Value::Float(3.0)));
        assert!(!FieldType::Integer.accepts(&Value::Float(3.5)));
    }

    #[test]
    fn float_accepts_integers() {
        assert!(FieldType::Float.accepts(&Value::Integer(3)));
        assert!(FieldType::Float.accepts(&Value::Float(3.5)));
    }

    #[test]
    fn unique_implies_indexed() {
        let f = FieldDefinition::new("email", FieldType::String, false, true, false, true, false);
        assert!(f.indexed);
    }

    #[test]
    fn compatible_type_changes() {
        assert!(FieldType::Integer.compatible_change_to(FieldType::Float));
        assert!(FieldType::String.compatible_change_to(FieldType::Text));
        assert!(FieldType::Date.compatible_change_to(FieldType::DateTime));
        assert!(!FieldType::Float.compatible_change_to(FieldType::Integer));
        assert!(!FieldType::String.compatible_change_to(FieldType::Integer));
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            FieldType::Boolean => "boolean",
            FieldType::Date => "date",
            FieldType::DateTime => "datetime",
            FieldType::String => "string",
            FieldType::Text => "text",
            FieldType::Json => "json",
            FieldType::Integer => "integer",
            FieldType::Float => "float",
            FieldType::Array => "array",
            FieldType::Object => "object",
        };
        write!(f, "{name}")
    }
}

/// The declared shape and flags of one field within an [`EntityDefinition`](crate::EntityDefinition).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDefinition {
    /// Field name. Non-empty; user fields must not begin with `_`.
    pub name: String,
    /// Declared runtime type.
    pub field_type: FieldType,
    /// Whether a primary index bucket is maintained for this field.
    ///
    /// Always `true` when [`unique`](Self::unique) is `true` — that
    /// invariant is enforced in [`FieldDefinition::new`].
    pub indexed: bool,
    /// Whether the field must be present on insert.
    pub required: bool,
    /// Whether the field may hold `Value::Null`.
    pub nullable: bool,
    /// Whether a unique index is maintained for this field.
    pub unique: bool,
    /// Whether this is one of the two engine-managed fields
    /// (`_created_at`/`_updated_at`). Internal fields are never required
    /// as user input and are excluded from join projections by default.
    pub internal: bool,
}

impl FieldDefinition {
    /// Construct a field definition, applying the "unique implies indexed"
    /// invariant (spec §3).
    pub fn new(
        name: impl Into<String>,
        field_type: FieldType,
        indexed: bool,
        required: bool,
        nullable: bool,
        unique: bool,
        internal: bool,
    ) -> Self {
        Self {
            name: name.into(),
            field_type,
            indexed: indexed || unique,
            required,
            nullable,
            unique,
            internal,
        }
    }

    /// The two fields every registered type carries: `_created_at` and
    /// `_updated_at` — both datetime, indexed, required, internal.
    pub fn internal_timestamp_fields() -> [FieldDefinition; 2] {
        [
            FieldDefinition::new(
                crate::CREATED_AT_FIELD,
                FieldType::DateTime,
                true,
                true,
                false,
                false,
                true,
            ),
            FieldDefinition::new(
                crate::UPDATED_AT_FIELD,
                FieldType::DateTime,
                true,
                true,
                false,
                false,
                true,
            ),
        ]
    }
}
