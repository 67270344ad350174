//! Per-field validation applied on `insert`/`update` (spec §4.1.1).
//!
//! Fields not named in the type's declaration pass through unchecked —
//! the document-style model lets a record carry ad hoc fields beyond its
//! declared schema; only declared fields are type- and nullability-checked.

use std::collections::BTreeMap;
use syncopate_core::definition::EntityDefinition;
use syncopate_core::error::{Error, Result};
use syncopate_core::value::Value;

/// Validate a field map against `definition`. `require_all` enforces
/// presence of every non-internal `required` field — `true` for insert,
/// `false` for a partial update.
pub fn validate_fields(
    definition: &EntityDefinition,
    fields: &BTreeMap<String, Value>,
    require_all: bool,
) -> Result<()> {
    for (name, value) in fields {
        if EntityDefinition::is_internal_name(name) {
            return Err(Error::ReservedFieldModification(name.clone()));
        }
        let Some(field) = definition.field(name) else {
            continue;
        };
        if matches!(value, Value::Null) {
            if !field.nullable {
                return Err(Error::NullableViolation(name.clone()));
            }
            continue;
        }
        if !field.field_type.accepts(value) {
            return Err(Error::FieldTypeMismatch {
                field: name.clone(),
                expected: field.field_type.to_string(),
            });
        }
    }

    if require_all {
        for field in &definition.fields {
            if field.required && !field.internal && !fields.contains_key(&field.name) {
                return Err(Error::RequiredFieldMissing {
                    entity_type: definition.name.clone(),
                    field: field.name.clone(),
                });
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use syncopate_core::definition::IdGeneratorKind;
    use syncopate_core::field::{FieldDefinition, FieldType};

    fn users() -> EntityDefinition {
        EntityDefinition::new(
            "users",
            IdGeneratorKind::MonotonicInteger,
            vec![
                FieldDefinition::new("name", FieldType::String, false, true, false, false, false),
                FieldDefinition::new("bio", FieldType::Text, false, false, true, false, false),
            ],
        )
    }

    #[test]
    fn insert_requires_declared_required_fields() {
        let def = users();
        let fields = BTreeMap::new();
        assert!(matches!(
            validate_fields(&def, &fields, true),
            Err(Error::RequiredFieldMissing { .. })
        ));
    }

    #[test]
    fn update_does_not_require_absent_fields() {
        let def = users();
        let fields = BTreeMap::new();
        assert!(validate_fields(&def, &fields, false).is_ok());
    }

    #[test]
    fn type_mismatch_is_rejected() {
        let def = users();
        let mut fields = BTreeMap::new();
        fields.insert("name".to_string(), Value::Integer(1));
        assert!(matches!(
            validate_fields(&def, &fields, false),
            Err(Error::FieldTypeMismatch { .. })
        ));
    }

    #[test]
    fn null_on_non_nullable_field_is_rejected() {
        let def = users();
        let mut fields = BTreeMap::new();
        fields.insert("name".to_string(), Value::Null);
        assert!(matches!(
            validate_fields(&def, &fields, false),
            Err(Error::NullableViolation(_))
        ));
    }

    #[test]
    fn null_on_nullable_field_is_accepted() {
        let def = users();
        let mut fields = BTreeMap::new();
        fields.insert("bio".to_string(), Value::Null);
        assert!(validate_fields(&def, &fields, false).is_ok());
    }

    #[test]
    fn undeclared_fields_pass_through() {
        let def = users();
        let mut fields = BTreeMap::new();
        fields.insert("nickname".to_string(), Value::String("ada".into()));
        assert!(validate_fields(&def, &fields, false).is_ok());
    }

    #[test]
    fn reserved_field_cannot_be_written_directly() {
        let def = users();
        let mut fields = BTreeMap::new();
        fields.insert("_created_at".to_string(), Value::String("x".into()));
        assert!(matches!(
            validate_fields(&def, &fields, false),
            Err(Error::ReservedFieldModification(_))
        ));
    }
}
