//! Schema-evolution rules applied by `update_type` (spec §4.1.2).

use syncopate_core::definition::{EntityDefinition, IdGeneratorKind};
use syncopate_core::error::{Error, Result};
use syncopate_core::field::FieldDefinition;

/// Validate a proposed field list against the type's current definition
/// and build the resulting [`EntityDefinition`].
///
/// `fields` is the caller's full desired field list, internal timestamp
/// fields included — the same shape `register_type` takes.
pub fn plan(
    current: &EntityDefinition,
    id_generator: IdGeneratorKind,
    fields: Vec<FieldDefinition>,
) -> Result<EntityDefinition> {
    if id_generator != current.id_generator {
        return Err(Error::IdGeneratorChange(current.name.clone()));
    }

    for old_field in &current.fields {
        if !old_field.internal {
            continue;
        }
        match fields.iter().find(|f| f.name == old_field.name) {
            Some(f) if f.internal => {}
            _ => return Err(Error::InternalFieldRemoval(old_field.name.clone())),
        }
    }

    for new_field in &fields {
        match current.field(&new_field.name) {
            Some(old_field) => {
                if old_field.field_type != new_field.field_type
                    && !old_field.field_type.compatible_change_to(new_field.field_type)
                {
                    return Err(Error::IncompatibleTypeChange {
                        field: new_field.name.clone(),
                        from: old_field.field_type.to_string(),
                        to: new_field.field_type.to_string(),
                    });
                }
                if !old_field.required && new_field.required {
                    return Err(Error::RequiredFieldAdded(new_field.name.clone()));
                }
            }
            None => {
                if new_field.required {
                    return Err(Error::RequiredFieldAdded(new_field.name.clone()));
                }
            }
        }
    }

    Ok(EntityDefinition {
        name: current.name.clone(),
        fields,
        id_generator,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use syncopate_core::field::FieldType;

    fn base() -> EntityDefinition {
        EntityDefinition::new(
            "users",
            IdGeneratorKind::MonotonicInteger,
            vec![FieldDefinition::new("age", FieldType::Integer, false, false, false, false, false)],
        )
    }

    #[test]
    fn compatible_type_widening_is_allowed() {
        let current = base();
        let mut fields = current.fields.clone();
        fields[0].field_type = FieldType::Float;
        let result = plan(&current, current.id_generator, fields);
        assert!(result.is_ok());
    }

    #[test]
    fn incompatible_type_narrowing_is_rejected() {
        let current = EntityDefinition::new(
            "users",
            IdGeneratorKind::MonotonicInteger,
            vec![FieldDefinition::new("age", FieldType::Float, false, false, false, false, false)],
        );
        let mut fields = current.fields.clone();
        fields[0].field_type = FieldType::Integer;
        let result = plan(&current, current.id_generator, fields);
        assert!(matches!(result, Err(Error::IncompatibleTypeChange { .. })));
    }

    #[test]
    fn making_an_existing_field_required_is_rejected() {
        let current = base();
        let mut fields = current.fields.clone();
        fields[0].required = true;
        let result = plan(&current, current.id_generator, fields);
        assert!(matches!(result, Err(Error::RequiredFieldAdded(_))));
    }

    #[test]
    fn new_required_field_is_rejected() {
        let current = base();
        let mut fields = current.fields.clone();
        fields.push(FieldDefinition::new("ssn", FieldType::String, false, true, false, false, false));
        let result = plan(&current, current.id_generator, fields);
        assert!(matches!(result, Err(Error::RequiredFieldAdded(_))));
    }

    #[test]
    fn removing_an_internal_field_is_rejected() {
        let current = base();
        let fields: Vec<_> = current
            .fields
            .iter()
            .filter(|f| f.name != "_created_at")
            .cloned()
            .collect();
        let result = plan(&current, current.id_generator, fields);
        assert!(matches!(result, Err(Error::InternalFieldRemoval(_))));
    }

    #[test]
    fn changing_id_generator_is_rejected() {
        let current = base();
        let result = plan(&current, IdGeneratorKind::Random128, current.fields.clone());
        assert!(matches!(result, Err(Error::IdGeneratorChange(_))));
    }
}
