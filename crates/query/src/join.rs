//! Join execution and target-field projection (spec §4.3.4).

use crate::filter;
use crate::options::{JoinSpec, SelectMode};
use std::collections::BTreeMap;
use syncopate_core::definition::{EntityDefinition, IdGeneratorKind};
use syncopate_core::entity::Entity;
use syncopate_core::error::Result;
use syncopate_core::value::Value;
use syncopate_engine::Engine;

/// Numeric-aware join-key normalization: digit-only strings and numeric
/// values collapse to the same integer representation, so an integer
/// foreign key matches a stringified id.
fn join_key(value: &Value) -> Option<String> {
    match value {
        Value::Integer(n) => Some(n.to_string()),
        Value::Float(f) if f.fract() == 0.0 => Some((*f as i64).to_string()),
        Value::String(s) if !s.is_empty() && s.chars().all(|c| c.is_ascii_digit()) => {
            s.parse::<i64>().ok().map(|n| n.to_string())
        }
        Value::String(s) => Some(s.clone()),
        other => Some(other.canonical_string()),
    }
}

fn field_value(entity: &Entity, field: &str) -> Option<Value> {
    if field == "id" {
        Some(Value::String(entity.id.clone()))
    } else {
        entity.fields.get(field).cloned()
    }
}

/// Run one join against `entity`. Returns `None` when nothing in the
/// target type matches — the caller decides whether that drops the main
/// entity (inner) or leaves the join field absent (left).
pub fn apply(engine: &Engine, join: &JoinSpec, entity: &Entity) -> Result<Option<Value>> {
    let Some(local_value) = field_value(entity, &join.local_field) else {
        return Ok(None);
    };
    let Some(key) = join_key(&local_value) else {
        return Ok(None);
    };

    let target_definition = engine.definition(&join.target_type)?;
    let mut targets = engine.list_of_type(&join.target_type)?;
    for f in &join.filters {
        targets = filter::scan(targets, f);
    }

    let matches: Vec<&Entity> = targets
        .iter()
        .filter(|t| match field_value(t, &join.foreign_field) {
            Some(v) => join_key(&v).as_deref() == Some(key.as_str()),
            None => false,
        })
        .collect();

    if matches.is_empty() {
        return Ok(None);
    }

    let projected: Vec<Value> = matches
        .into_iter()
        .map(|t| Value::Object(project(&target_definition, t, join)))
        .collect();

    Ok(Some(match join.select {
        SelectMode::First => projected.into_iter().next().unwrap(),
        SelectMode::All => Value::Array(projected),
    }))
}

/// Project one target entity's fields per the join's include/exclude
/// rules, always attaching `id` (spec §4.3.4).
fn project(definition: &EntityDefinition, entity: &Entity, join: &JoinSpec) -> BTreeMap<String, Value> {
    let mut out = BTreeMap::new();

    let id_value = if definition.id_generator == IdGeneratorKind::MonotonicInteger {
        entity
            .id
            .parse::<i64>()
            .map(Value::Integer)
            .unwrap_or_else(|_| Value::String(entity.id.clone()))
    } else {
        Value::String(entity.id.clone())
    };
    out.insert("id".to_string(), id_value);

    for field in definition.visible_fields() {
        if !join.include_fields.is_empty() && !join.include_fields.contains(&field.name) {
            continue;
        }
        if join.exclude_fields.contains(&field.name) {
            continue;
        }
        if let Some(value) = entity.fields.get(&field.name) {
            out.insert(field.name.clone(), value.clone());
        }
    }

    // Internal fields are excluded by `visible_fields` above; an explicit
    // `include_fields` entry still surfaces them.
    for name in &join.include_fields {
        if out.contains_key(name) || join.exclude_fields.contains(name) {
            continue;
        }
        if let Some(value) = entity.fields.get(name) {
            out.insert(name.clone(), value.clone());
        }
    }

    out
}
