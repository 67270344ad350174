//! Filter operator evaluation (spec §4.3.2).
//!
//! A field absent from an entity is treated as [`Value::Null`] for
//! equality, and as a non-match for every other operator — the same
//! "missing sorts/compares as absent" stance the sort order takes.

use crate::compare::compare;
use crate::fuzzy;
use crate::options::{Filter, FilterOperator};
use syncopate_core::entity::Entity;
use syncopate_core::value::Value;

/// Keep only the entities whose `filter.field` matches `filter`.
pub fn scan(entities: Vec<Entity>, filter: &Filter) -> Vec<Entity> {
    entities
        .into_iter()
        .filter(|e| matches(e.fields.get(&filter.field), filter))
        .collect()
}

/// Evaluate one filter against a single (possibly absent) field value.
pub fn matches(value: Option<&Value>, filter: &Filter) -> bool {
    use FilterOperator::*;
    match filter.operator {
        Eq => value.cloned().unwrap_or(Value::Null) == filter.value,
        Neq => value.cloned().unwrap_or(Value::Null) != filter.value,
        Gt | Gte | Lt | Lte => {
            let Some(v) = value else { return false };
            match compare(v, &filter.value) {
                Some(ord) => match filter.operator {
                    Gt => ord.is_gt(),
                    Gte => ord.is_ge(),
                    Lt => ord.is_lt(),
                    Lte => ord.is_le(),
                    _ => unreachable!(),
                },
                None => false,
            }
        }
        Contains | StartsWith | EndsWith => {
            let (Some(Value::String(s)), Value::String(q)) = (value, &filter.value) else {
                return false;
            };
            let s = s.to_lowercase();
            let q = q.to_lowercase();
            match filter.operator {
                Contains => s.contains(&q),
                StartsWith => s.starts_with(&q),
                EndsWith => s.ends_with(&q),
                _ => unreachable!(),
            }
        }
        In => {
            let (Some(v), Value::Array(items)) = (value, &filter.value) else {
                return false;
            };
            items.contains(v)
        }
        ArrayContains => {
            let Some(Value::Array(items)) = value else {
                return false;
            };
            items.contains(&filter.value)
        }
        ArrayContainsAny => {
            let (Some(Value::Array(items)), Value::Array(wanted)) = (value, &filter.value) else {
                return false;
            };
            wanted.iter().any(|w| items.contains(w))
        }
        ArrayContainsAll => {
            let (Some(Value::Array(items)), Value::Array(wanted)) = (value, &filter.value) else {
                return false;
            };
            wanted.iter().all(|w| items.contains(w))
        }
        Fuzzy => {
            let (Some(Value::String(s)), Value::String(q)) = (value, &filter.value) else {
                return false;
            };
            fuzzy::is_match(q, s, filter.fuzzy.unwrap_or_default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eq_treats_absent_field_as_null() {
        let filter = Filter::new("age", FilterOperator::Eq, Value::Null);
        assert!(matches(None, &filter));
    }

    #[test]
    fn gt_is_false_when_categories_mismatch() {
        let filter = Filter::new("age", FilterOperator::Gt, Value::String("x".into()));
        assert!(!matches(Some(&Value::Integer(5)), &filter));
    }

    #[test]
    fn contains_is_case_insensitive() {
        let filter = Filter::new("name", FilterOperator::Contains, Value::String("ADA".into()));
        assert!(matches(Some(&Value::String("ada lovelace".into())), &filter));
    }

    #[test]
    fn in_checks_membership_of_supplied_array() {
        let filter = Filter::new(
            "status",
            FilterOperator::In,
            Value::Array(vec![Value::String("open".into()), Value::String("closed".into())]),
        );
        assert!(matches(Some(&Value::String("closed".into())), &filter));
        assert!(!matches(Some(&Value::String("archived".into())), &filter));
    }

    #[test]
    fn array_contains_all_requires_every_element() {
        let filter = Filter::new(
            "tags",
            FilterOperator::ArrayContainsAll,
            Value::Array(vec![Value::String("a".into()), Value::String("b".into())]),
        );
        let field = Value::Array(vec![Value::String("a".into()), Value::String("b".into()), Value::String("c".into())]);
        assert!(matches(Some(&field), &filter));
        let partial = Value::Array(vec![Value::String("a".into())]);
        assert!(!matches(Some(&partial), &filter));
    }
}
