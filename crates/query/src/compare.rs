//! Value comparison shared by filtering and sorting (spec §4.3.2, §4.3.3).

use std::cmp::Ordering;
use syncopate_core::value::Value;

/// Compare two values: numeric if both numeric, lexicographic if both
/// strings, chronological if both instants, `false < true` for booleans.
/// Any other pairing is incomparable.
pub fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Integer(_) | Value::Float(_), Value::Integer(_) | Value::Float(_)) => {
            a.as_f64()?.partial_cmp(&b.as_f64()?)
        }
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::DateTime(x), Value::DateTime(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_compares_across_integer_and_float() {
        assert_eq!(compare(&Value::Integer(3), &Value::Float(3.5)), Some(Ordering::Less));
    }

    #[test]
    fn strings_compare_lexicographically() {
        assert_eq!(
            compare(&Value::String("a".into()), &Value::String("b".into())),
            Some(Ordering::Less)
        );
    }

    #[test]
    fn booleans_false_is_less_than_true() {
        assert_eq!(compare(&Value::Bool(false), &Value::Bool(true)), Some(Ordering::Less));
    }

    #[test]
    fn mismatched_categories_are_incomparable() {
        assert_eq!(compare(&Value::Integer(1), &Value::String("1".into())), None);
    }
}
