//! Entity ordering (spec §4.3.3).

use crate::compare::compare;
use std::cmp::Ordering;
use syncopate_core::entity::Entity;

/// Sort `entities` by `field`, missing values sorting last in ascending
/// order (first in descending), ties broken by a stable, id-ascending
/// tie-break.
pub fn sort_entities(entities: &mut [Entity], field: &str, descending: bool) {
    entities.sort_by(|a, b| {
        let ordering = match (a.fields.get(field), b.fields.get(field)) {
            (Some(x), Some(y)) => compare(x, y).unwrap_or(Ordering::Equal),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        let ordering = if descending { ordering.reverse() } else { ordering };
        ordering.then_with(|| a.id.cmp(&b.id))
    });
}
