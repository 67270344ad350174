//! Query request/response shapes (spec §4.3).

use crate::fuzzy::FuzzyOptions;
use serde::Serialize;
use std::collections::BTreeMap;
use syncopate_core::value::Value;

/// A single filter clause (spec §4.3.2).
#[derive(Debug, Clone)]
pub struct Filter {
    /// Field name to compare, or `"id"` for the entity's own id.
    pub field: String,
    /// Comparison to apply.
    pub operator: FilterOperator,
    /// Right-hand side of the comparison.
    pub value: Value,
    /// Only consulted when `operator` is [`FilterOperator::Fuzzy`]; falls
    /// back to [`FuzzyOptions::default`] when `None`.
    pub fuzzy: Option<FuzzyOptions>,
}

impl Filter {
    /// Build a filter with default fuzzy tuning.
    pub fn new(field: impl Into<String>, operator: FilterOperator, value: Value) -> Self {
        Self {
            field: field.into(),
            operator,
            value,
            fuzzy: None,
        }
    }
}

/// Filter comparison operators (spec §4.3.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOperator {
    /// Deep structural equality.
    Eq,
    /// Deep structural inequality.
    Neq,
    /// Greater than.
    Gt,
    /// Greater than or equal.
    Gte,
    /// Less than.
    Lt,
    /// Less than or equal.
    Lte,
    /// Substring match, case-insensitive.
    Contains,
    /// Prefix match, case-insensitive.
    StartsWith,
    /// Suffix match, case-insensitive.
    EndsWith,
    /// Value equals any element of the supplied array.
    In,
    /// Field is an array containing the supplied value.
    ArrayContains,
    /// Field is an array sharing at least one element with the supplied array.
    ArrayContainsAny,
    /// Field is an array that is a superset of the supplied array.
    ArrayContainsAll,
    /// Fuzzy string match (spec §4.3.1).
    Fuzzy,
}

/// `inner` drops a main entity with no target match; `left` keeps it with
/// the join field absent (spec §4.3.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    /// Drop the main entity if no target matches.
    Inner,
    /// Keep the main entity even if no target matches.
    Left,
}

/// Whether a join attaches one target entity or every match (spec §4.3.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectMode {
    /// Attach the first matching target, as a single object.
    First,
    /// Attach every matching target, as an array.
    All,
}

/// One join clause (spec §4.3.4).
#[derive(Debug, Clone)]
pub struct JoinSpec {
    /// Type to join against.
    pub target_type: String,
    /// Field on the main entity providing the join key (or `"id"`).
    pub local_field: String,
    /// Field on the target entity providing the join key (or `"id"`).
    pub foreign_field: String,
    /// Field name the joined value is attached under.
    pub result_field: String,
    /// Inner or left.
    pub kind: JoinKind,
    /// First match or every match.
    pub select: SelectMode,
    /// Filters applied to the target type before matching.
    pub filters: Vec<Filter>,
    /// Non-empty allowlist of target fields to project.
    pub include_fields: Vec<String>,
    /// Target fields to always drop from the projection.
    pub exclude_fields: Vec<String>,
}

/// A complete query request (spec §4.3).
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    /// Entity type to query.
    pub entity_type: String,
    /// Filter clauses, applied in order.
    pub filters: Vec<Filter>,
    /// Field to sort by, if any.
    pub order_by: Option<String>,
    /// Descending when `true`, ascending otherwise.
    pub order_desc: bool,
    /// Maximum entities to return; `0` means unlimited.
    pub limit: usize,
    /// Entities to skip before taking `limit`.
    pub offset: usize,
    /// Joins to run on the surviving page.
    pub joins: Vec<JoinSpec>,
}

/// One page of query results (spec §4.3).
#[derive(Debug, Clone, Serialize)]
pub struct Page {
    /// Total live entities of the queried type, before any filter.
    pub total_of_type: usize,
    /// Number of entities in `data`.
    pub count: usize,
    /// The `limit` this page was produced with.
    pub limit: usize,
    /// The `offset` this page was produced with.
    pub offset: usize,
    /// Whether more matching entities exist beyond this page.
    pub has_more: bool,
    /// Entity type this page was queried from.
    pub entity_type: String,
    /// Projected entities: declared fields, `id`, and any join results.
    pub data: Vec<BTreeMap<String, Value>>,
}
