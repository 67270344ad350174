//! Query engine for SyncopateDB: filter, fuzzy-match, sort, paginate, and
//! join entities of a registered type (spec §4.3).
//!
//! [`QueryEngine`] is a thin, stateless wrapper over
//! [`syncopate_engine::Engine`] — it reads through the engine's public
//! accessors (`list_of_type`, `is_indexed`, `primary_index_lookup`,
//! `definition`) and never touches the engine's lock directly.

#![warn(clippy::all)]

mod compare;
mod engine;
mod filter;
mod fuzzy;
mod join;
mod options;
mod sort;

pub use engine::QueryEngine;
pub use fuzzy::FuzzyOptions;
pub use options::{Filter, FilterOperator, JoinKind, JoinSpec, Page, QueryOptions, SelectMode};
