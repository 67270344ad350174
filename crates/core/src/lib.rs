//! Data model for SyncopateDB
//!
//! This crate defines the types every other crate in the workspace builds
//! on:
//!
//! - [`value`] — the typed [`Value`](value::Value) every field holds, and its
//!   canonical stringification used by the primary/unique indices.
//! - [`field`] — [`FieldType`](field::FieldType) and
//!   [`FieldDefinition`](field::FieldDefinition), the declared shape of a field.
//! - [`definition`] — [`EntityDefinition`](definition::EntityDefinition), the
//!   registered schema for an entity type.
//! - [`entity`] — [`Entity`](entity::Entity), a stored record.
//! - [`error`] — the unified [`Error`](error::Error) taxonomy (spec §7) that
//!   every crate above the storage leaf converts into.

#![warn(clippy::all)]

pub mod definition;
pub mod entity;
pub mod error;
pub mod field;
pub mod value;

pub use definition::EntityDefinition;
pub use entity::Entity;
pub use error::{Error, Result};
pub use field::{FieldDefinition, FieldType};
pub use value::Value;

/// Name of the field stamped once at insert and never modified again.
pub const CREATED_AT_FIELD: &str = "_created_at";

/// Name of the field stamped at insert and rewritten on every update.
pub const UPDATED_AT_FIELD: &str = "_updated_at";
