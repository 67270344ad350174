//! Schema registry, indices, and the single-writer data engine for
//! SyncopateDB (spec §4.1).
//!
//! [`Engine`] owns one [`GuardedState`](syncopate_concurrency::GuardedState)
//! covering every registered type's schema, entities, and indices, and
//! drives the durability layer's [`WalWriter`](syncopate_durability::WalWriter)
//! for every mutation. The query engine reads through `Engine`'s public
//! accessors; it never reaches into the lock itself.

#![warn(clippy::all)]

mod engine;
mod index;
mod migration;
mod type_state;
mod validation;

pub use engine::Engine;
pub use index::{PrimaryIndex, UniqueIndex};
pub use migration::plan as migration_plan;
pub use type_state::TypeState;
pub use validation::validate_fields;
