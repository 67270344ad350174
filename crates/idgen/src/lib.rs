//! ID generator strategies (spec §4.2).
//!
//! Four strategies, each a closed variant rather than a string-dispatched
//! one (spec §9): [`monotonic`], [`random`], [`time_ordered`], and
//! [`client_supplied`]. The engine crate holds one [`GeneratorState`] per
//! registered type and persists the monotonic counter/tombstone state
//! through the durability layer; the other three strategies carry no
//! state that needs persisting.

pub mod client_supplied;
pub mod monotonic;
pub mod random;
pub mod time_ordered;

use syncopate_core::definition::IdGeneratorKind;
use syncopate_core::error::{Error, Result};

/// Per-type generator state, dispatched on [`IdGeneratorKind`].
///
/// Only the monotonic-integer strategy carries mutable, persisted state;
/// the others are stateless and allocated fresh per call.
pub enum GeneratorState {
    /// See [`monotonic::MonotonicGenerator`].
    MonotonicInteger(monotonic::MonotonicGenerator),
    /// See [`random::RandomGenerator`].
    Random128(random::RandomGenerator),
    /// See [`time_ordered::TimeOrderedGenerator`].
    TimeOrderedShort(time_ordered::TimeOrderedGenerator),
    /// See [`client_supplied::ClientSuppliedGenerator`].
    ClientSupplied(client_supplied::ClientSuppliedGenerator),
}

impl GeneratorState {
    /// Build a fresh generator state for a newly-registered type.
    pub fn new(kind: IdGeneratorKind) -> Self {
        match kind {
            IdGeneratorKind::MonotonicInteger => {
                GeneratorState::MonotonicInteger(monotonic::MonotonicGenerator::new())
            }
            IdGeneratorKind::Random128 => GeneratorState::Random128(random::RandomGenerator),
            IdGeneratorKind::TimeOrderedShort => {
                GeneratorState::TimeOrderedShort(time_ordered::TimeOrderedGenerator::new('e'))
            }
            IdGeneratorKind::ClientSupplied => {
                GeneratorState::ClientSupplied(client_supplied::ClientSuppliedGenerator)
            }
        }
    }

    /// The generator kind this state implements.
    pub fn kind(&self) -> IdGeneratorKind {
        match self {
            GeneratorState::MonotonicInteger(_) => IdGeneratorKind::MonotonicInteger,
            GeneratorState::Random128(_) => IdGeneratorKind::Random128,
            GeneratorState::TimeOrderedShort(_) => IdGeneratorKind::TimeOrderedShort,
            GeneratorState::ClientSupplied(_) => IdGeneratorKind::ClientSupplied,
        }
    }

    /// Produce a fresh id. Returns `IdGenerationFailed` for the
    /// client-supplied strategy (clients must always provide the id).
    pub fn generate(&self) -> Result<String> {
        match self {
            GeneratorState::MonotonicInteger(g) => Ok(g.next().to_string()),
            GeneratorState::Random128(g) => Ok(g.generate()),
            GeneratorState::TimeOrderedShort(g) => Ok(g.generate()),
            GeneratorState::ClientSupplied(_) => Err(Error::IdGenerationFailed(
                "client-supplied id generator requires an explicit id".into(),
            )),
        }
    }

    /// Validate a (possibly client-supplied) id against this generator's
    /// syntax rule.
    pub fn validate(&self, id: &str) -> Result<()> {
        let ok = match self {
            GeneratorState::MonotonicInteger(_) => monotonic::is_valid(id),
            GeneratorState::Random128(_) => random::is_valid(id),
            GeneratorState::TimeOrderedShort(_) => time_ordered::is_valid(id),
            GeneratorState::ClientSupplied(_) => client_supplied::is_valid(id),
        };
        if ok {
            Ok(())
        } else {
            Err(Error::InvalidId {
                id: id.to_string(),
                generator: format!("{:?}", self.kind()),
            })
        }
    }
}
