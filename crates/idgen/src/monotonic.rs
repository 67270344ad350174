//! Monotonic-integer generator (spec §4.2).
//!
//! `next()` returns `counter.fetch_add(1) + 1`, skipping any value already
//! present in the tombstone set. Startup raises the counter to
//! `max(persisted_counter, max_existing_id)` via [`MonotonicGenerator::raise_to`].

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

/// Per-type state for the monotonic-integer strategy: an atomic counter
/// plus the set of deleted ids that must never be reissued.
pub struct MonotonicGenerator {
    counter: AtomicU64,
    tombstones: RwLock<HashSet<u64>>,
}

impl MonotonicGenerator {
    /// A fresh generator with counter at zero and no tombstones.
    pub fn new() -> Self {
        Self {
            counter: AtomicU64::new(0),
            tombstones: RwLock::new(HashSet::new()),
        }
    }

    /// Restore state recovered from the durability layer's persisted
    /// `counter:<type>` and `deleted_ids:<type>` records.
    pub fn restore(counter: u64, tombstones: HashSet<u64>) -> Self {
        Self {
            counter: AtomicU64::new(counter),
            tombstones: RwLock::new(tombstones),
        }
    }

    /// Allocate the next integer id, skipping tombstoned values.
    pub fn next(&self) -> u64 {
        loop {
            let candidate = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
            if !self.tombstones.read().unwrap().contains(&candidate) {
                return candidate;
            }
        }
    }

    /// Raise the counter to at least `value`, used on startup recovery and
    /// whenever an entity is inserted with a client-chosen integer id
    /// higher than the current watermark.
    pub fn raise_to(&self, value: u64) {
        self.counter.fetch_max(value, Ordering::SeqCst);
    }

    /// Record a deleted id so it is never reissued, and persist the set
    /// (the caller is responsible for the actual persistence call).
    pub fn tombstone(&self, id: u64) {
        self.tombstones.write().unwrap().insert(id);
    }

    /// Current counter value, for persistence.
    pub fn counter_value(&self) -> u64 {
        self.counter.load(Ordering::SeqCst)
    }

    /// Snapshot of the tombstone set, for persistence.
    pub fn tombstone_snapshot(&self) -> HashSet<u64> {
        self.tombstones.read().unwrap().clone()
    }
}

impl Default for MonotonicGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Validation requires a base-10 integer (spec §4.2).
pub fn is_valid(id: &str) -> bool {
    !id.is_empty() && id.parse::<u64>().is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skips_tombstoned_ids() {
        let g = MonotonicGenerator::new();
        assert_eq!(g.next(), 1);
        assert_eq!(g.next(), 2);
        g.tombstone(3);
        assert_eq!(g.next(), 4);
    }

    #[test]
    fn raise_to_never_lowers_counter() {
        let g = MonotonicGenerator::new();
        g.next();
        g.next();
        g.raise_to(1);
        assert_eq!(g.next(), 3);
        g.raise_to(100);
        assert_eq!(g.next(), 101);
    }

    #[test]
    fn validation_rejects_non_integers() {
        assert!(is_valid("42"));
        assert!(!is_valid("4.2"));
        assert!(!is_valid(""));
        assert!(!is_valid("abc"));
    }
}
