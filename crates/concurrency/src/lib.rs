//! Concurrency discipline for SyncopateDB (spec §5).
//!
//! Not a module the rest of the system calls into for behavior — a
//! contract every mutating engine operation follows:
//!
//! 1. Acquire the writer lock.
//! 2. Mutate in-memory state (entity map, primary/unique indices).
//! 3. Release the lock — *before* invoking the durability layer.
//! 4. Persist (WAL append).
//! 5. On persistence failure, reacquire the writer lock and invert the
//!    mutation exactly (spec §9: "the inverse operation exactly restores
//!    prior index contents, not merely a semantically-equivalent state").
//!
//! [`GuardedState::mutate_with_rollback`] encodes steps 1–5 once so every
//! `insert`/`update`/`delete`/`register_type`/`update_type` in the engine
//! crate calls through the same path instead of re-deriving it.

pub mod guard;

pub use guard::GuardedState;
