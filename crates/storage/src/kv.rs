//! The [`KvStore`] contract (spec §4.5) — the only persistent medium the
//! durability layer uses.

use syncopate_core::error::Result;

/// Capabilities the durability layer consumes from the storage leaf.
///
/// Implementors must provide atomic single-key writes; a [`KvStore::put_batch`]
/// succeeds or fails as a whole. `iterate` yields keys in ascending order,
/// which the durability layer relies on for WAL replay ordering (spec §4.4.1:
/// `wal:<20-digit-seq>:...` keys iterate in total sequence order).
pub trait KvStore: Send + Sync {
    /// Write a single key atomically.
    fn put(&self, key: &[u8], value: &[u8]) -> Result<()>;

    /// Write a batch of keys atomically: all succeed or all fail.
    fn put_batch(&self, entries: &[(Vec<u8>, Vec<u8>)]) -> Result<()>;

    /// Read a key, if present.
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;

    /// Delete a key. Deleting an absent key is not an error.
    fn delete(&self, key: &[u8]) -> Result<()>;

    /// Return every `(key, value)` pair whose key starts with `prefix`, in
    /// ascending key order.
    fn iterate(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>>;

    /// Reclaim space from the value log. `discard_ratio` is the fraction of
    /// a segment that must be garbage before it is worth rewriting (spec
    /// §4.4.5 default: 0.7). Returns `Ok(false)` — not an error — when
    /// there wasn't enough garbage to justify a rewrite; callers are
    /// expected to swallow that case per spec §4.4.5.
    fn value_log_gc(&self, discard_ratio: f64) -> Result<bool>;

    /// Flush and close the store. Best-effort; a failure here is reported
    /// but does not prevent shutdown (spec §7).
    fn close(&self) -> Result<()>;
}
