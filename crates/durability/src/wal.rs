//! [`WalWriter`] — sequence allocation, single-op appends, and the
//! transaction-grouping API (spec §4.4.1, §4.4.2).

use crate::wal_entry::{wal_key, OpCode, WalEntry};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use syncopate_core::error::{Error, Result};
use syncopate_storage::{encode, KvStore, StorageCodec};

/// A queued (not yet sequenced) entry within an open transaction.
struct PendingEntry {
    op_code: OpCode,
    entity_type: String,
    id: String,
    data: Vec<u8>,
}

/// Appends WAL entries with monotonic sequence numbers, and groups
/// entries committed as one transaction (spec §4.4.2).
///
/// Sequence allocation and the transaction registry are each guarded by
/// their own short critical section (spec §5): an atomic counter for the
/// former, a `Mutex<HashMap<..>>` for the latter. Neither lock is held
/// across the underlying KV store I/O.
pub struct WalWriter {
    store: Arc<dyn KvStore>,
    codec: Arc<dyn StorageCodec>,
    sequence: AtomicU64,
    next_txn_id: AtomicU64,
    pending_txns: Mutex<HashMap<u64, Vec<PendingEntry>>>,
    enabled: bool,
}

impl WalWriter {
    /// Build a writer. `starting_sequence` should come from recovery (the
    /// highest sequence number observed in the existing log, or 0 for a
    /// fresh database). When `enabled` is false, only schema-affecting
    /// operations persist, via a direct `entitydef:<type>` record.
    pub fn new(
        store: Arc<dyn KvStore>,
        codec: Arc<dyn StorageCodec>,
        enabled: bool,
        starting_sequence: u64,
    ) -> Self {
        Self {
            store,
            codec,
            sequence: AtomicU64::new(starting_sequence),
            next_txn_id: AtomicU64::new(0),
            pending_txns: Mutex::new(HashMap::new()),
            enabled,
        }
    }

    fn next_sequence(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Highest sequence number allocated so far.
    pub fn current_sequence(&self) -> u64 {
        self.sequence.load(Ordering::SeqCst)
    }

    fn is_schema_op(op_code: OpCode) -> bool {
        matches!(op_code, OpCode::RegisterType | OpCode::UpdateType)
    }

    /// Append a single, immediately-committed WAL entry. Returns the
    /// allocated sequence number, or `0` if the WAL is disabled and this
    /// wasn't a schema operation (nothing was written).
    pub fn append<T: Serialize>(
        &self,
        op_code: OpCode,
        entity_type: &str,
        id: &str,
        payload: &T,
    ) -> Result<u64> {
        let data = encode(self.codec.as_ref(), payload)?;

        if !self.enabled {
            if Self::is_schema_op(op_code) {
                self.write_definition_fallback(entity_type, &data)?;
            }
            return Ok(0);
        }

        let seq = self.next_sequence();
        let entry = WalEntry {
            timestamp: now_millis(),
            sequence_num: seq,
            transaction_id: None,
            op_code,
            entity_type: entity_type.to_string(),
            id: id.to_string(),
            data,
            is_last_in_txn: true,
        };
        let key = wal_key(seq, entity_type, id);
        let bytes = encode(self.codec.as_ref(), &entry)?;
        self.store
            .put(&key, &bytes)
            .map_err(|e| Error::WalWriteFailed(e.to_string()))?;
        Ok(seq)
    }

    /// Direct `entitydef:<type>` fallback record, written unconditionally
    /// for schema operations when the WAL is disabled so the database can
    /// still restart with the latest definition (spec §4.4.1).
    fn write_definition_fallback(&self, entity_type: &str, encoded_definition: &[u8]) -> Result<()> {
        let key = format!("entitydef:{entity_type}").into_bytes();
        self.store
            .put(&key, encoded_definition)
            .map_err(|e: Error| Error::WalWriteFailed(e.to_string()))
    }

    /// Begin a transaction, returning its id.
    pub fn begin(&self) -> u64 {
        let txn_id = self.next_txn_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.pending_txns.lock().unwrap().insert(txn_id, Vec::new());
        txn_id
    }

    /// Queue an operation within an open transaction. Not yet durable;
    /// durability happens atomically at [`WalWriter::commit`].
    pub fn add<T: Serialize>(
        &self,
        txn_id: u64,
        op_code: OpCode,
        entity_type: &str,
        id: &str,
        payload: &T,
    ) -> Result<()> {
        let data = encode(self.codec.as_ref(), payload)?;
        let mut txns = self.pending_txns.lock().unwrap();
        let entries = txns
            .get_mut(&txn_id)
            .ok_or_else(|| Error::Unknown(format!("unknown transaction {txn_id}")))?;
        entries.push(PendingEntry {
            op_code,
            entity_type: entity_type.to_string(),
            id: id.to_string(),
            data,
        });
        Ok(())
    }

    /// Commit a transaction: assign sequential sequence numbers to every
    /// queued entry, flag the last one `is_last_in_txn`, and write the
    /// whole group atomically (spec §4.4.2).
    pub fn commit(&self, txn_id: u64) -> Result<()> {
        let entries = {
            let mut txns = self.pending_txns.lock().unwrap();
            txns.remove(&txn_id)
                .ok_or_else(|| Error::Unknown(format!("unknown transaction {txn_id}")))?
        };
        if entries.is_empty() || !self.enabled {
            return Ok(());
        }

        let last_index = entries.len() - 1;
        let mut batch = Vec::with_capacity(entries.len());
        for (i, pending) in entries.into_iter().enumerate() {
            let seq = self.next_sequence();
            let wal_entry = WalEntry {
                timestamp: now_millis(),
                sequence_num: seq,
                transaction_id: Some(txn_id),
                op_code: pending.op_code,
                entity_type: pending.entity_type.clone(),
                id: pending.id.clone(),
                data: pending.data,
                is_last_in_txn: i == last_index,
            };
            let key = wal_key(seq, &pending.entity_type, &pending.id);
            let bytes = encode(self.codec.as_ref(), &wal_entry)?;
            batch.push((key, bytes));
        }

        self.store
            .put_batch(&batch)
            .map_err(|e| Error::WalWriteFailed(e.to_string()))
    }

    /// Abort a transaction: discard its queued entries without writing
    /// anything.
    pub fn abort(&self, txn_id: u64) -> Result<()> {
        self.pending_txns.lock().unwrap().remove(&txn_id);
        Ok(())
    }
}

fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use syncopate_storage::{codec_for, ValueLogStore};

    fn writer(dir: &std::path::Path, enabled: bool) -> WalWriter {
        let store: Arc<dyn KvStore> = Arc::new(ValueLogStore::open(dir, false).unwrap());
        let codec: Arc<dyn StorageCodec> = Arc::from(codec_for(false));
        WalWriter::new(store, codec, enabled, 0)
    }

    #[test]
    fn single_append_allocates_sequence() {
        let dir = tempfile::tempdir().unwrap();
        let w = writer(dir.path(), true);
        let seq1 = w.append(OpCode::Insert, "users", "1", &"payload-1").unwrap();
        let seq2 = w.append(OpCode::Insert, "users", "2", &"payload-2").unwrap();
        assert_eq!(seq1, 1);
        assert_eq!(seq2, 2);
    }

    #[test]
    fn disabled_wal_only_persists_schema_ops() {
        let dir = tempfile::tempdir().unwrap();
        let w = writer(dir.path(), false);
        let seq = w.append(OpCode::Insert, "users", "1", &"x").unwrap();
        assert_eq!(seq, 0);
        let seq = w.append(OpCode::RegisterType, "users", "", &"def").unwrap();
        assert_eq!(seq, 0);
    }

    #[test]
    fn transaction_marks_last_entry() {
        let dir = tempfile::tempdir().unwrap();
        let w = writer(dir.path(), true);
        let txn = w.begin();
        w.add(txn, OpCode::Insert, "users", "1", &"a").unwrap();
        w.add(txn, OpCode::Insert, "users", "2", &"b").unwrap();
        w.commit(txn).unwrap();
        assert_eq!(w.current_sequence(), 2);
    }

    #[test]
    fn abort_discards_queued_entries() {
        let dir = tempfile::tempdir().unwrap();
        let w = writer(dir.path(), true);
        let txn = w.begin();
        w.add(txn, OpCode::Insert, "users", "1", &"a").unwrap();
        w.abort(txn).unwrap();
        assert!(w.commit(txn).is_err());
        assert_eq!(w.current_sequence(), 0);
    }
}
