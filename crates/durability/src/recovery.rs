//! Startup recovery (spec §4.4.4): load the latest snapshot, then replay
//! every WAL entry written after it.
//!
//! Recovery never aborts on a single bad record. A corrupt or incomplete
//! transaction is skipped and counted in [`RecoveryStats`]; the caller
//! decides (via logging) whether that warrants operator attention. This
//! mirrors the durability layer's general stance (spec §7): persistence
//! failures are reported, not treated as unrecoverable.

use crate::wal_entry::{OpCode, WalEntry, WAL_PREFIX};
use crate::SnapshotReader;
use std::collections::{BTreeMap, HashMap};
use syncopate_core::definition::EntityDefinition;
use syncopate_core::entity::Entity;
use syncopate_core::value::Value;
use syncopate_storage::{decode, KvStore, StorageCodec};

/// In-memory type state as reconstructed by recovery. The engine rebuilds
/// its indices from this; recovery itself enforces no business invariants.
#[derive(Debug, Default)]
pub struct RecoveredType {
    /// The type's schema, from the snapshot or the most recent
    /// `RegisterType`/`UpdateType` WAL entry, whichever is newer.
    pub definition: Option<EntityDefinition>,
    /// Live entities keyed by id.
    pub entities: BTreeMap<String, Entity>,
}

/// Everything recovery could reconstruct.
#[derive(Debug, Default)]
pub struct RecoveredState {
    /// Per-type state, keyed by type name.
    pub types: HashMap<String, RecoveredType>,
    /// Highest WAL sequence number observed, so the new [`crate::WalWriter`]
    /// resumes numbering from here rather than restarting at zero.
    pub highest_sequence: u64,
}

/// What happened during a recovery pass.
#[derive(Debug, Default)]
pub struct RecoveryStats {
    /// Count of WAL entries successfully applied.
    pub applied_entries: usize,
    /// Count of transaction groups discarded because their closing entry
    /// (`is_last_in_txn`) was never found.
    pub skipped_incomplete_transactions: usize,
    /// Human-readable descriptions of records that failed to decode or
    /// apply; recovery continues past each of these.
    pub errors: Vec<String>,
    /// `true` if a snapshot was found and loaded.
    pub restored_from_snapshot: bool,
}

/// Runs the startup recovery sequence.
pub struct RecoveryCoordinator<'a> {
    store: &'a dyn KvStore,
    codec: &'a dyn StorageCodec,
}

impl<'a> RecoveryCoordinator<'a> {
    /// Build a coordinator over the given store and codec.
    pub fn new(store: &'a dyn KvStore, codec: &'a dyn StorageCodec) -> Self {
        Self { store, codec }
    }

    /// Step 1-5 of spec §4.4.4: load the latest snapshot, fold in any
    /// WAL-disabled `entitydef:` fallback records, then replay the WAL in
    /// sequence order, applying only complete transaction groups.
    pub fn recover(&self) -> (RecoveredState, RecoveryStats) {
        let mut state = RecoveredState::default();
        let mut stats = RecoveryStats::default();

        self.load_snapshot(&mut state, &mut stats);
        self.load_definition_fallbacks(&mut state, &mut stats);
        self.replay_wal(&mut state, &mut stats);

        (state, stats)
    }

    fn load_snapshot(&self, state: &mut RecoveredState, stats: &mut RecoveryStats) {
        let reader = SnapshotReader::new(self.store, self.codec);
        match reader.read_latest() {
            Ok(Some(snapshot)) => {
                stats.restored_from_snapshot = true;
                for type_snapshot in snapshot.types {
                    let entry = state
                        .types
                        .entry(type_snapshot.definition.name.clone())
                        .or_default();
                    entry.definition = Some(type_snapshot.definition);
                    entry.entities = type_snapshot
                        .entities
                        .into_iter()
                        .map(|e| (e.id.clone(), e))
                        .collect();
                }
            }
            Ok(None) => {}
            Err(e) => stats.errors.push(format!("snapshot load failed: {e}")),
        }
    }

    /// Types registered or updated while the WAL was disabled persist only
    /// as a direct `entitydef:<type>` record (spec §4.4.1). These must be
    /// folded in even when a snapshot exists, since they may postdate it.
    fn load_definition_fallbacks(&self, state: &mut RecoveredState, stats: &mut RecoveryStats) {
        let records = match self.store.iterate(b"entitydef:") {
            Ok(records) => records,
            Err(e) => {
                stats.errors.push(format!("entitydef scan failed: {e}"));
                return;
            }
        };
        for (_, bytes) in records {
            match decode::<EntityDefinition>(self.codec, &bytes) {
                Ok(definition) => {
                    let entry = state.types.entry(definition.name.clone()).or_default();
                    entry.definition = Some(definition);
                }
                Err(e) => stats.errors.push(format!("entitydef decode failed: {e}")),
            }
        }
    }

    fn replay_wal(&self, state: &mut RecoveredState, stats: &mut RecoveryStats) {
        let records = match self.store.iterate(WAL_PREFIX) {
            Ok(records) => records,
            Err(e) => {
                stats.errors.push(format!("wal scan failed: {e}"));
                return;
            }
        };

        let mut pending_txns: HashMap<u64, Vec<WalEntry>> = HashMap::new();

        for (_, bytes) in records {
            let entry: WalEntry = match decode(self.codec, &bytes) {
                Ok(entry) => entry,
                Err(e) => {
                    stats.errors.push(format!("wal entry decode failed: {e}"));
                    continue;
                }
            };
            state.highest_sequence = state.highest_sequence.max(entry.sequence_num);

            match entry.transaction_id {
                None => {
                    self.apply_entry(state, stats, entry);
                }
                Some(txn_id) => {
                    let is_last = entry.is_last_in_txn;
                    pending_txns.entry(txn_id).or_default().push(entry);
                    if is_last {
                        if let Some(group) = pending_txns.remove(&txn_id) {
                            for entry in group {
                                self.apply_entry(state, stats, entry);
                            }
                        }
                    }
                }
            }
        }

        stats.skipped_incomplete_transactions += pending_txns.len();
    }

    fn apply_entry(&self, state: &mut RecoveredState, stats: &mut RecoveryStats, entry: WalEntry) {
        let result = match entry.op_code {
            OpCode::RegisterType | OpCode::UpdateType => self.apply_definition(state, &entry),
            OpCode::Insert => self.apply_insert(state, &entry),
            OpCode::Update => self.apply_update(state, &entry),
            OpCode::Delete => {
                if let Some(t) = state.types.get_mut(&entry.entity_type) {
                    t.entities.remove(&entry.id);
                }
                Ok(())
            }
            OpCode::TruncateType => {
                if let Some(t) = state.types.get_mut(&entry.entity_type) {
                    t.entities.clear();
                }
                Ok(())
            }
            OpCode::TruncateAll => {
                for t in state.types.values_mut() {
                    t.entities.clear();
                }
                Ok(())
            }
        };
        match result {
            Ok(()) => stats.applied_entries += 1,
            Err(e) => stats.errors.push(e),
        }
    }

    fn apply_definition(&self, state: &mut RecoveredState, entry: &WalEntry) -> std::result::Result<(), String> {
        let definition: EntityDefinition =
            decode(self.codec, &entry.data).map_err(|e| format!("register/update type decode failed: {e}"))?;
        let t = state.types.entry(entry.entity_type.clone()).or_default();
        t.definition = Some(definition);
        Ok(())
    }

    fn apply_insert(&self, state: &mut RecoveredState, entry: &WalEntry) -> std::result::Result<(), String> {
        let entity: Entity =
            decode(self.codec, &entry.data).map_err(|e| format!("insert decode failed: {e}"))?;
        let t = state.types.entry(entry.entity_type.clone()).or_default();
        t.entities.insert(entity.id.clone(), entity);
        Ok(())
    }

    fn apply_update(&self, state: &mut RecoveredState, entry: &WalEntry) -> std::result::Result<(), String> {
        let partial: BTreeMap<String, Value> =
            decode(self.codec, &entry.data).map_err(|e| format!("update decode failed: {e}"))?;
        let t = state.types.entry(entry.entity_type.clone()).or_default();
        if let Some(existing) = t.entities.get_mut(&entry.id) {
            existing.merge(partial);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wal::WalWriter;
    use std::sync::Arc;
    use syncopate_core::definition::IdGeneratorKind;
    use syncopate_storage::{codec_for, ValueLogStore};

    fn store_and_codec(dir: &std::path::Path) -> (Arc<ValueLogStore>, Arc<dyn StorageCodec>) {
        let store = Arc::new(ValueLogStore::open(dir, false).unwrap());
        let codec: Arc<dyn StorageCodec> = Arc::from(codec_for(false));
        (store, codec)
    }

    #[test]
    fn replays_insert_and_update_and_delete() {
        let dir = tempfile::tempdir().unwrap();
        let (store, codec) = store_and_codec(dir.path());
        let writer = WalWriter::new(store.clone(), codec.clone(), true, 0);

        let definition = EntityDefinition::new("users", IdGeneratorKind::MonotonicInteger, vec![]);
        writer
            .append(OpCode::RegisterType, "users", "", &definition)
            .unwrap();

        let mut entity = Entity::new("1", "users");
        entity.fields.insert("name".into(), Value::String("ada".into()));
        writer.append(OpCode::Insert, "users", "1", &entity).unwrap();

        let mut partial = BTreeMap::new();
        partial.insert("name".to_string(), Value::String("ada lovelace".into()));
        writer.append(OpCode::Update, "users", "1", &partial).unwrap();

        let coordinator = RecoveryCoordinator::new(store.as_ref(), codec.as_ref());
        let (state, stats) = coordinator.recover();

        assert!(stats.errors.is_empty());
        assert_eq!(stats.applied_entries, 3);
        let users = &state.types["users"];
        assert_eq!(
            users.entities["1"].fields["name"],
            Value::String("ada lovelace".into())
        );
    }

    #[test]
    fn incomplete_transaction_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let (store, codec) = store_and_codec(dir.path());

        // Hand-craft a transaction entry that never sets is_last_in_txn,
        // simulating a crash mid-commit.
        let entry = WalEntry {
            timestamp: 0,
            sequence_num: 1,
            transaction_id: Some(99),
            op_code: OpCode::Insert,
            entity_type: "users".into(),
            id: "1".into(),
            data: syncopate_storage::encode(codec.as_ref(), &Entity::new("1", "users")).unwrap(),
            is_last_in_txn: false,
        };
        let key = crate::wal_entry::wal_key(1, "users", "1");
        let bytes = syncopate_storage::encode(codec.as_ref(), &entry).unwrap();
        store.put(&key, &bytes).unwrap();

        let coordinator = RecoveryCoordinator::new(store.as_ref(), codec.as_ref());
        let (state, stats) = coordinator.recover();

        assert_eq!(stats.skipped_incomplete_transactions, 1);
        assert_eq!(stats.applied_entries, 0);
        assert!(state.types.get("users").is_none());
    }
}
