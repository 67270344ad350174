//! Snapshot format and (de)serialization (spec §4.4.3).
//!
//! A snapshot is a single codec-encoded blob: the full in-memory state of
//! every registered type (its [`EntityDefinition`] plus all entities),
//! written to key `snapshot:<timestamp-ns>` with `latest_snapshot` updated
//! to point at it. Recovery reads only the latest snapshot; older ones are
//! inert history until something prunes them (nothing currently does —
//! out of scope, see SPEC_FULL.md).

use serde::{Deserialize, Serialize};
use syncopate_core::definition::EntityDefinition;
use syncopate_core::entity::Entity;
use syncopate_core::error::{Error, Result};
use syncopate_storage::{decode, encode, KvStore, StorageCodec};

/// One type's worth of state captured in a snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeSnapshot {
    /// The type's schema at snapshot time.
    pub definition: EntityDefinition,
    /// Every live entity of this type at snapshot time.
    pub entities: Vec<Entity>,
}

/// The full point-in-time state captured by one snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SnapshotData {
    /// One entry per registered type, in registration order.
    pub types: Vec<TypeSnapshot>,
}

impl SnapshotData {
    /// Total entity count across every type, for [`crate::recovery::RecoveryStats`]
    /// and `Database::stats()`.
    pub fn entity_count(&self) -> usize {
        self.types.iter().map(|t| t.entities.len()).sum()
    }
}

const LATEST_SNAPSHOT_KEY: &[u8] = b"latest_snapshot";

fn snapshot_key(timestamp_ns: u64) -> Vec<u8> {
    format!("snapshot:{timestamp_ns}").into_bytes()
}

/// Writes a full-state snapshot, point-in-time consistent because the
/// engine calls this while holding its reader lock (spec §9, decision a).
pub struct SnapshotWriter<'a> {
    store: &'a dyn KvStore,
    codec: &'a dyn StorageCodec,
}

impl<'a> SnapshotWriter<'a> {
    /// Build a writer over the given store and codec.
    pub fn new(store: &'a dyn KvStore, codec: &'a dyn StorageCodec) -> Self {
        Self { store, codec }
    }

    /// Serialize `data`, write it under `snapshot:<timestamp_ns>`, then
    /// repoint `latest_snapshot` at it. The caller supplies `timestamp_ns`
    /// (wall-clock time is not available inside this crate's test harness
    /// without reaching for `SystemTime` at every call site; the engine
    /// passes the real clock reading).
    pub fn write(&self, data: &SnapshotData, timestamp_ns: u64) -> Result<()> {
        let bytes = encode(self.codec, data).map_err(|e| Error::SnapshotFailed(e.to_string()))?;
        let key = snapshot_key(timestamp_ns);
        self.store
            .put(&key, &bytes)
            .map_err(|e| Error::SnapshotFailed(e.to_string()))?;

        let mut pointer = Vec::with_capacity(8);
        byteorder::WriteBytesExt::write_u64::<byteorder::LittleEndian>(&mut pointer, timestamp_ns)
            .map_err(|e| Error::SnapshotFailed(e.to_string()))?;
        self.store
            .put(LATEST_SNAPSHOT_KEY, &pointer)
            .map_err(|e| Error::SnapshotFailed(e.to_string()))
    }
}

/// Reads the most recent snapshot, if any.
pub struct SnapshotReader<'a> {
    store: &'a dyn KvStore,
    codec: &'a dyn StorageCodec,
}

impl<'a> SnapshotReader<'a> {
    /// Build a reader over the given store and codec.
    pub fn new(store: &'a dyn KvStore, codec: &'a dyn StorageCodec) -> Self {
        Self { store, codec }
    }

    /// The `timestamp_ns` the `latest_snapshot` pointer holds, if a
    /// snapshot has ever been written.
    pub fn latest_timestamp(&self) -> Result<Option<u64>> {
        match self.store.get(LATEST_SNAPSHOT_KEY)? {
            None => Ok(None),
            Some(bytes) => {
                let mut cursor = &bytes[..];
                let ts = byteorder::ReadBytesExt::read_u64::<byteorder::LittleEndian>(&mut cursor)
                    .map_err(|e| Error::Corruption(format!("latest_snapshot pointer: {e}")))?;
                Ok(Some(ts))
            }
        }
    }

    /// Read and decode the snapshot the `latest_snapshot` pointer names,
    /// or `None` if the database has never been snapshotted.
    pub fn read_latest(&self) -> Result<Option<SnapshotData>> {
        let Some(ts) = self.latest_timestamp()? else {
            return Ok(None);
        };
        let key = snapshot_key(ts);
        match self.store.get(&key)? {
            None => Err(Error::Corruption(format!(
                "latest_snapshot points at missing snapshot:{ts}"
            ))),
            Some(bytes) => {
                let data: SnapshotData = decode(self.codec, &bytes)?;
                Ok(Some(data))
            }
        }
    }
}
