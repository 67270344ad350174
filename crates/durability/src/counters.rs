//! Per-type ID counter and tombstone persistence, so a monotonic-integer
//! generator survives a restart without replaying the whole WAL (spec §4.2).

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::collections::HashSet;
use syncopate_core::error::{Error, Result};
use syncopate_storage::{decode, encode, KvStore, StorageCodec};

fn counter_key(entity_type: &str) -> Vec<u8> {
    format!("counter:{entity_type}").into_bytes()
}

fn tombstones_key(entity_type: &str) -> Vec<u8> {
    format!("deleted_ids:{entity_type}").into_bytes()
}

/// Persist a type's current monotonic counter value.
pub fn store_counter(store: &dyn KvStore, entity_type: &str, value: u64) -> Result<()> {
    let mut bytes = Vec::with_capacity(8);
    bytes
        .write_u64::<LittleEndian>(value)
        .map_err(|e| Error::PersistenceFailed(e.to_string()))?;
    store.put(&counter_key(entity_type), &bytes)
}

/// Load a type's persisted counter value, or `0` if never written.
pub fn load_counter(store: &dyn KvStore, entity_type: &str) -> Result<u64> {
    match store.get(&counter_key(entity_type))? {
        None => Ok(0),
        Some(bytes) => {
            let mut cursor = &bytes[..];
            cursor
                .read_u64::<LittleEndian>()
                .map_err(|e| Error::Corruption(format!("counter:{entity_type}: {e}")))
        }
    }
}

/// Persist the full tombstone set for a type's monotonic generator, as a
/// codec-encoded `Vec<u64>` (deterministic order avoids hash-set
/// nondeterminism leaking into the on-disk bytes) — compressed like every
/// other persisted record (spec §6).
pub fn store_tombstones(
    store: &dyn KvStore,
    codec: &dyn StorageCodec,
    entity_type: &str,
    ids: &HashSet<u64>,
) -> Result<()> {
    let mut sorted: Vec<u64> = ids.iter().copied().collect();
    sorted.sort_unstable();
    let bytes = encode(codec, &sorted)?;
    store.put(&tombstones_key(entity_type), &bytes)
}

/// Load a type's persisted tombstone set, or an empty set if never written.
pub fn load_tombstones(store: &dyn KvStore, codec: &dyn StorageCodec, entity_type: &str) -> Result<HashSet<u64>> {
    match store.get(&tombstones_key(entity_type))? {
        None => Ok(HashSet::new()),
        Some(bytes) => {
            let ids: Vec<u64> = decode(codec, &bytes)
                .map_err(|e| Error::Corruption(format!("deleted_ids:{entity_type}: {e}")))?;
            Ok(ids.into_iter().collect())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use syncopate_storage::{codec_for, ValueLogStore};

    #[test]
    fn counter_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let store = ValueLogStore::open(dir.path(), false).unwrap();
        assert_eq!(load_counter(&store, "users").unwrap(), 0);
        store_counter(&store, "users", 42).unwrap();
        assert_eq!(load_counter(&store, "users").unwrap(), 42);
    }

    #[test]
    fn tombstones_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = ValueLogStore::open(dir.path(), false).unwrap();
        let codec = codec_for(true);
        let mut ids = HashSet::new();
        ids.insert(3u64);
        ids.insert(7u64);
        store_tombstones(&store, codec.as_ref(), "users", &ids).unwrap();
        assert_eq!(load_tombstones(&store, codec.as_ref(), "users").unwrap(), ids);
    }
}
