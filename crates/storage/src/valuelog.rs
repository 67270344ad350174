//! [`ValueLogStore`] — the default [`KvStore`] implementation: an
//! append-only value log on disk plus an in-memory ordered index.
//!
//! Every `put`/`delete` appends a length-prefixed record to the active
//! segment file and records the key's offset in a `BTreeMap` index, giving
//! O(log n) point lookups and ordered prefix iteration directly off the
//! index without touching disk. [`KvStore::value_log_gc`] rewrites the
//! segment, keeping only entries the index still points at, reclaiming
//! space from overwritten and deleted keys.

use crate::kv::KvStore;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use parking_lot::{Mutex, RwLock};
use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use syncopate_core::error::{Error, Result};

const SEGMENT_FILE: &str = "data.vlog";
const TOMBSTONE_LEN: u32 = u32::MAX;

#[derive(Clone, Copy)]
struct Location {
    offset: u64,
    len: u32,
}

/// An embedded, ordered, crash-safe key-value store backed by a single
/// append-only value log file.
pub struct ValueLogStore {
    dir: PathBuf,
    index: RwLock<BTreeMap<Vec<u8>, Location>>,
    file: Mutex<File>,
    sync_writes: bool,
    /// Bytes occupied by records still referenced by the index.
    live_bytes: AtomicU64,
    /// Total bytes written to the active segment, live or not.
    total_bytes: AtomicU64,
}

impl ValueLogStore {
    /// Open (or create) a value-log store rooted at `dir`.
    pub fn open(dir: impl AsRef<Path>, sync_writes: bool) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)
            .map_err(|e| Error::PersistenceFailed(format!("create data directory: {e}")))?;
        let path = dir.join(SEGMENT_FILE);
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&path)
            .map_err(|e| Error::PersistenceFailed(format!("open value log: {e}")))?;

        let (index, total_bytes) = replay_segment(&mut file)?;
        let live_bytes = index.values().map(|loc| record_len(loc.len)).sum();

        Ok(Self {
            dir,
            index: RwLock::new(index),
            file: Mutex::new(file),
            sync_writes,
            live_bytes: AtomicU64::new(live_bytes),
            total_bytes: AtomicU64::new(total_bytes),
        })
    }

    fn append_record(&self, key: &[u8], value: Option<&[u8]>) -> Result<(u64, u32)> {
        let mut file = self.file.lock();
        let offset = file
            .seek(SeekFrom::End(0))
            .map_err(|e| Error::PersistenceFailed(format!("seek value log: {e}")))?;
        let val_len = value.map(|v| v.len() as u32).unwrap_or(TOMBSTONE_LEN);

        file.write_u32::<LittleEndian>(key.len() as u32)
            .and_then(|_| file.write_u32::<LittleEndian>(val_len))
            .and_then(|_| file.write_all(key))
            .and_then(|_| {
                if let Some(v) = value {
                    file.write_all(v)
                } else {
                    Ok(())
                }
            })
            .map_err(|e| Error::PersistenceFailed(format!("append value log: {e}")))?;

        if self.sync_writes {
            file.sync_data()
                .map_err(|e| Error::PersistenceFailed(format!("fsync value log: {e}")))?;
        }
        Ok((offset, val_len))
    }
}

impl KvStore for ValueLogStore {
    fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        let (offset, val_len) = self.append_record(key, Some(value))?;
        let added = record_len(val_len);
        self.total_bytes.fetch_add(added, Ordering::SeqCst);

        let mut index = self.index.write();
        if let Some(old) = index.insert(
            key.to_vec(),
            Location {
                offset,
                len: val_len,
            },
        ) {
            self.live_bytes
                .fetch_sub(record_len(old.len), Ordering::SeqCst);
        }
        self.live_bytes.fetch_add(added, Ordering::SeqCst);
        Ok(())
    }

    fn put_batch(&self, entries: &[(Vec<u8>, Vec<u8>)]) -> Result<()> {
        // The active segment is append-only and guarded by a single mutex,
        // so writing the batch sequentially is already all-or-nothing with
        // respect to any concurrent reader: a reader either observes the
        // index before any of the batch's keys are inserted, or after all
        // of them are (the index write lock below is held for the whole
        // batch).
        let mut located = Vec::with_capacity(entries.len());
        for (key, value) in entries {
            let (offset, val_len) = self.append_record(key, Some(value))?;
            located.push((key.clone(), offset, val_len));
        }

        let mut index = self.index.write();
        for (key, offset, val_len) in located {
            let added = record_len(val_len);
            if let Some(old) = index.insert(key, Location { offset, len: val_len }) {
                self.live_bytes
                    .fetch_sub(record_len(old.len), Ordering::SeqCst);
            }
            self.live_bytes.fetch_add(added, Ordering::SeqCst);
            self.total_bytes.fetch_add(added, Ordering::SeqCst);
        }
        Ok(())
    }

    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let loc = match self.index.read().get(key) {
            Some(loc) => *loc,
            None => return Ok(None),
        };
        let mut file = self.file.lock();
        let mut buf = vec![0u8; loc.len as usize];
        file.seek(SeekFrom::Start(loc.offset + 8 + key.len() as u64))
            .and_then(|_| file.read_exact(&mut buf))
            .map_err(|e| Error::PersistenceFailed(format!("read value log: {e}")))?;
        Ok(Some(buf))
    }

    fn delete(&self, key: &[u8]) -> Result<()> {
        self.append_record(key, None)?;
        let mut index = self.index.write();
        if let Some(old) = index.remove(key) {
            self.live_bytes
                .fetch_sub(record_len(old.len), Ordering::SeqCst);
        }
        Ok(())
    }

    fn iterate(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        let keys: Vec<Vec<u8>> = self
            .index
            .read()
            .range(prefix.to_vec()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k.clone())
            .collect();
        let mut out = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some(value) = self.get(&key)? {
                out.push((key, value));
            }
        }
        Ok(out)
    }

    fn value_log_gc(&self, discard_ratio: f64) -> Result<bool> {
        let total = self.total_bytes.load(Ordering::SeqCst);
        let live = self.live_bytes.load(Ordering::SeqCst);
        if total == 0 {
            return Ok(false);
        }
        let garbage_ratio = 1.0 - (live as f64 / total as f64);
        if garbage_ratio < discard_ratio {
            return Ok(false);
        }

        let tmp_path = self.dir.join(format!("{SEGMENT_FILE}.compact"));
        let mut tmp = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&tmp_path)
            .map_err(|e| Error::PersistenceFailed(format!("open compaction segment: {e}")))?;

        let mut new_index = BTreeMap::new();
        let mut new_total = 0u64;
        {
            let index = self.index.read();
            let mut src = self.file.lock();
            for (key, loc) in index.iter() {
                let mut value = vec![0u8; loc.len as usize];
                src.seek(SeekFrom::Start(loc.offset + 8 + key.len() as u64))
                    .and_then(|_| src.read_exact(&mut value))
                    .map_err(|e| Error::PersistenceFailed(format!("read for gc: {e}")))?;

                let offset = new_total;
                tmp.write_u32::<LittleEndian>(key.len() as u32)
                    .and_then(|_| tmp.write_u32::<LittleEndian>(loc.len))
                    .and_then(|_| tmp.write_all(key))
                    .and_then(|_| tmp.write_all(&value))
                    .map_err(|e| Error::PersistenceFailed(format!("write compaction segment: {e}")))?;

                new_total += record_len(loc.len);
                new_index.insert(key.clone(), Location { offset, len: loc.len });
            }
        }
        tmp.sync_all()
            .map_err(|e| Error::PersistenceFailed(format!("fsync compaction segment: {e}")))?;
        drop(tmp);

        let path = self.dir.join(SEGMENT_FILE);
        std::fs::rename(&tmp_path, &path)
            .map_err(|e| Error::PersistenceFailed(format!("install compaction segment: {e}")))?;
        let new_file = OpenOptions::new()
            .read(true)
            .append(true)
            .open(&path)
            .map_err(|e| Error::PersistenceFailed(format!("reopen value log: {e}")))?;

        *self.file.lock() = new_file;
        *self.index.write() = new_index;
        self.total_bytes.store(new_total, Ordering::SeqCst);
        self.live_bytes.store(new_total, Ordering::SeqCst);
        Ok(true)
    }

    fn close(&self) -> Result<()> {
        self.file
            .lock()
            .sync_all()
            .map_err(|e| Error::PersistenceFailed(format!("close value log: {e}")))
    }
}

fn record_len(val_len: u32) -> u64 {
    let value_bytes = if val_len == TOMBSTONE_LEN { 0 } else { val_len as u64 };
    8 + value_bytes
}

/// Scan a segment file from the start, rebuilding the index. Tombstone
/// records (value length `u32::MAX`) remove any prior entry for the key.
fn replay_segment(file: &mut File) -> Result<(BTreeMap<Vec<u8>, Location>, u64)> {
    file.seek(SeekFrom::Start(0))
        .map_err(|e| Error::Corruption(format!("seek value log for replay: {e}")))?;
    let mut reader = BufReader::new(&*file);
    let mut index = BTreeMap::new();
    let mut offset = 0u64;

    loop {
        let key_len = match reader.read_u32::<LittleEndian>() {
            Ok(v) => v,
            Err(_) => break,
        };
        let val_len = match reader.read_u32::<LittleEndian>() {
            Ok(v) => v,
            Err(_) => break,
        };
        let mut key = vec![0u8; key_len as usize];
        if reader.read_exact(&mut key).is_err() {
            tracing::warn!("truncated value-log record at offset {offset}, stopping replay");
            break;
        }
        if val_len != TOMBSTONE_LEN {
            let mut skip = vec![0u8; val_len as usize];
            if reader.read_exact(&mut skip).is_err() {
                tracing::warn!("truncated value-log record at offset {offset}, stopping replay");
                break;
            }
            index.insert(key, Location { offset, len: val_len });
        } else {
            index.remove(&key);
        }
        offset += 8 + key_len as u64 + if val_len == TOMBSTONE_LEN { 0 } else { val_len as u64 };
    }

    Ok((index, offset))
}
