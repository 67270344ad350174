//! Durability leaf for SyncopateDB: write-ahead logging, snapshots,
//! startup recovery, and the background maintenance timers that keep the
//! value log and snapshot file current (spec §4.4).
//!
//! Nothing above this crate talks to [`syncopate_storage::KvStore`]
//! directly — the engine drives the types here, which drive storage.

#![warn(clippy::all)]

pub mod background;
pub mod counters;
pub mod recovery;
pub mod snapshot;
pub mod wal;
pub mod wal_entry;

pub use background::Ticker;
pub use counters::{load_counter, load_tombstones, store_counter, store_tombstones};
pub use recovery::{RecoveredState, RecoveredType, RecoveryCoordinator, RecoveryStats};
pub use snapshot::{SnapshotData, SnapshotReader, SnapshotWriter, TypeSnapshot};
pub use wal::WalWriter;
pub use wal_entry::{wal_key, OpCode, WalEntry, WAL_PREFIX};
