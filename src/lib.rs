//! SyncopateDB: an embedded, schema-aware, document-style database core.
//!
//! [`Database`] assembles the engine, query engine, and durability
//! background tasks into the programmatic API an embedding shell (HTTP,
//! CLI, or otherwise) calls directly — the core never speaks a wire
//! protocol itself (spec §6).

#![warn(clippy::all)]

use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use syncopate_core::definition::{EntityDefinition, IdGeneratorKind};
use syncopate_core::entity::Entity;
use syncopate_core::error::Result;
use syncopate_core::field::FieldDefinition;
use syncopate_core::value::Value;
use syncopate_durability::{SnapshotReader, SnapshotWriter, Ticker};
use syncopate_engine::Engine;
use syncopate_query::{Page, QueryEngine, QueryOptions};
use syncopate_storage::{codec_for, KvStore, StorageCodec, ValueLogStore};

pub use syncopate_core::error::Error;
pub use syncopate_query::{Filter, FilterOperator, JoinKind, JoinSpec, SelectMode};

/// Configuration the core consumes at startup (spec §6's table).
#[derive(Debug, Clone)]
pub struct Config {
    /// Location of the embedded KV store.
    pub data_dir: PathBuf,
    /// Number of entities the durability layer's read cache should hold.
    ///
    /// The engine keeps every entity of every registered type resident in
    /// memory already (spec §4.1), so there is no separate read cache to
    /// bound yet; this field is accepted for API compatibility with the
    /// config table and is not currently consumed. See `DESIGN.md`.
    pub cache_size: usize,
    /// Fsync each WAL write.
    pub sync_writes: bool,
    /// Period between automatic snapshots.
    pub snapshot_interval: Duration,
    /// Disables WAL writes; direct definition records still persist.
    pub wal_enabled: bool,
    /// Toggles zstd compression in the storage codec.
    pub block_compression_enabled: bool,
    /// Fraction of a value-log segment that must be garbage before the
    /// background GC task rewrites it (spec §4.4.5 default: 0.7).
    pub gc_discard_ratio: f64,
    /// Period between background value-log GC sweeps (spec §4.4.5
    /// default: every five minutes).
    pub gc_period: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            cache_size: 10_000,
            sync_writes: false,
            snapshot_interval: Duration::from_secs(600),
            wal_enabled: true,
            block_compression_enabled: true,
            gc_discard_ratio: 0.7,
            gc_period: Duration::from_secs(300),
        }
    }
}

/// Per-type counts reported by [`Database::stats`].
#[derive(Debug, Clone, serde::Serialize)]
pub struct TypeStats {
    pub entity_count: usize,
    pub indexed_field_count: usize,
    pub unique_field_count: usize,
}

/// A point-in-time health summary, useful for an embedding shell's health
/// endpoint (`SPEC_FULL.md` §C.1).
#[derive(Debug, Clone, serde::Serialize)]
pub struct DatabaseStats {
    pub types: BTreeMap<String, TypeStats>,
    pub last_snapshot_timestamp_ns: Option<u64>,
}

/// The embedded database: schema registry, entity store, query engine,
/// and background maintenance, all over one [`syncopate_storage::KvStore`].
pub struct Database {
    engine: Arc<Engine>,
    config: Config,
    snapshot_ticker: Mutex<Option<Ticker>>,
    gc_ticker: Mutex<Option<Ticker>>,
}

impl Database {
    /// Open (or create) a database at `config.data_dir`, run recovery, and
    /// start the background snapshot and GC timers.
    ///
    /// Inability to open the KV store or create the data directory is
    /// fatal, per spec §6's exit conditions.
    pub fn open(config: Config) -> Result<Self> {
        let store: Arc<dyn KvStore> = Arc::new(ValueLogStore::open(&config.data_dir, config.sync_writes)?);
        let codec: Arc<dyn StorageCodec> = Arc::from(codec_for(config.block_compression_enabled));
        let engine = Arc::new(Engine::open(store, codec, config.wal_enabled)?);

        let snapshot_ticker = {
            let engine = engine.clone();
            Ticker::spawn("syncopate-snapshot", config.snapshot_interval, move || {
                if let Err(err) = snapshot_now(&engine) {
                    tracing::error!(error = %err, "background snapshot failed");
                }
            })
        };

        let gc_ticker = {
            let engine = engine.clone();
            let discard_ratio = config.gc_discard_ratio;
            Ticker::spawn("syncopate-gc", config.gc_period, move || run_gc_pass(&engine, discard_ratio))
        };

        Ok(Self {
            engine,
            config,
            snapshot_ticker: Mutex::new(Some(snapshot_ticker)),
            gc_ticker: Mutex::new(Some(gc_ticker)),
        })
    }

    /// The configuration this database was opened with.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Register a new entity type (spec §4.1.1).
    pub fn register_type(
        &self,
        name: &str,
        id_generator: IdGeneratorKind,
        fields: Vec<FieldDefinition>,
    ) -> Result<EntityDefinition> {
        self.engine.register_type(name, id_generator, fields)?;
        self.engine.definition(name)
    }

    /// Evolve an existing type's schema (spec §4.1.2).
    pub fn update_type(
        &self,
        name: &str,
        id_generator: IdGeneratorKind,
        fields: Vec<FieldDefinition>,
    ) -> Result<EntityDefinition> {
        self.engine.update_type(name, id_generator, fields)?;
        self.engine.definition(name)
    }

    /// Insert a new entity (spec §4.1.3).
    pub fn insert(&self, entity_type: &str, id: Option<String>, fields: BTreeMap<String, Value>) -> Result<Entity> {
        self.engine.insert(entity_type, id, fields)
    }

    /// Apply a partial update to an existing entity (spec §4.1.3).
    pub fn update(&self, entity_type: &str, id: &str, partial: BTreeMap<String, Value>) -> Result<Entity> {
        self.engine.update(entity_type, id, partial)
    }

    /// Delete a single entity by id.
    pub fn delete(&self, entity_type: &str, id: &str) -> Result<()> {
        self.engine.delete(entity_type, id)
    }

    /// Delete every entity of a type, keeping its schema.
    pub fn truncate_type(&self, entity_type: &str) -> Result<()> {
        self.engine.truncate_type(entity_type)
    }

    /// Delete every entity of every type, keeping all schemas.
    pub fn truncate_all(&self) -> Result<()> {
        self.engine.truncate_all()
    }

    /// Fetch a single entity by id.
    pub fn get(&self, entity_type: &str, id: &str) -> Result<Entity> {
        self.engine.get(entity_type, id)
    }

    /// The registered names of every entity type.
    pub fn list_types(&self) -> Vec<String> {
        self.engine.list_types()
    }

    /// A type's current schema.
    pub fn definition(&self, entity_type: &str) -> Result<EntityDefinition> {
        self.engine.definition(entity_type)
    }

    /// Run a query: filter, fuzzy-match, sort, paginate, and join (spec §4.3).
    pub fn query(&self, options: &QueryOptions) -> Result<Page> {
        QueryEngine::new(&self.engine).execute(options)
    }

    /// A read-only summary of entity and index counts per type, plus the
    /// last snapshot's timestamp, for an embedding shell's health checks
    /// (`SPEC_FULL.md` §C.1).
    pub fn stats(&self) -> Result<DatabaseStats> {
        let mut types = BTreeMap::new();
        for name in self.engine.list_types() {
            let definition = self.engine.definition(&name)?;
            let entity_count = self.engine.get_count(&name)?;
            types.insert(
                name,
                TypeStats {
                    entity_count,
                    indexed_field_count: definition.indexed_fields().count(),
                    unique_field_count: definition.unique_fields().count(),
                },
            );
        }
        let reader = SnapshotReader::new(self.engine.store().as_ref(), self.engine.codec().as_ref());
        let last_snapshot_timestamp_ns = reader.latest_timestamp()?;
        Ok(DatabaseStats {
            types,
            last_snapshot_timestamp_ns,
        })
    }

    /// Write a snapshot now, outside the background timer
    /// (`SPEC_FULL.md` §C.2).
    pub fn flush(&self) -> Result<()> {
        snapshot_now(&self.engine)
    }

    /// Write a final snapshot under the writer lock, then close the KV
    /// store (spec §5 "Shutdown"). Stops the background timers first so
    /// they cannot race the final snapshot.
    pub fn close(self) -> Result<()> {
        if let Some(ticker) = self.snapshot_ticker.lock().take() {
            ticker.stop();
        }
        if let Some(ticker) = self.gc_ticker.lock().take() {
            ticker.stop();
        }
        let snapshot_result = snapshot_now(&self.engine);
        let close_result = self.engine.store().close();
        snapshot_result?;
        close_result
    }
}

/// Shared by the background timer and [`Database::flush`]: persist
/// counters, then write a point-in-time snapshot (spec §4.4.3).
fn snapshot_now(engine: &Engine) -> Result<()> {
    engine.persist_counters()?;
    let data = engine.snapshot_data();
    let timestamp_ns = now_ns();
    let writer = SnapshotWriter::new(engine.store().as_ref(), engine.codec().as_ref());
    writer.write(&data, timestamp_ns)
}

fn now_ns() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}

/// One GC pass; on success, a second pass after a short delay, per spec
/// §4.4.5. `Ok(false)` ("nothing to discard") and any error are swallowed
/// and logged, never propagated to the timer.
fn run_gc_pass(engine: &Engine, discard_ratio: f64) {
    match engine.store().value_log_gc(discard_ratio) {
        Ok(true) => {
            std::thread::sleep(Duration::from_millis(500));
            if let Err(err) = engine.store().value_log_gc(discard_ratio) {
                tracing::debug!(error = %err, "second-pass value-log gc skipped");
            }
        }
        Ok(false) => {}
        Err(err) => tracing::debug!(error = %err, "value-log gc skipped"),
    }
}

/// Open a database at `path` with otherwise-default configuration.
pub fn open<P: AsRef<Path>>(path: P) -> Result<Database> {
    Database::open(Config {
        data_dir: path.as_ref().to_path_buf(),
        ..Config::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use syncopate_core::field::FieldType;

    fn temp_db() -> Database {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(Config {
            data_dir: dir.path().to_path_buf(),
            snapshot_interval: Duration::from_secs(3600),
            gc_period: Duration::from_secs(3600),
            ..Config::default()
        })
        .unwrap();
        std::mem::forget(dir);
        db
    }

    #[test]
    fn insert_then_get_roundtrips() {
        let db = temp_db();
        db.register_type(
            "users",
            IdGeneratorKind::MonotonicInteger,
            vec![FieldDefinition::new("name", FieldType::String, true, false, false, false, false)],
        )
        .unwrap();
        let mut fields = BTreeMap::new();
        fields.insert("name".to_string(), Value::String("ada".into()));
        let created = db.insert("users", None, fields).unwrap();
        let fetched = db.get("users", &created.id).unwrap();
        assert_eq!(fetched.fields["name"], Value::String("ada".into()));
    }

    #[test]
    fn flush_then_reopen_recovers_entities() {
        let dir = tempfile::tempdir().unwrap();
        let created_id;
        {
            let db = Database::open(Config {
                data_dir: dir.path().to_path_buf(),
                snapshot_interval: Duration::from_secs(3600),
                gc_period: Duration::from_secs(3600),
                ..Config::default()
            })
            .unwrap();
            db.register_type("users", IdGeneratorKind::MonotonicInteger, vec![]).unwrap();
            let created = db.insert("users", None, BTreeMap::new()).unwrap();
            created_id = created.id;
            db.flush().unwrap();
            db.close().unwrap();
        }
        let reopened = Database::open(Config {
            data_dir: dir.path().to_path_buf(),
            snapshot_interval: Duration::from_secs(3600),
            gc_period: Duration::from_secs(3600),
            ..Config::default()
        })
        .unwrap();
        assert!(reopened.get("users", &created_id).is_ok());
    }

    #[test]
    fn stats_reports_entity_and_index_counts() {
        let db = temp_db();
        db.register_type(
            "users",
            IdGeneratorKind::MonotonicInteger,
            vec![FieldDefinition::new("name", FieldType::String, true, false, false, false, false)],
        )
        .unwrap();
        db.insert("users", None, BTreeMap::new()).unwrap();
        let stats = db.stats().unwrap();
        assert_eq!(stats.types["users"].entity_count, 1);
        assert_eq!(stats.types["users"].indexed_field_count, 1);
    }

    #[test]
    fn query_filters_through_the_facade() {
        let db = temp_db();
        db.register_type(
            "users",
            IdGeneratorKind::MonotonicInteger,
            vec![FieldDefinition::new("name", FieldType::String, true, true, false, false, false)],
        )
        .unwrap();
        let mut fields = BTreeMap::new();
        fields.insert("name".to_string(), Value::String("ada".into()));
        db.insert("users", None, fields).unwrap();

        let options = QueryOptions {
            entity_type: "users".to_string(),
            filters: vec![Filter::new("name", FilterOperator::Eq, Value::String("ada".into()))],
            ..Default::default()
        };
        let page = db.query(&options).unwrap();
        assert_eq!(page.count, 1);
    }
}
