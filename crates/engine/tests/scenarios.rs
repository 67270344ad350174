//! Cross-module end-to-end scenarios from spec §8's "Concrete end-to-end
//! scenarios" list, exercising the engine over a real on-disk store.

use std::collections::BTreeMap;
use std::sync::Arc;
use syncopate_core::definition::IdGeneratorKind;
use syncopate_core::error::Error;
use syncopate_core::field::{FieldDefinition, FieldType};
use syncopate_core::value::Value;
use syncopate_engine::Engine;
use syncopate_storage::{codec_for, KvStore, StorageCodec, ValueLogStore};

fn open(dir: &std::path::Path) -> Engine {
    let store: Arc<dyn KvStore> = Arc::new(ValueLogStore::open(dir, false).unwrap());
    let codec: Arc<dyn StorageCodec> = Arc::from(codec_for(false));
    Engine::open(store, codec, true).unwrap()
}

fn name_field() -> Vec<FieldDefinition> {
    vec![FieldDefinition::new("name", FieldType::String, false, false, false, false, false)]
}

#[test]
fn auto_id_insertion_assigns_sequential_ids() {
    let dir = tempfile::tempdir().unwrap();
    let engine = open(dir.path());
    engine.register_type("users", IdGeneratorKind::MonotonicInteger, name_field()).unwrap();

    let mut ids = Vec::new();
    for name in ["Alice", "Bob", "Charlie"] {
        let mut fields = BTreeMap::new();
        fields.insert("name".to_string(), Value::String(name.to_string()));
        ids.push(engine.insert("users", None, fields).unwrap().id);
    }

    assert_eq!(ids, vec!["1", "2", "3"]);
    assert_eq!(engine.get_count("users").unwrap(), 3);
}

#[test]
fn tombstoned_id_is_never_reused() {
    let dir = tempfile::tempdir().unwrap();
    let engine = open(dir.path());
    engine.register_type("users", IdGeneratorKind::MonotonicInteger, name_field()).unwrap();

    let mut first_three = Vec::new();
    for _ in 0..3 {
        first_three.push(engine.insert("users", None, BTreeMap::new()).unwrap().id);
    }
    engine.delete("users", &first_three[1]).unwrap();

    let fourth = engine.insert("users", None, BTreeMap::new()).unwrap();
    assert_eq!(fourth.id, "4");
}

#[test]
fn crash_recovery_replays_snapshot_and_wal_tail() {
    use syncopate_durability::SnapshotWriter;

    let dir = tempfile::tempdir().unwrap();
    let store: Arc<dyn KvStore> = Arc::new(ValueLogStore::open(dir.path(), false).unwrap());
    let codec: Arc<dyn StorageCodec> = Arc::from(codec_for(false));
    let engine = Engine::open(store.clone(), codec.clone(), true).unwrap();
    engine.register_type("users", IdGeneratorKind::MonotonicInteger, name_field()).unwrap();

    for i in 0..5 {
        let mut fields = BTreeMap::new();
        fields.insert("name".to_string(), Value::String(format!("user-{i}")));
        engine.insert("users", None, fields).unwrap();
    }

    engine.persist_counters().unwrap();
    let data = engine.snapshot_data();
    SnapshotWriter::new(store.as_ref(), codec.as_ref()).write(&data, 1_000).unwrap();

    for i in 5..7 {
        let mut fields = BTreeMap::new();
        fields.insert("name".to_string(), Value::String(format!("user-{i}")));
        engine.insert("users", None, fields).unwrap();
    }
    drop(engine);

    let reopened = Engine::open(store, codec, true).unwrap();
    assert_eq!(reopened.get_count("users").unwrap(), 7);
    for i in 1..=7 {
        let entity = reopened.get("users", &i.to_string()).unwrap();
        assert!(entity.fields.contains_key("name"));
    }
}

#[test]
fn unique_violation_leaves_count_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    let engine = open(dir.path());
    engine
        .register_type(
            "users",
            IdGeneratorKind::MonotonicInteger,
            vec![
                FieldDefinition::new("name", FieldType::String, false, false, false, false, false),
                FieldDefinition::new("email", FieldType::String, false, false, false, true, false),
            ],
        )
        .unwrap();

    let mut a = BTreeMap::new();
    a.insert("name".to_string(), Value::String("A".into()));
    a.insert("email".to_string(), Value::String("a@x".into()));
    engine.insert("users", None, a).unwrap();

    let mut b = BTreeMap::new();
    b.insert("name".to_string(), Value::String("B".into()));
    b.insert("email".to_string(), Value::String("a@x".into()));
    let result = engine.insert("users", None, b);

    assert!(matches!(result, Err(Error::UniqueViolation { .. })));
    assert_eq!(engine.get_count("users").unwrap(), 1);
}
