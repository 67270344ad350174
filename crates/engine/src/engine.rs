//! [`Engine`] — the schema registry and single-writer data engine (spec §4.1).
//!
//! Every mutating operation follows the rollback discipline documented in
//! `syncopate_concurrency`: mutate the in-memory state under the writer
//! lock, release it, append to the WAL, and on failure reacquire the lock
//! to undo the mutation exactly.

use crate::index::{PrimaryIndex, UniqueIndex};
use crate::migration;
use crate::type_state::TypeState;
use crate::validation::validate_fields;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use syncopate_concurrency::GuardedState;
use syncopate_core::definition::{EntityDefinition, IdGeneratorKind};
use syncopate_core::entity::Entity;
use syncopate_core::error::{Error, Result};
use syncopate_core::field::FieldDefinition;
use syncopate_core::value::Value;
use syncopate_core::{CREATED_AT_FIELD, UPDATED_AT_FIELD};
use syncopate_durability::{
    load_counter, load_tombstones, store_counter, store_tombstones, OpCode, RecoveryCoordinator,
    SnapshotData, TypeSnapshot, WalWriter,
};
use syncopate_idgen::monotonic::MonotonicGenerator;
use syncopate_idgen::GeneratorState;
use syncopate_storage::{KvStore, StorageCodec};

#[derive(Default)]
struct EngineState {
    types: HashMap<String, TypeState>,
}

type RollbackBox = Box<dyn FnOnce(&mut EngineState) + Send>;

fn noop_undo() -> RollbackBox {
    Box::new(|_| {})
}

/// The schema registry, entity store, and index maintainer for every
/// registered type, backed by a [`WalWriter`] for durability.
pub struct Engine {
    state: GuardedState<EngineState>,
    store: Arc<dyn KvStore>,
    codec: Arc<dyn StorageCodec>,
    wal: WalWriter,
}

impl Engine {
    /// Recover from the latest snapshot and WAL, then build the live
    /// engine state (spec §4.4.4).
    pub fn open(store: Arc<dyn KvStore>, codec: Arc<dyn StorageCodec>, wal_enabled: bool) -> Result<Self> {
        let coordinator = RecoveryCoordinator::new(store.as_ref(), codec.as_ref());
        let (recovered, stats) = coordinator.recover();

        for err in &stats.errors {
            tracing::warn!(error = %err, "recovery skipped a record");
        }
        if stats.skipped_incomplete_transactions > 0 {
            tracing::warn!(
                count = stats.skipped_incomplete_transactions,
                "recovery skipped incomplete transactions"
            );
        }
        tracing::info!(
            applied = stats.applied_entries,
            types = recovered.types.len(),
            from_snapshot = stats.restored_from_snapshot,
            "recovery complete"
        );

        let mut types = HashMap::new();
        for (name, recovered_type) in recovered.types {
            let Some(definition) = recovered_type.definition else {
                tracing::warn!(entity_type = %name, "recovered entities with no schema, dropping");
                continue;
            };
            let generator = match definition.id_generator {
                IdGeneratorKind::MonotonicInteger => {
                    let counter = load_counter(store.as_ref(), &name)?;
                    let tombstones = load_tombstones(store.as_ref(), codec.as_ref(), &name)?;
                    let highest = recovered_type
                        .entities
                        .keys()
                        .filter_map(|id| id.parse::<u64>().ok())
                        .fold(counter, u64::max);
                    GeneratorState::MonotonicInteger(MonotonicGenerator::restore(highest, tombstones))
                }
                other => GeneratorState::new(other),
            };
            types.insert(
                name,
                TypeState::rebuild(definition, recovered_type.entities, generator),
            );
        }

        let wal = WalWriter::new(store.clone(), codec.clone(), wal_enabled, recovered.highest_sequence);

        Ok(Self {
            state: GuardedState::new(EngineState { types }),
            store,
            codec,
            wal,
        })
    }

    /// Register a new entity type (spec §3, §4.1).
    pub fn register_type(
        &self,
        name: &str,
        id_generator: IdGeneratorKind,
        fields: Vec<FieldDefinition>,
    ) -> Result<()> {
        for f in &fields {
            if !f.internal && f.name.starts_with('_') {
                return Err(Error::ReservedFieldName(f.name.clone()));
            }
        }
        let definition = EntityDefinition::new(name, id_generator, fields);
        let name_owned = name.to_string();
        let definition_for_persist = definition.clone();

        let inner = self.state.mutate_with_rollback(
            |state| -> (Result<()>, RollbackBox) {
                if state.types.contains_key(&name_owned) {
                    return (Err(Error::TypeExists(name_owned.clone())), noop_undo());
                }
                state.types.insert(
                    name_owned.clone(),
                    TypeState::new(definition.clone(), GeneratorState::new(id_generator)),
                );
                let undo_name = name_owned.clone();
                let undo: RollbackBox = Box::new(move |state| {
                    state.types.remove(&undo_name);
                });
                (Ok(()), undo)
            },
            |out: &Result<()>| match out {
                Ok(()) => self
                    .wal
                    .append(OpCode::RegisterType, name, "", &definition_for_persist)
                    .map(|_| ()),
                Err(e) => Err(e.clone()),
            },
        )?;
        inner
    }

    /// Evolve a registered type's schema (spec §4.1.2).
    pub fn update_type(
        &self,
        name: &str,
        id_generator: IdGeneratorKind,
        fields: Vec<FieldDefinition>,
    ) -> Result<()> {
        let inner = self.state.mutate_with_rollback(
            |state| -> (Result<EntityDefinition>, RollbackBox) {
                let type_state = match state.types.get_mut(name) {
                    Some(t) => t,
                    None => return (Err(Error::TypeNotFound(name.to_string())), noop_undo()),
                };

                let new_definition = match migration::plan(&type_state.definition, id_generator, fields) {
                    Ok(d) => d,
                    Err(e) => return (Err(e), noop_undo()),
                };

                let old_definition = type_state.definition.clone();
                let mut new_primary: HashMap<String, PrimaryIndex> = HashMap::new();
                let mut new_unique: HashMap<String, UniqueIndex> = HashMap::new();
                for f in new_definition.indexed_fields() {
                    new_primary.insert(f.name.clone(), type_state.primary.remove(&f.name).unwrap_or_default());
                }
                for f in new_definition.unique_fields() {
                    new_unique.insert(f.name.clone(), type_state.unique.remove(&f.name).unwrap_or_default());
                }
                for f in new_definition.indexed_fields() {
                    let was_indexed = old_definition.field(&f.name).map(|o| o.indexed).unwrap_or(false);
                    if !was_indexed {
                        let index = new_primary.get_mut(&f.name).expect("just inserted");
                        for entity in type_state.entities.values() {
                            if let Some(v) = entity.fields.get(&f.name) {
                                index.insert(v, &entity.id);
                            }
                        }
                    }
                }
                for f in new_definition.unique_fields() {
                    let was_unique = old_definition.field(&f.name).map(|o| o.unique).unwrap_or(false);
                    if !was_unique {
                        let index = new_unique.get_mut(&f.name).expect("just inserted");
                        for entity in type_state.entities.values() {
                            if let Some(v) = entity.fields.get(&f.name) {
                                index.insert(v, &entity.id);
                            }
                        }
                    }
                }

                let old_primary = std::mem::replace(&mut type_state.primary, new_primary);
                let old_unique = std::mem::replace(&mut type_state.unique, new_unique);
                type_state.definition = new_definition.clone();

                let undo_name = name.to_string();
                let undo: RollbackBox = Box::new(move |state| {
                    if let Some(t) = state.types.get_mut(&undo_name) {
                        t.definition = old_definition;
                        t.primary = old_primary;
                        t.unique = old_unique;
                    }
                });

                (Ok(new_definition), undo)
            },
            |out: &Result<EntityDefinition>| match out {
                Ok(definition) => self.wal.append(OpCode::UpdateType, name, "", definition).map(|_| ()),
                Err(e) => Err(e.clone()),
            },
        )?;
        inner.map(|_| ())
    }

    /// Insert a new entity (spec §4.1.3).
    pub fn insert(&self, entity_type: &str, id: Option<String>, fields: BTreeMap<String, Value>) -> Result<Entity> {
        let inner = self.state.mutate_with_rollback(
            |state| -> (Result<(Entity, Entity)>, RollbackBox) {
                let type_state = match state.types.get_mut(entity_type) {
                    Some(t) => t,
                    None => return (Err(Error::TypeNotFound(entity_type.to_string())), noop_undo()),
                };

                if let Err(e) = validate_fields(&type_state.definition, &fields, true) {
                    return (Err(e), noop_undo());
                }

                let resolved_id = match &id {
                    Some(given) => {
                        if let Err(e) = type_state.generator.validate(given) {
                            return (Err(e), noop_undo());
                        }
                        if type_state.entities.contains_key(given) {
                            return (
                                Err(Error::EntityExists {
                                    entity_type: entity_type.to_string(),
                                    id: given.clone(),
                                }),
                                noop_undo(),
                            );
                        }
                        given.clone()
                    }
                    None => match type_state.generator.generate() {
                        Ok(new_id) => new_id,
                        Err(e) => return (Err(e), noop_undo()),
                    },
                };

                if let GeneratorState::MonotonicInteger(ref gen) = type_state.generator {
                    if let Ok(n) = resolved_id.parse::<u64>() {
                        gen.raise_to(n);
                    }
                }

                for (field_name, index) in type_state.unique.iter() {
                    if let Some(value) = fields.get(field_name) {
                        if let Some(owner) = index.owner(value) {
                            if owner != resolved_id {
                                return (
                                    Err(Error::UniqueViolation {
                                        field: field_name.clone(),
                                        owner: owner.to_string(),
                                    }),
                                    noop_undo(),
                                );
                            }
                        }
                    }
                }

                let now = Value::DateTime(Utc::now());
                let mut stamped = fields;
                stamped.insert(CREATED_AT_FIELD.to_string(), now.clone());
                stamped.insert(UPDATED_AT_FIELD.to_string(), now);

                let mut entity = Entity::new(resolved_id.clone(), entity_type.to_string());
                entity.fields = stamped;
                type_state.index_entity(&entity);
                type_state.entities.insert(resolved_id.clone(), entity.clone());

                let undo_type = entity_type.to_string();
                let undo_entity = entity.clone();
                let undo: RollbackBox = Box::new(move |state| {
                    if let Some(t) = state.types.get_mut(&undo_type) {
                        t.unindex_entity(&undo_entity);
                        t.entities.remove(&undo_entity.id);
                    }
                });

                (Ok((entity.clone(), entity)), undo)
            },
            |out: &Result<(Entity, Entity)>| match out {
                Ok((_, persisted)) => self
                    .wal
                    .append(OpCode::Insert, entity_type, &persisted.id, persisted)
                    .map(|_| ()),
                Err(e) => Err(e.clone()),
            },
        )?;
        inner.map(|(entity, _)| entity)
    }

    /// Apply a partial update to an existing entity (spec §4.1.3).
    pub fn update(&self, entity_type: &str, id: &str, partial: BTreeMap<String, Value>) -> Result<Entity> {
        let inner = self.state.mutate_with_rollback(
            |state| -> (Result<(Entity, BTreeMap<String, Value>)>, RollbackBox) {
                let type_state = match state.types.get_mut(entity_type) {
                    Some(t) => t,
                    None => return (Err(Error::TypeNotFound(entity_type.to_string())), noop_undo()),
                };

                if let Err(e) = validate_fields(&type_state.definition, &partial, false) {
                    return (Err(e), noop_undo());
                }

                let old_entity = match type_state.entities.get(id) {
                    Some(e) => e.clone(),
                    None => {
                        return (
                            Err(Error::EntityNotFound {
                                entity_type: entity_type.to_string(),
                                id: id.to_string(),
                            }),
                            noop_undo(),
                        )
                    }
                };

                let mut payload = partial;
                payload.insert(UPDATED_AT_FIELD.to_string(), Value::DateTime(Utc::now()));

                for (field_name, value) in &payload {
                    if let Some(index) = type_state.unique.get(field_name) {
                        if let Some(owner) = index.owner(value) {
                            if owner != id {
                                return (
                                    Err(Error::UniqueViolation {
                                        field: field_name.clone(),
                                        owner: owner.to_string(),
                                    }),
                                    noop_undo(),
                                );
                            }
                        }
                    }
                }

                let mut new_entity = old_entity.clone();
                let changed = new_entity.merge(payload.clone());
                type_state.reindex_changed_fields(id, &old_entity, &new_entity, &changed);
                type_state.entities.insert(id.to_string(), new_entity.clone());

                let undo_type = entity_type.to_string();
                let undo_id = id.to_string();
                let undo_old = old_entity;
                let undo_new = new_entity.clone();
                let undo_changed = changed;
                let undo: RollbackBox = Box::new(move |state| {
                    if let Some(t) = state.types.get_mut(&undo_type) {
                        t.reindex_changed_fields(&undo_id, &undo_new, &undo_old, &undo_changed);
                        t.entities.insert(undo_id.clone(), undo_old);
                    }
                });

                (Ok((new_entity, payload)), undo)
            },
            |out: &Result<(Entity, BTreeMap<String, Value>)>| match out {
                Ok((_, payload)) => self.wal.append(OpCode::Update, entity_type, id, payload).map(|_| ()),
                Err(e) => Err(e.clone()),
            },
        )?;
        inner.map(|(entity, _)| entity)
    }

    /// Delete an entity (spec §4.1.3). The type and id bucket lookup below
    /// *is* the `(type, id)` addressing spec §3 describes as a composite
    /// key — see DESIGN.md for why no separate `"type:id"` string or
    /// flat-key migration exists in this layout.
    pub fn delete(&self, entity_type: &str, id: &str) -> Result<()> {
        let inner = self.state.mutate_with_rollback(
            |state| -> (Result<()>, RollbackBox) {
                let type_state = match state.types.get_mut(entity_type) {
                    Some(t) => t,
                    None => return (Err(Error::TypeNotFound(entity_type.to_string())), noop_undo()),
                };
                let entity = match type_state.entities.remove(id) {
                    Some(e) => e,
                    None => {
                        return (
                            Err(Error::EntityNotFound {
                                entity_type: entity_type.to_string(),
                                id: id.to_string(),
                            }),
                            noop_undo(),
                        )
                    }
                };
                type_state.unindex_entity(&entity);

                if let GeneratorState::MonotonicInteger(ref gen) = type_state.generator {
                    if let Ok(n) = id.parse::<u64>() {
                        gen.tombstone(n);
                    }
                }

                let undo_type = entity_type.to_string();
                let undo_entity = entity;
                let undo: RollbackBox = Box::new(move |state| {
                    if let Some(t) = state.types.get_mut(&undo_type) {
                        t.index_entity(&undo_entity);
                        t.entities.insert(undo_entity.id.clone(), undo_entity.clone());
                    }
                });
                (Ok(()), undo)
            },
            |out: &Result<()>| match out {
                Ok(()) => self.wal.append(OpCode::Delete, entity_type, id, &()).map(|_| ()),
                Err(e) => Err(e.clone()),
            },
        )?;
        inner
    }

    /// Remove every entity of one type, keeping its schema (spec §4.1.3).
    pub fn truncate_type(&self, entity_type: &str) -> Result<()> {
        let inner = self.state.mutate_with_rollback(
            |state| -> (Result<()>, RollbackBox) {
                let type_state = match state.types.get_mut(entity_type) {
                    Some(t) => t,
                    None => return (Err(Error::TypeNotFound(entity_type.to_string())), noop_undo()),
                };
                let removed: Vec<Entity> = type_state.entities.values().cloned().collect();
                for e in &removed {
                    type_state.unindex_entity(e);
                }
                type_state.entities.clear();

                let undo_type = entity_type.to_string();
                let undo_removed = removed;
                let undo: RollbackBox = Box::new(move |state| {
                    if let Some(t) = state.types.get_mut(&undo_type) {
                        for e in &undo_removed {
                            t.index_entity(e);
                            t.entities.insert(e.id.clone(), e.clone());
                        }
                    }
                });
                (Ok(()), undo)
            },
            |out: &Result<()>| match out {
                Ok(()) => self.wal.append(OpCode::TruncateType, entity_type, "", &()).map(|_| ()),
                Err(e) => Err(e.clone()),
            },
        )?;
        inner
    }

    /// Remove every entity of every type, keeping every schema.
    pub fn truncate_all(&self) -> Result<()> {
        let inner = self.state.mutate_with_rollback(
            |state| -> (Result<()>, RollbackBox) {
                let mut removed: HashMap<String, Vec<Entity>> = HashMap::new();
                for (name, type_state) in state.types.iter_mut() {
                    let entities: Vec<Entity> = type_state.entities.values().cloned().collect();
                    for e in &entities {
                        type_state.unindex_entity(e);
                    }
                    type_state.entities.clear();
                    removed.insert(name.clone(), entities);
                }
                let undo: RollbackBox = Box::new(move |state| {
                    for (name, entities) in removed {
                        if let Some(t) = state.types.get_mut(&name) {
                            for e in &entities {
                                t.index_entity(e);
                                t.entities.insert(e.id.clone(), e.clone());
                            }
                        }
                    }
                });
                (Ok(()), undo)
            },
            |out: &Result<()>| match out {
                Ok(()) => self.wal.append(OpCode::TruncateAll, "", "", &()).map(|_| ()),
                Err(e) => Err(e.clone()),
            },
        )?;
        inner
    }

    /// Fetch a single entity.
    pub fn get(&self, entity_type: &str, id: &str) -> Result<Entity> {
        self.state.read_with(|state| {
            let type_state = state
                .types
                .get(entity_type)
                .ok_or_else(|| Error::TypeNotFound(entity_type.to_string()))?;
            type_state.entities.get(id).cloned().ok_or_else(|| Error::EntityNotFound {
                entity_type: entity_type.to_string(),
                id: id.to_string(),
            })
        })
    }

    /// Number of live entities of one type.
    pub fn get_count(&self, entity_type: &str) -> Result<usize> {
        self.state.read_with(|state| {
            state
                .types
                .get(entity_type)
                .map(|t| t.entities.len())
                .ok_or_else(|| Error::TypeNotFound(entity_type.to_string()))
        })
    }

    /// Every live entity of one type, in id order.
    pub fn list_of_type(&self, entity_type: &str) -> Result<Vec<Entity>> {
        self.state.read_with(|state| {
            state
                .types
                .get(entity_type)
                .map(|t| t.entities.values().cloned().collect())
                .ok_or_else(|| Error::TypeNotFound(entity_type.to_string()))
        })
    }

    /// Every registered type name.
    pub fn list_types(&self) -> Vec<String> {
        self.state.read_with(|state| state.types.keys().cloned().collect())
    }

    /// A registered type's current schema.
    pub fn definition(&self, entity_type: &str) -> Result<EntityDefinition> {
        self.state.read_with(|state| {
            state
                .types
                .get(entity_type)
                .map(|t| t.definition.clone())
                .ok_or_else(|| Error::TypeNotFound(entity_type.to_string()))
        })
    }

    /// True if `field` carries a primary index bucket on `entity_type`
    /// (spec §4.3: equality filters on indexed fields intersect with the
    /// bucket instead of scanning).
    pub fn is_indexed(&self, entity_type: &str, field: &str) -> Result<bool> {
        self.state.read_with(|state| {
            let type_state = state
                .types
                .get(entity_type)
                .ok_or_else(|| Error::TypeNotFound(entity_type.to_string()))?;
            Ok(type_state.primary.contains_key(field))
        })
    }

    /// Every id sharing `value`'s bucket in `field`'s primary index.
    /// `None` means `field` is not indexed; `Some(empty set)` means indexed
    /// but nothing currently holds that value.
    pub fn primary_index_lookup(
        &self,
        entity_type: &str,
        field: &str,
        value: &Value,
    ) -> Result<Option<HashSet<String>>> {
        self.state.read_with(|state| {
            let type_state = state
                .types
                .get(entity_type)
                .ok_or_else(|| Error::TypeNotFound(entity_type.to_string()))?;
            Ok(type_state
                .primary
                .get(field)
                .map(|idx| idx.lookup(value).cloned().unwrap_or_default()))
        })
    }

    /// Point-in-time copy of the full database for a snapshot write,
    /// taken under the reader lock (spec §9, decision a).
    pub fn snapshot_data(&self) -> SnapshotData {
        self.state.read_with(|state| SnapshotData {
            types: state
                .types
                .values()
                .map(|t| TypeSnapshot {
                    definition: t.definition.clone(),
                    entities: t.entities.values().cloned().collect(),
                })
                .collect(),
        })
    }

    /// Persist every type's monotonic counter and tombstone set, run
    /// before a snapshot so a subsequent restart never reissues an id.
    pub fn persist_counters(&self) -> Result<()> {
        self.state.read_with(|state| {
            for (name, type_state) in state.types.iter() {
                if let GeneratorState::MonotonicInteger(ref gen) = type_state.generator {
                    store_counter(self.store.as_ref(), name, gen.counter_value())?;
                    store_tombstones(self.store.as_ref(), self.codec.as_ref(), name, &gen.tombstone_snapshot())?;
                }
            }
            Ok(())
        })
    }

    /// The underlying KV store, for the background maintenance tasks
    /// (snapshot timer, value-log GC) the root crate schedules.
    pub fn store(&self) -> &Arc<dyn KvStore> {
        &self.store
    }

    /// The codec snapshots and WAL entries are encoded with.
    pub fn codec(&self) -> &Arc<dyn StorageCodec> {
        &self.codec
    }
}
