//! [`TypeState`] — one registered type's live schema, entities, indices,
//! and id generator, all protected together by the engine's single lock.

use crate::index::{PrimaryIndex, UniqueIndex};
use std::collections::{BTreeMap, HashMap};
use syncopate_core::definition::EntityDefinition;
use syncopate_core::entity::Entity;
use syncopate_idgen::GeneratorState;

/// Everything the engine keeps for one registered type.
pub struct TypeState {
    /// Current schema.
    pub definition: EntityDefinition,
    /// Live entities keyed by id.
    pub entities: BTreeMap<String, Entity>,
    /// One [`PrimaryIndex`] per field flagged `indexed`.
    pub primary: HashMap<String, PrimaryIndex>,
    /// One [`UniqueIndex`] per field flagged `unique`.
    pub unique: HashMap<String, UniqueIndex>,
    /// This type's id generator state.
    pub generator: GeneratorState,
}

impl TypeState {
    /// Build a fresh, empty state for a newly-registered type.
    pub fn new(definition: EntityDefinition, generator: GeneratorState) -> Self {
        let primary = definition
            .indexed_fields()
            .map(|f| (f.name.clone(), PrimaryIndex::default()))
            .collect();
        let unique = definition
            .unique_fields()
            .map(|f| (f.name.clone(), UniqueIndex::default()))
            .collect();
        Self {
            definition,
            entities: BTreeMap::new(),
            primary,
            unique,
            generator,
        }
    }

    /// Rebuild a state from entities recovered from a snapshot/WAL replay,
    /// reindexing every entity from scratch.
    pub fn rebuild(
        definition: EntityDefinition,
        entities: BTreeMap<String, Entity>,
        generator: GeneratorState,
    ) -> Self {
        let mut state = Self::new(definition, generator);
        for entity in entities.values() {
            state.index_entity(entity);
        }
        state.entities = entities;
        state
    }

    /// Add `entity`'s indexed/unique field values to this type's indices.
    pub fn index_entity(&mut self, entity: &Entity) {
        for (field_name, index) in self.primary.iter_mut() {
            if let Some(value) = entity.fields.get(field_name) {
                index.insert(value, &entity.id);
            }
        }
        for (field_name, index) in self.unique.iter_mut() {
            if let Some(value) = entity.fields.get(field_name) {
                index.insert(value, &entity.id);
            }
        }
    }

    /// Remove `entity`'s indexed/unique field values from this type's
    /// indices — the exact inverse of [`TypeState::index_entity`].
    pub fn unindex_entity(&mut self, entity: &Entity) {
        for (field_name, index) in self.primary.iter_mut() {
            if let Some(value) = entity.fields.get(field_name) {
                index.remove(value, &entity.id);
            }
        }
        for (field_name, index) in self.unique.iter_mut() {
            if let Some(value) = entity.fields.get(field_name) {
                index.remove(value);
            }
        }
    }

    /// Synchronize indices after a field update: unindex the old values,
    /// index the new ones, for only the fields that actually changed.
    pub fn reindex_changed_fields(&mut self, id: &str, old: &Entity, new: &Entity, changed: &[String]) {
        for field_name in changed {
            if let Some(index) = self.primary.get_mut(field_name) {
                if let Some(old_value) = old.fields.get(field_name) {
                    index.remove(old_value, id);
                }
                if let Some(new_value) = new.fields.get(field_name) {
                    index.insert(new_value, id);
                }
            }
            if let Some(index) = self.unique.get_mut(field_name) {
                if old.fields.get(field_name).is_some() {
                    index.remove(old.fields.get(field_name).unwrap());
                }
                if let Some(new_value) = new.fields.get(field_name) {
                    index.insert(new_value, id);
                }
            }
        }
    }
}
