//! [`QueryEngine`] — ties filtering, sorting, pagination, and joins
//! together into [`QueryEngine::execute`] (spec §4.3).

use crate::filter;
use crate::join;
use crate::options::{Filter, FilterOperator, JoinKind, Page, QueryOptions};
use crate::sort;
use std::collections::HashSet;
use syncopate_core::entity::Entity;
use syncopate_core::error::Result;
use syncopate_core::value::Value;
use syncopate_engine::Engine;

/// Runs [`QueryOptions`] against an [`Engine`]. Borrows the engine for the
/// duration of one call; holds no state of its own.
pub struct QueryEngine<'a> {
    engine: &'a Engine,
}

impl<'a> QueryEngine<'a> {
    /// Build a query engine over `engine`.
    pub fn new(engine: &'a Engine) -> Self {
        Self { engine }
    }

    /// Execute a query end to end, per the five-step order in spec §4.3:
    /// filter, sort, paginate, then join the surviving page.
    pub fn execute(&self, options: &QueryOptions) -> Result<Page> {
        let total_of_type = self.engine.get_count(&options.entity_type)?;
        let mut candidates = self.engine.list_of_type(&options.entity_type)?;

        for clause in &options.filters {
            candidates = self.apply_filter(&options.entity_type, candidates, clause)?;
        }

        if let Some(field) = &options.order_by {
            sort::sort_entities(&mut candidates, field, options.order_desc);
        }

        let matched = candidates.len();
        let offset = options.offset.min(matched);
        let windowed: Vec<Entity> = if options.limit == 0 {
            candidates.into_iter().skip(offset).collect()
        } else {
            candidates.into_iter().skip(offset).take(options.limit).collect()
        };
        let has_more = offset + windowed.len() < matched;

        let mut data = Vec::with_capacity(windowed.len());
        for entity in windowed {
            let mut projected = entity.fields.clone();
            projected.insert("id".to_string(), Value::String(entity.id.clone()));

            let mut dropped = false;
            for join_spec in &options.joins {
                match join::apply(self.engine, join_spec, &entity)? {
                    Some(value) => {
                        projected.insert(join_spec.result_field.clone(), value);
                    }
                    None if join_spec.kind == JoinKind::Inner => {
                        dropped = true;
                        break;
                    }
                    None => {}
                }
            }
            if !dropped {
                data.push(projected);
            }
        }

        Ok(Page {
            total_of_type,
            count: data.len(),
            limit: options.limit,
            offset: options.offset,
            has_more,
            entity_type: options.entity_type.clone(),
            data,
        })
    }

    /// Narrow `candidates` to those matching `clause`, using the primary
    /// index for equality filters on indexed fields (spec §4.3 step 2).
    fn apply_filter(&self, entity_type: &str, candidates: Vec<Entity>, clause: &Filter) -> Result<Vec<Entity>> {
        if clause.operator == FilterOperator::Eq && self.engine.is_indexed(entity_type, &clause.field)? {
            let bucket = self
                .engine
                .primary_index_lookup(entity_type, &clause.field, &clause.value)?
                .unwrap_or_default();
            let ids: HashSet<String> = bucket;
            return Ok(candidates.into_iter().filter(|e| ids.contains(&e.id)).collect());
        }
        Ok(filter::scan(candidates, clause))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::{Filter, FilterOperator as Op};
    use std::collections::BTreeMap;
    use std::sync::Arc;
    use syncopate_core::definition::IdGeneratorKind;
    use syncopate_core::field::{FieldDefinition, FieldType};
    use syncopate_storage::{codec_for, KvStore, StorageCodec, ValueLogStore};

    fn engine_with_users() -> Engine {
        let dir = tempfile::tempdir().unwrap();
        let store: Arc<dyn KvStore> = Arc::new(ValueLogStore::open(dir.path(), false).unwrap());
        let codec: Arc<dyn StorageCodec> = Arc::from(codec_for(false));
        std::mem::forget(dir);
        let engine = Engine::open(store, codec, true).unwrap();
        engine
            .register_type(
                "users",
                IdGeneratorKind::MonotonicInteger,
                vec![
                    FieldDefinition::new("name", FieldType::String, true, true, false, false, false),
                    FieldDefinition::new("age", FieldType::Integer, false, true, false, false, false),
                ],
            )
            .unwrap();
        for (name, age) in [("ada", 36), ("grace", 85), ("alan", 41)] {
            let mut fields = BTreeMap::new();
            fields.insert("name".to_string(), Value::String(name.into()));
            fields.insert("age".to_string(), Value::Integer(age));
            engine.insert("users", None, fields).unwrap();
        }
        engine
    }

    #[test]
    fn filters_indexed_field_by_equality() {
        let engine = engine_with_users();
        let qe = QueryEngine::new(&engine);
        let options = QueryOptions {
            entity_type: "users".to_string(),
            filters: vec![Filter::new("name", Op::Eq, Value::String("ada".into()))],
            ..Default::default()
        };
        let page = qe.execute(&options).unwrap();
        assert_eq!(page.count, 1);
        assert_eq!(page.data[0]["name"], Value::String("ada".into()));
    }

    #[test]
    fn orders_and_paginates() {
        let engine = engine_with_users();
        let qe = QueryEngine::new(&engine);
        let options = QueryOptions {
            entity_type: "users".to_string(),
            order_by: Some("age".to_string()),
            limit: 2,
            ..Default::default()
        };
        let page = qe.execute(&options).unwrap();
        assert_eq!(page.count, 2);
        assert_eq!(page.data[0]["age"], Value::Integer(36));
        assert_eq!(page.data[1]["age"], Value::Integer(41));
        assert!(page.has_more);
    }

    #[test]
    fn zero_limit_is_unlimited() {
        let engine = engine_with_users();
        let qe = QueryEngine::new(&engine);
        let options = QueryOptions {
            entity_type: "users".to_string(),
            ..Default::default()
        };
        let page = qe.execute(&options).unwrap();
        assert_eq!(page.count, 3);
        assert_eq!(page.total_of_type, 3);
        assert!(!page.has_more);
    }

    #[test]
    fn gt_filter_scans_unindexed_field() {
        let engine = engine_with_users();
        let qe = QueryEngine::new(&engine);
        let options = QueryOptions {
            entity_type: "users".to_string(),
            filters: vec![Filter::new("age", Op::Gt, Value::Integer(40))],
            ..Default::default()
        };
        let page = qe.execute(&options).unwrap();
        assert_eq!(page.count, 2);
    }
}
