use std::cmp::Ordering;
use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::database::collection::Collection;
use crate::database::manager::DatabaseError;
use crate::database::query::{Condition, DocQuery, FilterOp, SortDirection, SortKey, SortKind};
use crate::database::store::DocumentStore;

/// In-memory document store for development and tests.
///
/// Documents are kept in insertion order per collection so ordering ties
/// resolve the same way the postgres backend resolves them.
#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<Collection, Vec<(Uuid, Value)>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn check_unique(
        collection: Collection,
        docs: &[(Uuid, Value)],
        id: Uuid,
        document: &Value,
    ) -> Result<(), DatabaseError> {
        for field in collection.unique_fields() {
            let Some(value) = document.get(*field).filter(|v| !v.is_null()) else {
                continue;
            };
            let clash = docs
                .iter()
                .any(|(other_id, other)| *other_id != id && other.get(*field) == Some(value));
            if clash {
                return Err(DatabaseError::Duplicate {
                    collection: collection.to_string(),
                    field: field.to_string(),
                });
            }
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn insert(&self, collection: Collection, id: Uuid, document: Value) -> Result<(), DatabaseError> {
        let mut collections = self.collections.write().await;
        let docs = collections.entry(collection).or_default();

        if docs.iter().any(|(existing, _)| *existing == id) {
            return Err(DatabaseError::Duplicate {
                collection: collection.to_string(),
                field: "id".to_string(),
            });
        }
        Self::check_unique(collection, docs, id, &document)?;

        docs.push((id, document));
        debug!("Inserted {} into {}", id, collection);
        Ok(())
    }

    async fn get(&self, collection: Collection, id: Uuid) -> Result<Option<Value>, DatabaseError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(&collection)
            .and_then(|docs| docs.iter().find(|(doc_id, _)| *doc_id == id))
            .map(|(_, doc)| doc.clone()))
    }

    async fn find(&self, collection: Collection, query: &DocQuery) -> Result<Vec<Value>, DatabaseError> {
        let collections = self.collections.read().await;
        let Some(docs) = collections.get(&collection) else {
            return Ok(Vec::new());
        };

        let mut found: Vec<&Value> = docs
            .iter()
            .map(|(_, doc)| doc)
            .filter(|doc| query.conditions.iter().all(|c| matches_condition(doc, c)))
            .collect();

        // Stable sort keeps insertion order for ties
        if !query.order.is_empty() {
            found.sort_by(|a, b| compare_documents(a, b, &query.order));
        }

        let offset = query.offset.unwrap_or(0) as usize;
        let limit = query.limit.map(|l| l as usize).unwrap_or(usize::MAX);

        Ok(found.into_iter().skip(offset).take(limit).cloned().collect())
    }

    async fn count(&self, collection: Collection, query: &DocQuery) -> Result<u64, DatabaseError> {
        let collections = self.collections.read().await;
        let count = collections
            .get(&collection)
            .map(|docs| {
                docs.iter()
                    .filter(|(_, doc)| query.conditions.iter().all(|c| matches_condition(doc, c)))
                    .count()
            })
            .unwrap_or(0);
        Ok(count as u64)
    }

    async fn replace(&self, collection: Collection, id: Uuid, document: Value) -> Result<bool, DatabaseError> {
        let mut collections = self.collections.write().await;
        let Some(docs) = collections.get_mut(&collection) else {
            return Ok(false);
        };
        Self::check_unique(collection, docs, id, &document)?;

        match docs.iter_mut().find(|(doc_id, _)| *doc_id == id) {
            Some(slot) => {
                slot.1 = document;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, collection: Collection, id: Uuid) -> Result<Option<Value>, DatabaseError> {
        let mut collections = self.collections.write().await;
        let Some(docs) = collections.get_mut(&collection) else {
            return Ok(None);
        };
        let position = docs.iter().position(|(doc_id, _)| *doc_id == id);
        Ok(position.map(|i| docs.remove(i).1))
    }

    async fn health_check(&self) -> Result<(), DatabaseError> {
        Ok(())
    }
}

/// jsonb `@>` semantics: objects match on a subset of keys, arrays when
/// every needle element is contained by some haystack element.
fn json_contains(haystack: &Value, needle: &Value) -> bool {
    match (haystack, needle) {
        (Value::Object(h), Value::Object(n)) => n
            .iter()
            .all(|(key, nv)| h.get(key).map(|hv| json_contains(hv, nv)).unwrap_or(false)),
        (Value::Array(h), Value::Array(n)) => n.iter().all(|nv| h.iter().any(|hv| json_contains(hv, nv))),
        (Value::Array(h), scalar) => h.iter().any(|hv| hv == scalar),
        _ => haystack == needle,
    }
}

fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    value
        .as_str()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

fn matches_condition(doc: &Value, condition: &Condition) -> bool {
    let field = doc.get(&condition.field);
    match condition.op {
        FilterOp::Eq => field == Some(&condition.value),
        FilterOp::In => {
            let current = field.unwrap_or(&Value::Null);
            condition
                .value
                .as_array()
                .map(|values| values.iter().any(|v| v == current))
                .unwrap_or(false)
        }
        FilterOp::Any => field
            .and_then(Value::as_array)
            .map(|items| items.iter().any(|item| json_contains(item, &condition.value)))
            .unwrap_or(false),
        FilterOp::Gte | FilterOp::Lte => {
            let (Some(current), Some(bound)) = (field.and_then(parse_timestamp), parse_timestamp(&condition.value)) else {
                return false;
            };
            if condition.op == FilterOp::Gte {
                current >= bound
            } else {
                current <= bound
            }
        }
    }
}

/// Missing values order last ascending and first descending, like postgres.
fn compare_optional<T: Ord>(a: Option<T>, b: Option<T>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn compare_documents(a: &Value, b: &Value, order: &[SortKey]) -> Ordering {
    for key in order {
        let (av, bv) = (a.get(&key.field), b.get(&key.field));
        let ordering = match key.kind {
            SortKind::Timestamp => compare_optional(av.and_then(parse_timestamp), bv.and_then(parse_timestamp)),
            SortKind::Text => compare_optional(
                av.filter(|v| !v.is_null()).map(text_key),
                bv.filter(|v| !v.is_null()).map(text_key),
            ),
        };
        let ordering = match key.direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

fn text_key(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
