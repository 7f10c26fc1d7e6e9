use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use crate::database::collection::Collection;
use crate::database::manager::DatabaseError;
use crate::database::query::DocQuery;

/// Schemaless persistence for JSON documents keyed by UUID.
///
/// Every document is a JSON object carrying its own `id`. Backends enforce
/// [`Collection::unique_fields`] and report violations as
/// [`DatabaseError::Duplicate`].
#[async_trait]
pub trait DocumentStore: Send + Sync {
    fn backend_name(&self) -> &'static str;

    async fn insert(&self, collection: Collection, id: Uuid, document: Value) -> Result<(), DatabaseError>;

    async fn get(&self, collection: Collection, id: Uuid) -> Result<Option<Value>, DatabaseError>;

    async fn find(&self, collection: Collection, query: &DocQuery) -> Result<Vec<Value>, DatabaseError>;

    async fn count(&self, collection: Collection, query: &DocQuery) -> Result<u64, DatabaseError>;

    /// Replace a whole document. Returns false when no document has this id.
    async fn replace(&self, collection: Collection, id: Uuid, document: Value) -> Result<bool, DatabaseError>;

    /// Delete and return the removed document.
    async fn delete(&self, collection: Collection, id: Uuid) -> Result<Option<Value>, DatabaseError>;

    async fn health_check(&self) -> Result<(), DatabaseError>;
}
