use std::marker::PhantomData;
use std::sync::Arc;

use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::database::query::DocQuery;
use crate::database::record::{decode, Entity};
use crate::database::store::DocumentStore;

/// Typed access to one collection of the document store.
pub struct Repository<T> {
    store: Arc<dyn DocumentStore>,
    _phantom: PhantomData<T>,
}

impl<T: Entity> Repository<T> {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            _phantom: PhantomData,
        }
    }

    pub async fn insert(&self, record: &T) -> Result<(), DatabaseError> {
        let document = serde_json::to_value(record)?;
        self.store.insert(T::COLLECTION, record.id(), document).await
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<T>, DatabaseError> {
        match self.store.get(T::COLLECTION, id).await? {
            Some(document) => Ok(Some(decode(document)?)),
            None => Ok(None),
        }
    }

    /// Like `find_by_id`, but a missing record is an error.
    pub async fn select_404(&self, id: Uuid) -> Result<T, DatabaseError> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("{} not found", T::LABEL)))
    }

    pub async fn exists(&self, id: Uuid) -> Result<bool, DatabaseError> {
        Ok(self.store.get(T::COLLECTION, id).await?.is_some())
    }

    pub async fn select_any(&self, query: DocQuery) -> Result<Vec<T>, DatabaseError> {
        self.store
            .find(T::COLLECTION, &query)
            .await?
            .into_iter()
            .map(|document| decode(document).map_err(DatabaseError::from))
            .collect()
    }

    pub async fn select_one(&self, query: DocQuery) -> Result<Option<T>, DatabaseError> {
        Ok(self.select_any(query.limit(1)).await?.into_iter().next())
    }

    pub async fn count(&self, query: DocQuery) -> Result<u64, DatabaseError> {
        self.store.count(T::COLLECTION, &query).await
    }

    pub async fn select_ids(&self, ids: &[Uuid]) -> Result<Vec<T>, DatabaseError> {
        if ids.is_empty() {
            return Ok(vec![]);
        }
        self.select_any(DocQuery::new().is_in("id", ids)).await
    }

    /// Persist a modified record. The caller is responsible for `updatedAt`.
    pub async fn update(&self, record: &T) -> Result<(), DatabaseError> {
        let document = serde_json::to_value(record)?;
        if self.store.replace(T::COLLECTION, record.id(), document).await? {
            Ok(())
        } else {
            Err(DatabaseError::NotFound(format!("{} not found", T::LABEL)))
        }
    }

    /// Touch `updatedAt` and persist.
    pub async fn save(&self, record: &mut T) -> Result<(), DatabaseError> {
        record.meta_mut().touch();
        self.update(record).await
    }

    pub async fn delete(&self, id: Uuid) -> Result<Option<T>, DatabaseError> {
        match self.store.delete(T::COLLECTION, id).await? {
            Some(document) => Ok(Some(decode(document)?)),
            None => Ok(None),
        }
    }
}
