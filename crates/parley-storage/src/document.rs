use std::sync::Arc;

use serde_json::{Map, Value};

use crate::error::StorageError;
use crate::store::DocumentStore;

/// A document store bound to one `(collection, id)` address.
#[derive(Clone)]
pub struct DocumentHandle {
    store: Arc<dyn DocumentStore>,
    collection: String,
    id: String,
}

impl DocumentHandle {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        collection: impl Into<String>,
        id: impl Into<String>,
    ) -> Self {
        Self {
            store,
            collection: collection.into(),
            id: id.into(),
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub async fn read(&self) -> Result<Option<Map<String, Value>>, StorageError> {
        self.store.read(&self.collection, &self.id).await
    }

    pub async fn merge_write(&self, fields: Map<String, Value>) -> Result<(), StorageError> {
        self.store.merge_write(&self.collection, &self.id, fields).await
    }

    pub async fn delete(&self) -> Result<(), StorageError> {
        self.store.delete(&self.collection, &self.id).await
    }
}
