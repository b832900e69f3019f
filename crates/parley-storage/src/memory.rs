//! In-memory document store, for tests and local runs.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::StorageError;
use crate::store::DocumentStore;

/// Document store held entirely in memory.
///
/// Honors the same merge-write contract as the S3 store. Useful for tests
/// and local runs where no bucket is available.
#[derive(Default)]
pub struct MemoryDocumentStore {
    documents: Mutex<HashMap<(String, String), Map<String, Value>>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot a stored document directly, bypassing the trait.
    pub fn document(&self, collection: &str, id: &str) -> Option<Map<String, Value>> {
        self.documents
            .lock()
            .unwrap()
            .get(&(collection.to_string(), id.to_string()))
            .cloned()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn read(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<Map<String, Value>>, StorageError> {
        Ok(self.document(collection, id))
    }

    async fn merge_write(
        &self,
        collection: &str,
        id: &str,
        fields: Map<String, Value>,
    ) -> Result<(), StorageError> {
        let mut documents = self.documents.lock().unwrap();
        let doc = documents
            .entry((collection.to_string(), id.to_string()))
            .or_default();
        for (field, value) in fields {
            doc.insert(field, value);
        }
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StorageError> {
        self.documents
            .lock()
            .unwrap()
            .remove(&(collection.to_string(), id.to_string()));
        Ok(())
    }
}
