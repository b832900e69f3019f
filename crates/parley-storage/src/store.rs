//! The document store abstraction and its S3 implementation.

use async_trait::async_trait;
use aws_sdk_s3::Client;
use serde_json::{Map, Value};

use parley_core::keys;

use crate::error::StorageError;
use crate::objects;

/// An opaque key-document store addressed by `(collection, id)`.
///
/// # Merge-write contract
///
/// [`merge_write`](DocumentStore::merge_write) overlays the provided
/// top-level fields onto whatever the document currently holds: fields not
/// named survive, fields that are named are replaced wholesale. That
/// includes array fields — a `messages` array is always fully overwritten,
/// never merged element-by-element.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Read the document, `None` if it does not exist.
    async fn read(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<Map<String, Value>>, StorageError>;

    /// Merge the given top-level fields into the document, creating it if
    /// absent. See the trait docs for the overwrite contract.
    async fn merge_write(
        &self,
        collection: &str,
        id: &str,
        fields: Map<String, Value>,
    ) -> Result<(), StorageError>;

    /// Delete the document. Deleting a missing document is a no-op.
    async fn delete(&self, collection: &str, id: &str) -> Result<(), StorageError>;
}

/// Document store backed by S3: one JSON object per document at
/// `{collection}/{id}.json`.
pub struct S3DocumentStore {
    client: Client,
    bucket: String,
}

impl S3DocumentStore {
    pub fn new(client: Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }
}

#[async_trait]
impl DocumentStore for S3DocumentStore {
    async fn read(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<Map<String, Value>>, StorageError> {
        let key = keys::session(collection, id);
        match objects::get_object(&self.client, &self.bucket, &key).await {
            Ok(body) => {
                let doc: Map<String, Value> = serde_json::from_slice(&body)?;
                Ok(Some(doc))
            }
            Err(StorageError::NotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn merge_write(
        &self,
        collection: &str,
        id: &str,
        fields: Map<String, Value>,
    ) -> Result<(), StorageError> {
        // S3 has no partial writes: read the current document, overlay the
        // provided fields, write the whole object back.
        let mut doc = self.read(collection, id).await?.unwrap_or_default();
        for (field, value) in fields {
            doc.insert(field, value);
        }

        let key = keys::session(collection, id);
        let body = serde_json::to_vec_pretty(&doc)?;
        objects::put_object(&self.client, &self.bucket, &key, body, Some("application/json")).await
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StorageError> {
        let key = keys::session(collection, id);
        objects::delete_object(&self.client, &self.bucket, &key).await
    }
}
