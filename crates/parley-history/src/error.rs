use thiserror::Error;

use parley_core::error::CoreError;
use parley_storage::error::StorageError;

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("connection failed: {0}")]
    Connection(String),

    #[error("collection name is empty")]
    InvalidCollection,

    #[error("session id is empty")]
    InvalidSessionId,

    #[error("document handle not initialized")]
    DocumentNotInitialized,

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("codec error: {0}")]
    Codec(#[from] CoreError),
}
