//! The session message history: a read/append/clear view over one session's
//! conversation, backed by a single remote document.

use std::sync::{Arc, Mutex};

use serde_json::{Map, Value};
use tokio::sync::{mpsc, oneshot};
use tracing::info;

use parley_core::codec::{self, StoredMessage};
use parley_core::error::CoreError;
use parley_core::models::message::ChatMessage;
use parley_core::models::session::SessionDocument;
use parley_storage::client;
use parley_storage::config::StoreConfig;
use parley_storage::document::DocumentHandle;
use parley_storage::store::{DocumentStore, S3DocumentStore};

use crate::error::HistoryError;
use crate::worker::{self, ErrorBuffer, Job};

/// Message history for one session.
///
/// Owns an in-memory ordered cache of the session's messages. The cache is
/// lazily populated from the backing document in the background after
/// construction; every append pushes the full accumulated message list back
/// to storage. Mutations update the cache synchronously and enqueue the
/// remote operation on the instance's background worker — callers must treat
/// remote durability as eventual, and drain [`take_error`](Self::take_error)
/// if they care about background failures.
pub struct MessageHistory {
    session_id: String,
    user_id: String,
    document: DocumentHandle,
    cache: Arc<Mutex<Vec<ChatMessage>>>,
    jobs: mpsc::UnboundedSender<Job>,
    errors: Arc<ErrorBuffer>,
}

impl MessageHistory {
    /// Bind a history to `(collection, session_id)` on the given store and
    /// kick off the initial load in the background.
    ///
    /// Construction never blocks on that load; reads see whatever the cache
    /// holds at the instant they run. Must be called within a tokio runtime.
    pub fn connect(
        store: Arc<dyn DocumentStore>,
        collection: &str,
        session_id: &str,
        user_id: &str,
    ) -> Result<Self, HistoryError> {
        if collection.is_empty() {
            return Err(HistoryError::InvalidCollection);
        }
        if session_id.is_empty() {
            return Err(HistoryError::InvalidSessionId);
        }

        let document = DocumentHandle::new(store, collection, session_id);
        let cache = Arc::new(Mutex::new(Vec::new()));
        let errors = Arc::new(ErrorBuffer::default());
        let jobs = worker::spawn(document.clone(), cache.clone(), errors.clone());

        let history = Self {
            session_id: session_id.to_string(),
            user_id: user_id.to_string(),
            document,
            cache,
            jobs,
            errors,
        };
        history.enqueue(Job::Load);

        info!(collection, session_id, "message history connected");

        Ok(history)
    }

    /// Connect against S3 via the process-wide shared client.
    ///
    /// Fails with [`HistoryError::Connection`] when the client cannot be
    /// established or the bucket is unreachable.
    pub async fn connect_s3(
        config: &StoreConfig,
        collection: &str,
        session_id: &str,
        user_id: &str,
    ) -> Result<Self, HistoryError> {
        let s3 = client::shared(config)
            .await
            .map_err(|e| HistoryError::Connection(e.to_string()))?;
        let store = Arc::new(S3DocumentStore::new(s3, &config.bucket));
        Self::connect(store, collection, session_id, user_id)
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Read the session's messages.
    ///
    /// Performs a live remote read first: if the backing document exists and
    /// holds a non-empty `messages` field, the cache is replaced wholesale
    /// with the decoded sequence. An absent document or an empty `messages`
    /// field leaves the cache untouched — a fresh or empty remote never
    /// destroys local state. Returns a clone of the (possibly just-updated)
    /// cache.
    pub async fn messages(&self) -> Result<Vec<ChatMessage>, HistoryError> {
        sync_from_remote(&self.document, &self.cache).await?;
        Ok(self.cache.lock().unwrap().clone())
    }

    /// Append one message.
    ///
    /// The cache grows by exactly one, synchronously. The full encoded cache
    /// is then snapshotted and enqueued as a merge-write; the call returns
    /// once the job is enqueued, not once storage acknowledges it.
    pub fn add_message(&self, message: ChatMessage) {
        let snapshot = {
            let mut cache = self.cache.lock().unwrap();
            cache.push(message);
            self.snapshot(&cache)
        };
        self.enqueue(Job::Write(snapshot));
    }

    /// Append several messages with a single snapshot write.
    pub fn add_messages(&self, messages: impl IntoIterator<Item = ChatMessage>) {
        let snapshot = {
            let mut cache = self.cache.lock().unwrap();
            let before = cache.len();
            cache.extend(messages);
            if cache.len() == before {
                return;
            }
            self.snapshot(&cache)
        };
        self.enqueue(Job::Write(snapshot));
    }

    pub fn add_user_message(&self, content: impl Into<String>) {
        self.add_message(ChatMessage::human(content));
    }

    pub fn add_ai_message(&self, content: impl Into<String>) {
        self.add_message(ChatMessage::ai(content));
    }

    /// Empty the cache and delete the backing document.
    ///
    /// Local-state-first: the cache is cleared synchronously even if the
    /// enqueued delete later fails.
    pub fn clear(&self) {
        self.cache.lock().unwrap().clear();
        self.enqueue(Job::Delete);
        info!(
            collection = self.document.collection(),
            session_id = %self.session_id,
            "message history cleared"
        );
    }

    /// Wait until every previously enqueued background job has finished.
    ///
    /// A durability barrier for owners (and tests) that want one; the
    /// mutating operations themselves never wait.
    pub async fn flush(&self) {
        let (tx, rx) = oneshot::channel();
        if self.jobs.send(Job::Flush(tx)).is_ok() {
            let _ = rx.await;
        }
    }

    /// Drain the oldest unread background failure, if any.
    pub fn take_error(&self) -> Option<HistoryError> {
        self.errors.take()
    }

    /// Number of unread background failures.
    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    fn snapshot(&self, cache: &[ChatMessage]) -> SessionDocument {
        SessionDocument {
            id: self.session_id.clone(),
            user_id: self.user_id.clone(),
            messages: codec::encode(cache),
        }
    }

    fn enqueue(&self, job: Job) {
        if self.jobs.send(job).is_err() {
            // The worker is gone, so the handle is effectively unbound.
            // Report through the same channel background failures use.
            self.errors.push(HistoryError::DocumentNotInitialized);
        }
    }
}

/// Pull the backing document into the cache.
///
/// Remote content wins only when it is non-empty; an absent document or an
/// empty `messages` field leaves local state alone.
pub(crate) async fn sync_from_remote(
    document: &DocumentHandle,
    cache: &Mutex<Vec<ChatMessage>>,
) -> Result<(), HistoryError> {
    if let Some(doc) = document.read().await? {
        if let Some(decoded) = decode_messages(&doc)? {
            *cache.lock().unwrap() = decoded;
        }
    }
    Ok(())
}

/// Decode a document's `messages` field. `None` when the field is missing,
/// not an array, or empty.
fn decode_messages(doc: &Map<String, Value>) -> Result<Option<Vec<ChatMessage>>, HistoryError> {
    match doc.get("messages") {
        Some(Value::Array(records)) if !records.is_empty() => {
            let records: Vec<StoredMessage> =
                serde_json::from_value(Value::Array(records.clone())).map_err(CoreError::from)?;
            Ok(Some(codec::decode(records)?))
        }
        _ => Ok(None),
    }
}
