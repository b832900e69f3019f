//! Per-instance background job queue.
//!
//! Remote writes and deletes triggered by cache mutations run on a single
//! worker task per history instance. Jobs execute strictly in enqueue order,
//! so the last-enqueued snapshot is also the last to land. Failures go into
//! a bounded error buffer the owner can drain; they are logged and never
//! block later jobs or surface to the mutating caller.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use serde_json::{Map, Value};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use parley_core::error::CoreError;
use parley_core::models::message::ChatMessage;
use parley_core::models::session::SessionDocument;
use parley_storage::document::DocumentHandle;

use crate::error::HistoryError;
use crate::history;

/// Most recent background failures kept for the owner to drain.
const ERROR_BUFFER_CAPACITY: usize = 32;

pub(crate) enum Job {
    /// Initial pull of the backing document into the cache.
    Load,
    /// Full-snapshot write of the session document.
    Write(SessionDocument),
    /// Delete the backing document.
    Delete,
    /// Barrier: acknowledged once every earlier job has finished.
    Flush(oneshot::Sender<()>),
}

/// Bounded buffer of background failures. When full, the oldest unread
/// failure gives way to the newest.
#[derive(Default)]
pub(crate) struct ErrorBuffer {
    buffer: Mutex<VecDeque<HistoryError>>,
}

impl ErrorBuffer {
    pub(crate) fn push(&self, error: HistoryError) {
        let mut buffer = self.buffer.lock().unwrap();
        if buffer.len() == ERROR_BUFFER_CAPACITY {
            buffer.pop_front();
        }
        buffer.push_back(error);
    }

    pub(crate) fn take(&self) -> Option<HistoryError> {
        self.buffer.lock().unwrap().pop_front()
    }

    pub(crate) fn len(&self) -> usize {
        self.buffer.lock().unwrap().len()
    }
}

/// Spawn the worker task for one history instance.
///
/// The worker exits when every sender half of the returned channel is
/// dropped, after draining what was already enqueued.
pub(crate) fn spawn(
    document: DocumentHandle,
    cache: Arc<Mutex<Vec<ChatMessage>>>,
    errors: Arc<ErrorBuffer>,
) -> mpsc::UnboundedSender<Job> {
    let (tx, mut rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        while let Some(job) = rx.recv().await {
            match job {
                Job::Load => {
                    if let Err(error) = history::sync_from_remote(&document, &cache).await {
                        warn!(
                            collection = document.collection(),
                            session_id = document.id(),
                            %error,
                            "initial history load failed"
                        );
                        errors.push(error);
                    } else {
                        debug!(
                            collection = document.collection(),
                            session_id = document.id(),
                            "initial history load complete"
                        );
                    }
                }
                Job::Write(snapshot) => {
                    let count = snapshot.messages.len();
                    if let Err(error) = write(&document, snapshot).await {
                        warn!(
                            collection = document.collection(),
                            session_id = document.id(),
                            %error,
                            "history write failed"
                        );
                        errors.push(error);
                    } else {
                        debug!(
                            collection = document.collection(),
                            session_id = document.id(),
                            messages = count,
                            "history written"
                        );
                    }
                }
                Job::Delete => {
                    if let Err(error) = document.delete().await {
                        warn!(
                            collection = document.collection(),
                            session_id = document.id(),
                            %error,
                            "history delete failed"
                        );
                        errors.push(HistoryError::Storage(error));
                    }
                }
                Job::Flush(done) => {
                    let _ = done.send(());
                }
            }
        }
    });

    tx
}

/// Merge-write the snapshot: `id`, `user_id`, and the full `messages` array.
/// Out-of-band top-level fields survive; `messages` is replaced wholesale.
async fn write(document: &DocumentHandle, snapshot: SessionDocument) -> Result<(), HistoryError> {
    let mut fields = Map::new();
    fields.insert("id".to_string(), Value::String(snapshot.id));
    fields.insert("user_id".to_string(), Value::String(snapshot.user_id));
    fields.insert(
        "messages".to_string(),
        serde_json::to_value(&snapshot.messages).map_err(CoreError::from)?,
    );

    document.merge_write(fields).await?;
    Ok(())
}
