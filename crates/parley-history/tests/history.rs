use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value, json};

use parley_core::models::message::{ChatMessage, MessageRole};
use parley_history::error::HistoryError;
use parley_history::history::MessageHistory;
use parley_storage::error::StorageError;
use parley_storage::memory::MemoryDocumentStore;
use parley_storage::store::DocumentStore;

/// Store where every write and delete fails. Reads find nothing.
struct FailingStore;

#[async_trait]
impl DocumentStore for FailingStore {
    async fn read(
        &self,
        _collection: &str,
        _id: &str,
    ) -> Result<Option<Map<String, Value>>, StorageError> {
        Ok(None)
    }

    async fn merge_write(
        &self,
        _collection: &str,
        _id: &str,
        _fields: Map<String, Value>,
    ) -> Result<(), StorageError> {
        Err(StorageError::PutObject("injected failure".to_string()))
    }

    async fn delete(&self, _collection: &str, _id: &str) -> Result<(), StorageError> {
        Err(StorageError::DeleteObject("injected failure".to_string()))
    }
}

#[tokio::test]
async fn appends_preserve_order() {
    let store = Arc::new(MemoryDocumentStore::new());
    let history = MessageHistory::connect(store, "chats", "s1", "u1").unwrap();

    for i in 0..5 {
        history.add_user_message(format!("message {i}"));
    }
    history.flush().await;

    let messages = history.messages().await.unwrap();
    assert_eq!(messages.len(), 5);
    for (i, message) in messages.iter().enumerate() {
        assert_eq!(message.content, format!("message {i}"));
    }
}

#[tokio::test]
async fn two_turn_conversation_round_trips() {
    let store = Arc::new(MemoryDocumentStore::new());
    let history = MessageHistory::connect(store, "chats", "s1", "u1").unwrap();

    history.add_message(ChatMessage::human("hi"));
    history.add_message(ChatMessage::ai("hello"));
    history.flush().await;

    let messages = history.messages().await.unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, MessageRole::Human);
    assert_eq!(messages[0].content, "hi");
    assert_eq!(messages[1].role, MessageRole::Ai);
    assert_eq!(messages[1].content, "hello");
}

#[tokio::test]
async fn empty_document_reads_empty_before_and_after_load() {
    let store = Arc::new(MemoryDocumentStore::new());
    let history = MessageHistory::connect(store, "chats", "s1", "u1").unwrap();

    // Immediately, with the initial load possibly still in flight.
    assert!(history.messages().await.unwrap().is_empty());

    // And after the load has definitely completed.
    history.flush().await;
    assert!(history.messages().await.unwrap().is_empty());
    assert_eq!(history.error_count(), 0);
}

#[tokio::test]
async fn clear_deletes_backing_document() {
    let store = Arc::new(MemoryDocumentStore::new());
    let history = MessageHistory::connect(store.clone(), "chats", "s1", "u1").unwrap();

    history.add_user_message("hi");
    history.add_ai_message("hello");
    history.flush().await;
    assert!(store.document("chats", "s1").is_some());

    history.clear();
    history.flush().await;

    assert!(store.document("chats", "s1").is_none());
    assert!(history.messages().await.unwrap().is_empty());
}

#[tokio::test]
async fn write_is_full_snapshot_and_merge_preserves_other_fields() {
    let store = Arc::new(MemoryDocumentStore::new());

    // An out-of-band top-level field written before any history exists.
    let mut fields = Map::new();
    fields.insert("pinned".to_string(), json!(true));
    store.merge_write("chats", "s1", fields).await.unwrap();

    let history = MessageHistory::connect(store.clone(), "chats", "s1", "u1").unwrap();
    history.add_user_message("hi");
    history.add_ai_message("hello");
    history.flush().await;

    let doc = store.document("chats", "s1").unwrap();
    assert_eq!(doc.get("pinned"), Some(&json!(true)));
    assert_eq!(doc.get("id"), Some(&json!("s1")));
    assert_eq!(doc.get("user_id"), Some(&json!("u1")));

    let records = doc.get("messages").unwrap().as_array().unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["type"], "human");
    assert_eq!(records[0]["data"]["content"], "hi");
    assert_eq!(records[1]["type"], "ai");
    assert_eq!(records[1]["data"]["content"], "hello");
}

#[tokio::test]
async fn empty_remote_preserves_local_cache() {
    // Writes fail and reads find nothing, so the remote stays empty while
    // the local cache fills.
    let history = MessageHistory::connect(Arc::new(FailingStore), "chats", "s1", "u1").unwrap();

    history.add_user_message("only local");
    history.flush().await;

    let messages = history.messages().await.unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].content, "only local");
}

#[tokio::test]
async fn background_failures_surface_on_the_error_channel() {
    let history = MessageHistory::connect(Arc::new(FailingStore), "chats", "s1", "u1").unwrap();

    history.add_user_message("hi");
    history.clear();
    history.flush().await;

    // One failed write, one failed delete. The instance keeps operating.
    assert_eq!(history.error_count(), 2);
    assert!(matches!(
        history.take_error(),
        Some(HistoryError::Storage(StorageError::PutObject(_)))
    ));
    assert!(matches!(
        history.take_error(),
        Some(HistoryError::Storage(StorageError::DeleteObject(_)))
    ));
    assert!(history.take_error().is_none());

    history.add_user_message("still works");
    history.flush().await;
    assert_eq!(history.error_count(), 1);
}

#[tokio::test]
async fn second_instance_loads_persisted_conversation() {
    let store = Arc::new(MemoryDocumentStore::new());

    let first = MessageHistory::connect(store.clone(), "chats", "s1", "u1").unwrap();
    first.add_user_message("hi");
    first.add_ai_message("hello");
    first.flush().await;
    drop(first);

    let second = MessageHistory::connect(store, "chats", "s1", "u1").unwrap();
    second.flush().await;

    let messages = second.messages().await.unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].content, "hi");
    assert_eq!(messages[1].content, "hello");
}

#[tokio::test]
async fn remote_content_replaces_cache_wholesale() {
    let store = Arc::new(MemoryDocumentStore::new());
    let history = MessageHistory::connect(store.clone(), "chats", "s1", "u1").unwrap();
    history.flush().await;

    // Another writer lands a conversation behind this instance's back.
    let mut fields = Map::new();
    fields.insert(
        "messages".to_string(),
        json!([
            { "type": "human", "data": { "content": "out of band" } },
            { "type": "ai", "data": { "content": "reply" } },
        ]),
    );
    store.merge_write("chats", "s1", fields).await.unwrap();

    let messages = history.messages().await.unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].content, "out of band");
    assert_eq!(messages[1].content, "reply");
}

#[tokio::test]
async fn add_messages_batches_into_one_snapshot() {
    let store = Arc::new(MemoryDocumentStore::new());
    let history = MessageHistory::connect(store.clone(), "chats", "s1", "u1").unwrap();

    history.add_messages(vec![
        ChatMessage::human("one"),
        ChatMessage::ai("two"),
        ChatMessage::human("three"),
    ]);
    history.flush().await;

    let doc = store.document("chats", "s1").unwrap();
    let records = doc.get("messages").unwrap().as_array().unwrap();
    assert_eq!(records.len(), 3);

    // An empty batch writes nothing new.
    history.add_messages(Vec::new());
    history.flush().await;
    assert_eq!(history.messages().await.unwrap().len(), 3);
}

#[tokio::test]
async fn connect_validates_identifiers() {
    let store = Arc::new(MemoryDocumentStore::new());

    assert!(matches!(
        MessageHistory::connect(store.clone(), "", "s1", "u1"),
        Err(HistoryError::InvalidCollection)
    ));
    assert!(matches!(
        MessageHistory::connect(store, "chats", "", "u1"),
        Err(HistoryError::InvalidSessionId)
    ));
}

#[tokio::test]
async fn malformed_stored_records_error_on_read() {
    let store = Arc::new(MemoryDocumentStore::new());

    let mut fields = Map::new();
    fields.insert(
        "messages".to_string(),
        json!([{ "type": "hologram", "data": { "content": "?" } }]),
    );
    store.merge_write("chats", "s1", fields).await.unwrap();

    let history = MessageHistory::connect(store, "chats", "s1", "u1").unwrap();
    let err = history.messages().await.unwrap_err();
    assert!(matches!(err, HistoryError::Codec(_)));
}
