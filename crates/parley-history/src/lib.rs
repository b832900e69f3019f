//! parley-history
//!
//! Session-scoped chat message history backed by a remote document store.
//! One `MessageHistory` per conversation: it caches the session's messages
//! in memory, loads them lazily on construction, writes the full message
//! list through on every append, and deletes the backing document on clear.

pub mod error;
pub mod history;
mod worker;
