use serde::{Deserialize, Serialize};

use crate::codec::StoredMessage;

/// The backing document persisted for one session.
///
/// Exactly one of these exists per (collection, session id) pair. It is the
/// single source of truth for the session's conversation; the in-memory
/// cache held by a history instance is a derived copy. `user_id` is
/// auxiliary metadata and never affects addressing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionDocument {
    pub id: String,
    pub user_id: String,
    pub messages: Vec<StoredMessage>,
}
