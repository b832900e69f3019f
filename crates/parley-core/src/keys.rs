//! Document key conventions.
//!
//! Pure string functions — no SDK dependency. These define the canonical
//! layout of session documents in the backing store: one JSON object per
//! session, prefixed by its collection.

/// Key of the backing document for one session.
pub fn session(collection: &str, session_id: &str) -> String {
    format!("{collection}/{session_id}.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_key_is_collection_prefixed_json() {
        assert_eq!(session("chats", "s1"), "chats/s1.json");
    }
}
