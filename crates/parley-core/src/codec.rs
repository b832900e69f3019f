//! Conversion between domain messages and their stored form.
//!
//! Pure functions — no I/O. `decode(encode(msgs))` returns `msgs` unchanged
//! for any well-formed message sequence.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::CoreError;
use crate::models::message::{ChatMessage, MessageRole};

/// The storage-safe form of a [`ChatMessage`]: a type discriminator plus a
/// flat payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredMessage {
    #[serde(rename = "type")]
    pub message_type: String,
    pub data: StoredMessageData,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredMessageData {
    pub content: String,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub additional_kwargs: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Only present on `generic` records, which carry their role verbatim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

/// Encode a message sequence into stored records.
pub fn encode(messages: &[ChatMessage]) -> Vec<StoredMessage> {
    messages.iter().map(encode_one).collect()
}

/// Decode stored records back into domain messages.
///
/// Fails on an unknown type discriminator or a `generic` record without a
/// role.
pub fn decode(records: Vec<StoredMessage>) -> Result<Vec<ChatMessage>, CoreError> {
    records.into_iter().map(decode_one).collect()
}

fn encode_one(message: &ChatMessage) -> StoredMessage {
    let (message_type, role) = match &message.role {
        MessageRole::Human => ("human", None),
        MessageRole::Ai => ("ai", None),
        MessageRole::System => ("system", None),
        MessageRole::Tool => ("tool", None),
        MessageRole::Generic(role) => ("generic", Some(role.clone())),
    };

    StoredMessage {
        message_type: message_type.to_string(),
        data: StoredMessageData {
            content: message.content.clone(),
            additional_kwargs: message.additional_kwargs.clone(),
            name: message.name.clone(),
            role,
        },
    }
}

fn decode_one(record: StoredMessage) -> Result<ChatMessage, CoreError> {
    let role = match record.message_type.as_str() {
        "human" => MessageRole::Human,
        "ai" => MessageRole::Ai,
        "system" => MessageRole::System,
        "tool" => MessageRole::Tool,
        "generic" => {
            let role = record
                .data
                .role
                .ok_or_else(|| CoreError::MissingField("role".to_string()))?;
            MessageRole::Generic(role)
        }
        other => return Err(CoreError::UnknownMessageType(other.to_string())),
    };

    Ok(ChatMessage {
        role,
        content: record.data.content,
        additional_kwargs: record.data.additional_kwargs,
        name: record.data.name,
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn round_trip_plain_messages() {
        let messages = vec![
            ChatMessage::human("hi"),
            ChatMessage::ai("hello"),
            ChatMessage::system("be helpful"),
        ];

        let decoded = decode(encode(&messages)).unwrap();
        assert_eq!(decoded, messages);
    }

    #[test]
    fn round_trip_preserves_metadata() {
        let messages = vec![
            ChatMessage::human("look at this")
                .with_name("alice")
                .with_additional_kwarg("attachment", json!({"kind": "image"})),
            ChatMessage::new(MessageRole::Generic("narrator".to_string()), "meanwhile"),
        ];

        let decoded = decode(encode(&messages)).unwrap();
        assert_eq!(decoded, messages);
    }

    #[test]
    fn encode_tags_roles() {
        let records = encode(&[ChatMessage::human("hi"), ChatMessage::ai("hello")]);
        assert_eq!(records[0].message_type, "human");
        assert_eq!(records[1].message_type, "ai");
        assert_eq!(records[0].data.content, "hi");
    }

    #[test]
    fn generic_record_carries_role_in_data() {
        let records = encode(&[ChatMessage::new(
            MessageRole::Generic("narrator".to_string()),
            "meanwhile",
        )]);
        assert_eq!(records[0].message_type, "generic");
        assert_eq!(records[0].data.role.as_deref(), Some("narrator"));
    }

    #[test]
    fn decode_rejects_unknown_type() {
        let record = StoredMessage {
            message_type: "hologram".to_string(),
            data: StoredMessageData {
                content: "?".to_string(),
                additional_kwargs: Map::new(),
                name: None,
                role: None,
            },
        };

        let err = decode(vec![record]).unwrap_err();
        assert!(matches!(err, CoreError::UnknownMessageType(t) if t == "hologram"));
    }

    #[test]
    fn decode_rejects_generic_without_role() {
        let record = StoredMessage {
            message_type: "generic".to_string(),
            data: StoredMessageData {
                content: "meanwhile".to_string(),
                additional_kwargs: Map::new(),
                name: None,
                role: None,
            },
        };

        let err = decode(vec![record]).unwrap_err();
        assert!(matches!(err, CoreError::MissingField(f) if f == "role"));
    }
}
