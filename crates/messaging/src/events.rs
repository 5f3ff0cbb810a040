//! Socket event types for real-time chat.
//!
//! Every event is a named variant with a fixed payload shape; the `type`
//! field on the wire is the serde tag.

use crate::principal::Principal;
use harvestchat_database::Message;
use serde::{Deserialize, Serialize};

/// Events received from a connected client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    /// Send a message to the session's conversation
    Message { message: String },
    /// Mark a message as read
    MessageRead { message_id: i64 },
}

impl ClientEvent {
    /// Decode an inbound frame.
    ///
    /// A payload with no `type` field at all is treated as a `message`
    /// event; a payload with an unrecognized `type`, or one that does not
    /// match its variant's shape, yields `None` and is dropped silently.
    pub fn decode(text: &str) -> Option<ClientEvent> {
        let mut value: serde_json::Value = serde_json::from_str(text).ok()?;
        let object = value.as_object_mut()?;
        if !object.contains_key("type") {
            object.insert("type".into(), serde_json::Value::from("message"));
        }
        serde_json::from_value(value).ok()
    }
}

/// Events broadcast to every session subscribed to a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    /// A new message was appended
    Message {
        message: String,
        sender_id: i64,
        sender_username: String,
        message_id: i64,
        timestamp: String,
        is_read: bool,
    },
    /// A message was seen by a non-sender participant
    MessageRead {
        message_id: i64,
        read_by_id: i64,
        read_by_username: String,
        read_at: String,
    },
}

impl ServerEvent {
    /// Broadcast payload for a freshly appended message.
    pub fn message(message: &Message) -> Self {
        Self::Message {
            message: message.content.clone(),
            sender_id: message.sender_id,
            sender_username: message.sender_username.clone(),
            message_id: message.id,
            timestamp: message.created_at.clone(),
            is_read: message.is_read,
        }
    }

    /// Broadcast payload for a read receipt.
    pub fn message_read(message_id: i64, reader: &Principal, read_at: String) -> Self {
        Self::MessageRead {
            message_id,
            read_by_id: reader.id,
            read_by_username: reader.username.clone(),
            read_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_message_event() {
        let event = ClientEvent::decode(r#"{"type":"message","message":"hello"}"#).unwrap();
        assert_eq!(
            event,
            ClientEvent::Message {
                message: "hello".to_string()
            }
        );
    }

    #[test]
    fn decodes_message_read_event() {
        let event = ClientEvent::decode(r#"{"type":"message_read","message_id":7}"#).unwrap();
        assert_eq!(event, ClientEvent::MessageRead { message_id: 7 });
    }

    #[test]
    fn missing_type_defaults_to_message() {
        let event = ClientEvent::decode(r#"{"message":"hi there"}"#).unwrap();
        assert_eq!(
            event,
            ClientEvent::Message {
                message: "hi there".to_string()
            }
        );
    }

    #[test]
    fn unknown_type_is_dropped() {
        assert_eq!(ClientEvent::decode(r#"{"type":"typing","message":"x"}"#), None);
    }

    #[test]
    fn malformed_payloads_are_dropped() {
        assert_eq!(ClientEvent::decode("not json"), None);
        assert_eq!(ClientEvent::decode(r#""just a string""#), None);
        assert_eq!(ClientEvent::decode(r#"{"type":"message_read"}"#), None);
    }

    #[test]
    fn message_event_wire_shape() {
        let message = Message {
            id: 42,
            conversation_id: 1,
            sender_id: 1,
            sender_username: "amina".to_string(),
            content: "hello".to_string(),
            created_at: "2024-05-01T10:00:00+00:00".to_string(),
            is_read: false,
            read_at: None,
        };

        let json = serde_json::to_value(ServerEvent::message(&message)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "type": "message",
                "message": "hello",
                "sender_id": 1,
                "sender_username": "amina",
                "message_id": 42,
                "timestamp": "2024-05-01T10:00:00+00:00",
                "is_read": false
            })
        );
    }

    #[test]
    fn message_read_event_wire_shape() {
        let reader = Principal::new(2, "bakary");
        let event =
            ServerEvent::message_read(42, &reader, "2024-05-01T10:05:00+00:00".to_string());

        let json = serde_json::to_value(event).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "type": "message_read",
                "message_id": 42,
                "read_by_id": 2,
                "read_by_username": "bakary",
                "read_at": "2024-05-01T10:05:00+00:00"
            })
        );
    }
}
