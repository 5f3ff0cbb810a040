//! Error taxonomy for the chat stores and the core built on top of them.

use thiserror::Error;

/// Result type alias for chat operations
pub type ChatResult<T> = Result<T, ChatError>;

/// Main error type for the chat system.
///
/// A message that is already read is deliberately not represented here:
/// re-marking is a successful no-op, not a failure.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("conversation not found: {id}")]
    ConversationNotFound { id: i64 },

    #[error("message not found: {id}")]
    MessageNotFound { id: i64 },

    #[error("principal {principal_id} is not a participant of conversation {conversation_id}")]
    NotParticipant {
        conversation_id: i64,
        principal_id: i64,
    },

    #[error("message content must not be empty")]
    EmptyContent,

    #[error("validation error: {message}")]
    Validation { message: String },

    #[error("sender cannot mark own message {message_id} as read")]
    SelfReadRejected { message_id: i64 },
}

impl ChatError {
    pub fn conversation_not_found(id: i64) -> Self {
        Self::ConversationNotFound { id }
    }

    pub fn message_not_found(id: i64) -> Self {
        Self::MessageNotFound { id }
    }

    pub fn not_participant(conversation_id: i64, principal_id: i64) -> Self {
        Self::NotParticipant {
            conversation_id,
            principal_id,
        }
    }

    pub fn self_read_rejected(message_id: i64) -> Self {
        Self::SelfReadRejected { message_id }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}
