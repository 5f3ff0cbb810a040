//! Read-receipt rules.
//!
//! A message is read by a non-sender participant at most once. Re-marking an
//! already-read message succeeds without a new transition, so callers can
//! tell a fresh receipt (worth notifying about) from a repeat.

use crate::principal::Principal;
use harvestchat_database::{ChatError, ChatResult, MessageRepository};
use tracing::debug;

/// Outcome of a mark-read request.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadReceipt {
    pub message_id: i64,
    pub read_at: String,
    /// Whether this call performed the false→true transition. A repeat
    /// carries the original timestamp and `false` here.
    pub newly_read: bool,
}

/// Applies the read-state business rule on top of the message store.
#[derive(Clone)]
pub struct ReadReceiptCoordinator {
    messages: MessageRepository,
}

impl ReadReceiptCoordinator {
    pub fn new(messages: MessageRepository) -> Self {
        Self { messages }
    }

    /// Mark a single message read on behalf of `reader`.
    ///
    /// Fails with `MessageNotFound` for unknown ids and `SelfReadRejected`
    /// when the reader authored the message; in both cases the row is left
    /// untouched.
    pub async fn mark_read(&self, message_id: i64, reader: &Principal) -> ChatResult<ReadReceipt> {
        let message = self
            .messages
            .find_by_id(message_id)
            .await?
            .ok_or_else(|| ChatError::message_not_found(message_id))?;

        if message.sender_id == reader.id {
            return Err(ChatError::self_read_rejected(message_id));
        }

        let now = chrono::Utc::now().to_rfc3339();

        if message.is_read {
            return Ok(ReadReceipt {
                message_id,
                read_at: message.read_at.unwrap_or(now),
                newly_read: false,
            });
        }

        if self.messages.mark_read(message_id, &now).await? {
            return Ok(ReadReceipt {
                message_id,
                read_at: now,
                newly_read: true,
            });
        }

        // Lost a race against another session; report the stored timestamp.
        debug!(message_id, "concurrent read receipt, keeping original timestamp");
        let stored = self
            .messages
            .find_by_id(message_id)
            .await?
            .ok_or_else(|| ChatError::message_not_found(message_id))?;
        Ok(ReadReceipt {
            message_id,
            read_at: stored.read_at.unwrap_or(now),
            newly_read: false,
        })
    }

    /// Mark every unread message in a conversation that was not authored by
    /// `reader`. Each row transitions independently; returns the number of
    /// rows this call actually transitioned.
    pub async fn mark_conversation_read(
        &self,
        conversation_id: i64,
        reader: &Principal,
    ) -> ChatResult<i64> {
        let unread = self.messages.list_unread(conversation_id, reader.id).await?;

        let mut marked = 0;
        for message in unread {
            if self.mark_read(message.id, reader).await?.newly_read {
                marked += 1;
            }
        }
        Ok(marked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use harvestchat_config::DatabaseConfig;
    use harvestchat_database::ConversationRepository;
    use sqlx::SqlitePool;
    use tempfile::TempDir;

    async fn setup() -> (ReadReceiptCoordinator, MessageRepository, i64, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let config = DatabaseConfig {
            url: format!("sqlite://{}", temp_dir.path().join("test.db").display()),
            max_connections: 1,
        };
        let pool: SqlitePool = harvestchat_database::initialize_database(&config)
            .await
            .unwrap();

        let conversation_id = ConversationRepository::new(pool.clone())
            .create(&[1, 2])
            .await
            .unwrap()
            .id;
        let messages = MessageRepository::new(pool);
        (
            ReadReceiptCoordinator::new(messages.clone()),
            messages,
            conversation_id,
            temp_dir,
        )
    }

    fn amina() -> Principal {
        Principal::new(1, "amina")
    }

    fn bakary() -> Principal {
        Principal::new(2, "bakary")
    }

    #[tokio::test]
    async fn sender_cannot_read_own_message() {
        let (coordinator, messages, conversation_id, _tmp) = setup().await;
        let message = messages
            .append(conversation_id, 1, "amina", "hello")
            .await
            .unwrap();

        let error = coordinator.mark_read(message.id, &amina()).await.unwrap_err();
        assert!(matches!(error, ChatError::SelfReadRejected { .. }));

        let stored = messages.find_by_id(message.id).await.unwrap().unwrap();
        assert!(!stored.is_read);
        assert!(stored.read_at.is_none());
    }

    #[tokio::test]
    async fn unknown_message_is_not_found() {
        let (coordinator, _messages, _conversation_id, _tmp) = setup().await;

        let error = coordinator.mark_read(404, &bakary()).await.unwrap_err();
        assert!(matches!(error, ChatError::MessageNotFound { id: 404 }));
    }

    #[tokio::test]
    async fn transition_happens_exactly_once() {
        let (coordinator, messages, conversation_id, _tmp) = setup().await;
        let message = messages
            .append(conversation_id, 1, "amina", "hello")
            .await
            .unwrap();

        let first = coordinator.mark_read(message.id, &bakary()).await.unwrap();
        assert!(first.newly_read);

        let second = coordinator.mark_read(message.id, &bakary()).await.unwrap();
        assert!(!second.newly_read);
        assert_eq!(second.read_at, first.read_at);

        let stored = messages.find_by_id(message.id).await.unwrap().unwrap();
        assert_eq!(stored.read_at.as_deref(), Some(first.read_at.as_str()));
    }

    #[tokio::test]
    async fn bulk_mark_covers_exactly_the_unread_non_own_set() {
        let (coordinator, messages, conversation_id, _tmp) = setup().await;

        // Two from amina, one from bakary, one from amina already read.
        messages.append(conversation_id, 1, "amina", "one").await.unwrap();
        messages.append(conversation_id, 1, "amina", "two").await.unwrap();
        messages.append(conversation_id, 2, "bakary", "reply").await.unwrap();
        let read = messages
            .append(conversation_id, 1, "amina", "three")
            .await
            .unwrap();
        coordinator.mark_read(read.id, &bakary()).await.unwrap();

        let marked = coordinator
            .mark_conversation_read(conversation_id, &bakary())
            .await
            .unwrap();
        assert_eq!(marked, 2);

        assert_eq!(messages.unread_count(conversation_id, 2).await.unwrap(), 0);
        // Bakary's own message stays unread for amina's bulk run to pick up.
        assert_eq!(messages.unread_count(conversation_id, 1).await.unwrap(), 1);

        let repeat = coordinator
            .mark_conversation_read(conversation_id, &bakary())
            .await
            .unwrap();
        assert_eq!(repeat, 0);
    }
}
