//! Repository for message data access operations.

use crate::entities::Message;
use crate::types::ChatResult;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use tracing::info;

const MESSAGE_COLUMNS: &str =
    "id, conversation_id, sender_id, sender_username, content, created_at, is_read, read_at";

/// Repository for message database operations
#[derive(Clone)]
pub struct MessageRepository {
    pool: SqlitePool,
}

impl MessageRepository {
    /// Create a new message repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Append a message to a conversation's log and bump the conversation's
    /// last-activity timestamp.
    pub async fn append(
        &self,
        conversation_id: i64,
        sender_id: i64,
        sender_username: &str,
        content: &str,
    ) -> ChatResult<Message> {
        let now = chrono::Utc::now().to_rfc3339();

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "INSERT INTO messages
                 (conversation_id, sender_id, sender_username, content, created_at, is_read)
             VALUES (?, ?, ?, ?, ?, 0)",
        )
        .bind(conversation_id)
        .bind(sender_id)
        .bind(sender_username)
        .bind(content)
        .bind(&now)
        .execute(&mut *tx)
        .await?;
        let message_id = result.last_insert_rowid();

        sqlx::query("UPDATE conversations SET updated_at = ? WHERE id = ?")
            .bind(&now)
            .bind(conversation_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(message_id, conversation_id, sender_id, "appended new message");

        Ok(Message {
            id: message_id,
            conversation_id,
            sender_id,
            sender_username: sender_username.to_string(),
            content: content.to_string(),
            created_at: now,
            is_read: false,
            read_at: None,
        })
    }

    /// Find a message by its identifier.
    pub async fn find_by_id(&self, message_id: i64) -> ChatResult<Option<Message>> {
        let row = sqlx::query(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = ?"
        ))
        .bind(message_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| to_message(&row)).transpose()
    }

    /// List a conversation's messages in send order.
    pub async fn list_for_conversation(&self, conversation_id: i64) -> ChatResult<Vec<Message>> {
        let rows = sqlx::query(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages
             WHERE conversation_id = ?
             ORDER BY created_at ASC, id ASC"
        ))
        .bind(conversation_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(to_message).collect()
    }

    /// The most recent message of a conversation, if any.
    pub async fn last_for_conversation(&self, conversation_id: i64) -> ChatResult<Option<Message>> {
        let row = sqlx::query(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages
             WHERE conversation_id = ?
             ORDER BY created_at DESC, id DESC
             LIMIT 1"
        ))
        .bind(conversation_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| to_message(&row)).transpose()
    }

    /// Unread messages in a conversation that were not sent by
    /// `excluding_sender`, in send order.
    pub async fn list_unread(
        &self,
        conversation_id: i64,
        excluding_sender: i64,
    ) -> ChatResult<Vec<Message>> {
        let rows = sqlx::query(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages
             WHERE conversation_id = ? AND is_read = 0 AND sender_id != ?
             ORDER BY created_at ASC, id ASC"
        ))
        .bind(conversation_id)
        .bind(excluding_sender)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(to_message).collect()
    }

    /// Count unread messages for a principal in a conversation.
    pub async fn unread_count(&self, conversation_id: i64, principal_id: i64) -> ChatResult<i64> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS count FROM messages
             WHERE conversation_id = ? AND is_read = 0 AND sender_id != ?",
        )
        .bind(conversation_id)
        .bind(principal_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.try_get("count")?)
    }

    /// Flip a message's read flag, recording `read_at`.
    ///
    /// The update is guarded on `is_read = 0` so the transition happens at
    /// most once even under concurrent readers. Returns whether this call
    /// performed the transition.
    pub async fn mark_read(&self, message_id: i64, read_at: &str) -> ChatResult<bool> {
        let result =
            sqlx::query("UPDATE messages SET is_read = 1, read_at = ? WHERE id = ? AND is_read = 0")
                .bind(read_at)
                .bind(message_id)
                .execute(&self.pool)
                .await?;

        let transitioned = result.rows_affected() == 1;
        if transitioned {
            info!(message_id, read_at, "marked message as read");
        }
        Ok(transitioned)
    }
}

fn to_message(row: &SqliteRow) -> ChatResult<Message> {
    Ok(Message {
        id: row.try_get("id")?,
        conversation_id: row.try_get("conversation_id")?,
        sender_id: row.try_get("sender_id")?,
        sender_username: row.try_get("sender_username")?,
        content: row.try_get("content")?,
        created_at: row.try_get("created_at")?,
        is_read: row.try_get("is_read")?,
        read_at: row.try_get("read_at")?,
    })
}
