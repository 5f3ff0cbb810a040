//! Repository for conversation data access operations.

use crate::entities::Conversation;
use crate::types::ChatResult;
use sqlx::{Row, SqlitePool};
use tracing::info;

/// Repository for conversation database operations
#[derive(Clone)]
pub struct ConversationRepository {
    pool: SqlitePool,
}

impl ConversationRepository {
    /// Create a new conversation repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a conversation for the given participants.
    ///
    /// Callers are expected to have checked for an existing conversation via
    /// [`find_by_participants`](Self::find_by_participants) first.
    pub async fn create(&self, participant_ids: &[i64]) -> ChatResult<Conversation> {
        let now = chrono::Utc::now().to_rfc3339();

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query("INSERT INTO conversations (created_at, updated_at) VALUES (?, ?)")
            .bind(&now)
            .bind(&now)
            .execute(&mut *tx)
            .await?;
        let conversation_id = result.last_insert_rowid();

        for principal_id in participant_ids {
            sqlx::query(
                "INSERT INTO conversation_participants (conversation_id, principal_id) VALUES (?, ?)",
            )
            .bind(conversation_id)
            .bind(principal_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        info!(
            conversation_id,
            participants = ?participant_ids,
            "created new conversation"
        );

        Ok(Conversation {
            id: conversation_id,
            participant_ids: participant_ids.to_vec(),
            created_at: now.clone(),
            updated_at: now,
        })
    }

    /// Find a conversation by its identifier.
    pub async fn find_by_id(&self, conversation_id: i64) -> ChatResult<Option<Conversation>> {
        let row = sqlx::query("SELECT id, created_at, updated_at FROM conversations WHERE id = ?")
            .bind(conversation_id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(self.hydrate(row).await?)),
            None => Ok(None),
        }
    }

    /// Find the conversation whose participant set is exactly this pair.
    ///
    /// The lookup is symmetric: `(a, b)` and `(b, a)` resolve to the same
    /// thread, so a pair never accumulates duplicate conversations. A larger
    /// conversation that happens to contain both principals does not match.
    pub async fn find_by_participants(&self, a: i64, b: i64) -> ChatResult<Option<Conversation>> {
        let row = sqlx::query(
            "SELECT c.id, c.created_at, c.updated_at
             FROM conversations c
             JOIN conversation_participants pa
               ON pa.conversation_id = c.id AND pa.principal_id = ?
             JOIN conversation_participants pb
               ON pb.conversation_id = c.id AND pb.principal_id = ?
             WHERE ? != ?
               AND (SELECT COUNT(*) FROM conversation_participants p
                    WHERE p.conversation_id = c.id) = 2
             LIMIT 1",
        )
        .bind(a)
        .bind(b)
        .bind(a)
        .bind(b)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(self.hydrate(row).await?)),
            None => Ok(None),
        }
    }

    /// List conversations the principal participates in, most recent
    /// activity first.
    pub async fn list_for_participant(&self, principal_id: i64) -> ChatResult<Vec<Conversation>> {
        let rows = sqlx::query(
            "SELECT c.id, c.created_at, c.updated_at
             FROM conversations c
             JOIN conversation_participants p ON p.conversation_id = c.id
             WHERE p.principal_id = ?
             ORDER BY c.updated_at DESC, c.id DESC",
        )
        .bind(principal_id)
        .fetch_all(&self.pool)
        .await?;

        let mut conversations = Vec::with_capacity(rows.len());
        for row in rows {
            conversations.push(self.hydrate(row).await?);
        }
        Ok(conversations)
    }

    /// Whether the principal is a participant of the conversation.
    pub async fn is_participant(&self, conversation_id: i64, principal_id: i64) -> ChatResult<bool> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS count FROM conversation_participants
             WHERE conversation_id = ? AND principal_id = ?",
        )
        .bind(conversation_id)
        .bind(principal_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.try_get::<i64, _>("count")? > 0)
    }

    async fn participant_ids(&self, conversation_id: i64) -> ChatResult<Vec<i64>> {
        let rows = sqlx::query(
            "SELECT principal_id FROM conversation_participants
             WHERE conversation_id = ? ORDER BY principal_id",
        )
        .bind(conversation_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| Ok(row.try_get("principal_id")?))
            .collect()
    }

    async fn hydrate(&self, row: sqlx::sqlite::SqliteRow) -> ChatResult<Conversation> {
        let id: i64 = row.try_get("id")?;
        Ok(Conversation {
            id,
            participant_ids: self.participant_ids(id).await?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use harvestchat_config::DatabaseConfig;
    use tempfile::TempDir;

    async fn create_test_pool() -> (SqlitePool, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let config = DatabaseConfig {
            url: format!("sqlite://{}", temp_dir.path().join("test.db").display()),
            max_connections: 1,
        };
        let pool = crate::connection::prepare_database(&config).await.unwrap();
        crate::migrations::run_migrations(&pool).await.unwrap();
        (pool, temp_dir)
    }

    #[tokio::test]
    async fn create_and_find_by_id() {
        let (pool, _temp_dir) = create_test_pool().await;
        let repo = ConversationRepository::new(pool);

        let created = repo.create(&[1, 2]).await.unwrap();
        assert!(created.id > 0);
        assert_eq!(created.participant_ids, vec![1, 2]);

        let found = repo.find_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(found, created);
    }

    #[tokio::test]
    async fn pair_lookup_matches_both_orderings() {
        let (pool, _temp_dir) = create_test_pool().await;
        let repo = ConversationRepository::new(pool);

        let created = repo.create(&[1, 2]).await.unwrap();

        let ab = repo.find_by_participants(1, 2).await.unwrap().unwrap();
        let ba = repo.find_by_participants(2, 1).await.unwrap().unwrap();
        assert_eq!(ab.id, created.id);
        assert_eq!(ba.id, created.id);

        assert!(repo.find_by_participants(1, 3).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn pair_lookup_requires_exactly_the_pair() {
        let (pool, _temp_dir) = create_test_pool().await;
        let repo = ConversationRepository::new(pool);

        // A larger conversation containing both principals is not a match.
        repo.create(&[1, 2, 3]).await.unwrap();
        assert!(repo.find_by_participants(1, 2).await.unwrap().is_none());

        let pair = repo.create(&[1, 2]).await.unwrap();
        let found = repo.find_by_participants(1, 2).await.unwrap().unwrap();
        assert_eq!(found.id, pair.id);
    }

    #[tokio::test]
    async fn membership_check() {
        let (pool, _temp_dir) = create_test_pool().await;
        let repo = ConversationRepository::new(pool);

        let conversation = repo.create(&[1, 2]).await.unwrap();

        assert!(repo.is_participant(conversation.id, 1).await.unwrap());
        assert!(repo.is_participant(conversation.id, 2).await.unwrap());
        assert!(!repo.is_participant(conversation.id, 3).await.unwrap());
    }

    #[tokio::test]
    async fn list_for_participant_orders_by_activity() {
        let (pool, _temp_dir) = create_test_pool().await;
        let repo = ConversationRepository::new(pool.clone());

        let first = repo.create(&[1, 2]).await.unwrap();
        let second = repo.create(&[1, 3]).await.unwrap();

        // Bump the first conversation's activity past the second's.
        sqlx::query("UPDATE conversations SET updated_at = ? WHERE id = ?")
            .bind("2999-01-01T00:00:00+00:00")
            .bind(first.id)
            .execute(&pool)
            .await
            .unwrap();

        let listed = repo.list_for_participant(1).await.unwrap();
        assert_eq!(
            listed.iter().map(|c| c.id).collect::<Vec<_>>(),
            vec![first.id, second.id]
        );

        assert_eq!(repo.list_for_participant(3).await.unwrap().len(), 1);
        assert!(repo.list_for_participant(9).await.unwrap().is_empty());
    }
}
