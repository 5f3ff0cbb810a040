//! Conversation lifecycle and the membership gate.
//!
//! Every read or mutation of a conversation's messages goes through
//! [`ConversationService::get`], which reports non-membership the same way
//! as a missing conversation so non-members learn nothing about existence.

use crate::principal::Principal;
use harvestchat_database::{
    ChatError, ChatResult, Conversation, ConversationRepository, Message, MessageRepository,
};
use tracing::info;

/// A conversation as listed for one principal: the thread itself plus the
/// derived fields clients render in an inbox row.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversationOverview {
    pub conversation: Conversation,
    pub other_participant_id: Option<i64>,
    pub last_message: Option<Message>,
    pub unread_count: i64,
}

/// Conversation operations for the HTTP surface and the session handler.
#[derive(Clone)]
pub struct ConversationService {
    conversations: ConversationRepository,
    messages: MessageRepository,
}

impl ConversationService {
    pub fn new(conversations: ConversationRepository, messages: MessageRepository) -> Self {
        Self {
            conversations,
            messages,
        }
    }

    /// Open a conversation between the principal and another participant,
    /// reusing the existing thread for the pair in either ordering. Returns
    /// the conversation and whether it had to be created.
    pub async fn open(
        &self,
        principal_id: i64,
        participant_id: i64,
    ) -> ChatResult<(Conversation, bool)> {
        if principal_id == participant_id {
            return Err(ChatError::validation(
                "cannot open a conversation with yourself",
            ));
        }

        if let Some(existing) = self
            .conversations
            .find_by_participants(principal_id, participant_id)
            .await?
        {
            return Ok((existing, false));
        }

        let conversation = self
            .conversations
            .create(&[principal_id, participant_id])
            .await?;
        info!(
            conversation_id = conversation.id,
            principal_id, participant_id, "opened new conversation"
        );
        Ok((conversation, true))
    }

    /// Fetch a conversation, enforcing the membership gate.
    pub async fn get(&self, conversation_id: i64, principal_id: i64) -> ChatResult<Conversation> {
        let conversation = self
            .conversations
            .find_by_id(conversation_id)
            .await?
            .ok_or_else(|| ChatError::conversation_not_found(conversation_id))?;

        if !conversation.has_participant(principal_id) {
            return Err(ChatError::not_participant(conversation_id, principal_id));
        }
        Ok(conversation)
    }

    /// Inbox view: the principal's conversations, most recent activity
    /// first, each with last message and unread count.
    pub async fn list_for(&self, principal_id: i64) -> ChatResult<Vec<ConversationOverview>> {
        let conversations = self.conversations.list_for_participant(principal_id).await?;

        let mut overviews = Vec::with_capacity(conversations.len());
        for conversation in conversations {
            overviews.push(self.overview(conversation, principal_id).await?);
        }
        Ok(overviews)
    }

    /// Overview of a single gated conversation.
    pub async fn get_overview(
        &self,
        conversation_id: i64,
        principal_id: i64,
    ) -> ChatResult<ConversationOverview> {
        let conversation = self.get(conversation_id, principal_id).await?;
        self.overview(conversation, principal_id).await
    }

    /// Messages of a gated conversation in send order.
    pub async fn list_messages(
        &self,
        conversation_id: i64,
        principal_id: i64,
    ) -> ChatResult<Vec<Message>> {
        self.get(conversation_id, principal_id).await?;
        self.messages.list_for_conversation(conversation_id).await
    }

    /// Append a message on behalf of the principal (HTTP path; live fanout
    /// is the socket session's job).
    pub async fn send_message(
        &self,
        conversation_id: i64,
        sender: &Principal,
        content: &str,
    ) -> ChatResult<Message> {
        self.get(conversation_id, sender.id).await?;

        if content.trim().is_empty() {
            return Err(ChatError::EmptyContent);
        }

        self.messages
            .append(conversation_id, sender.id, &sender.username, content)
            .await
    }

    /// Unread-message count of a gated conversation for the principal.
    pub async fn unread_count(&self, conversation_id: i64, principal_id: i64) -> ChatResult<i64> {
        self.get(conversation_id, principal_id).await?;
        self.messages.unread_count(conversation_id, principal_id).await
    }

    async fn overview(
        &self,
        conversation: Conversation,
        principal_id: i64,
    ) -> ChatResult<ConversationOverview> {
        let last_message = self.messages.last_for_conversation(conversation.id).await?;
        let unread_count = self.messages.unread_count(conversation.id, principal_id).await?;

        Ok(ConversationOverview {
            other_participant_id: conversation.other_participant(principal_id),
            conversation,
            last_message,
            unread_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use harvestchat_config::DatabaseConfig;
    use tempfile::TempDir;

    async fn setup() -> (ConversationService, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let config = DatabaseConfig {
            url: format!("sqlite://{}", temp_dir.path().join("test.db").display()),
            max_connections: 1,
        };
        let pool = harvestchat_database::initialize_database(&config)
            .await
            .unwrap();
        let service = ConversationService::new(
            ConversationRepository::new(pool.clone()),
            MessageRepository::new(pool),
        );
        (service, temp_dir)
    }

    fn amina() -> Principal {
        Principal::new(1, "amina")
    }

    #[tokio::test]
    async fn open_reuses_existing_pair_in_either_order() {
        let (service, _tmp) = setup().await;

        let (created, was_created) = service.open(1, 2).await.unwrap();
        assert!(was_created);

        let (same, was_created) = service.open(2, 1).await.unwrap();
        assert!(!was_created);
        assert_eq!(same.id, created.id);
    }

    #[tokio::test]
    async fn open_rejects_self_conversation() {
        let (service, _tmp) = setup().await;
        let error = service.open(1, 1).await.unwrap_err();
        assert!(matches!(error, ChatError::Validation { .. }));
    }

    #[tokio::test]
    async fn membership_gate_hides_foreign_conversations() {
        let (service, _tmp) = setup().await;
        let (conversation, _) = service.open(1, 2).await.unwrap();

        let error = service.get(conversation.id, 3).await.unwrap_err();
        assert!(matches!(error, ChatError::NotParticipant { .. }));

        let error = service.list_messages(conversation.id, 3).await.unwrap_err();
        assert!(matches!(error, ChatError::NotParticipant { .. }));

        let error = service.get(999, 1).await.unwrap_err();
        assert!(matches!(error, ChatError::ConversationNotFound { .. }));
    }

    #[tokio::test]
    async fn send_message_validates_content() {
        let (service, _tmp) = setup().await;
        let (conversation, _) = service.open(1, 2).await.unwrap();

        let error = service
            .send_message(conversation.id, &amina(), "   ")
            .await
            .unwrap_err();
        assert!(matches!(error, ChatError::EmptyContent));

        let message = service
            .send_message(conversation.id, &amina(), "fresh tomatoes available")
            .await
            .unwrap();
        assert_eq!(message.sender_username, "amina");

        let listed = service.list_messages(conversation.id, 2).await.unwrap();
        assert_eq!(listed, vec![message]);
    }

    #[tokio::test]
    async fn overview_carries_inbox_fields() {
        let (service, _tmp) = setup().await;
        let (conversation, _) = service.open(1, 2).await.unwrap();

        service
            .send_message(conversation.id, &Principal::new(2, "bakary"), "hello")
            .await
            .unwrap();

        let overviews = service.list_for(1).await.unwrap();
        assert_eq!(overviews.len(), 1);

        let overview = &overviews[0];
        assert_eq!(overview.other_participant_id, Some(2));
        assert_eq!(overview.unread_count, 1);
        assert_eq!(
            overview.last_message.as_ref().map(|m| m.content.as_str()),
            Some("hello")
        );
    }
}
