//! Shared application state for the gateway.

use harvestchat_config::ChatConfig;
use harvestchat_database::{ConversationRepository, MessageRepository};
use harvestchat_messaging::{ChannelRegistry, ConversationService, ReadReceiptCoordinator};
use sqlx::SqlitePool;
use std::sync::Arc;

/// Everything the REST handlers and socket sessions share: the store
/// repositories, the conversation service, the read-receipt coordinator, and
/// the process-wide channel registry.
pub struct GatewayState {
    pub registry: Arc<ChannelRegistry>,
    pub conversations: ConversationService,
    pub messages: MessageRepository,
    pub read_receipts: ReadReceiptCoordinator,
}

impl GatewayState {
    pub fn new(pool: SqlitePool, chat: &ChatConfig) -> Self {
        let conversation_repo = ConversationRepository::new(pool.clone());
        let messages = MessageRepository::new(pool);

        Self {
            registry: Arc::new(ChannelRegistry::new(chat.broadcast_capacity)),
            conversations: ConversationService::new(conversation_repo, messages.clone()),
            read_receipts: ReadReceiptCoordinator::new(messages.clone()),
            messages,
        }
    }
}
