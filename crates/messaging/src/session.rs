//! Per-connection session handling.
//!
//! A [`ChatSession`] is created once the connecting principal has passed the
//! membership gate, lives for exactly one socket, and translates inbound
//! client events into store mutations plus registry broadcasts. The registry
//! slot is released by a drop guard, so cleanup also runs when the transport
//! dies mid-event.

use crate::conversations::ConversationService;
use crate::events::{ClientEvent, ServerEvent};
use crate::principal::Principal;
use crate::read_receipts::ReadReceiptCoordinator;
use crate::registry::ChannelRegistry;
use harvestchat_database::{ChatError, ChatResult, MessageRepository};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::debug;

/// Releases the registry slot when the session ends, however it ends.
struct SessionGuard {
    registry: Arc<ChannelRegistry>,
    conversation_id: i64,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.registry.leave(self.conversation_id);
    }
}

/// One live connection, bound to a principal and a conversation.
pub struct ChatSession {
    registry: Arc<ChannelRegistry>,
    messages: MessageRepository,
    coordinator: ReadReceiptCoordinator,
    principal: Principal,
    conversation_id: i64,
    _guard: SessionGuard,
}

impl ChatSession {
    /// Validate membership and subscribe to the conversation's channel.
    ///
    /// A non-participant is refused before any registry join happens; the
    /// caller should close the transport without a structured payload.
    pub async fn connect(
        registry: Arc<ChannelRegistry>,
        conversations: &ConversationService,
        messages: MessageRepository,
        coordinator: ReadReceiptCoordinator,
        principal: Principal,
        conversation_id: i64,
    ) -> ChatResult<(Self, broadcast::Receiver<ServerEvent>)> {
        conversations.get(conversation_id, principal.id).await?;

        let receiver = registry.join(conversation_id);
        let guard = SessionGuard {
            registry: registry.clone(),
            conversation_id,
        };
        debug!(
            conversation_id,
            principal_id = principal.id,
            "session joined conversation"
        );

        Ok((
            Self {
                registry,
                messages,
                coordinator,
                principal,
                conversation_id,
                _guard: guard,
            },
            receiver,
        ))
    }

    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    /// Dispatch one inbound event.
    ///
    /// Failures are logged and swallowed: the live socket never receives a
    /// structured error, matching the HTTP surface being the place for
    /// structured failures (see DESIGN.md).
    pub async fn handle_event(&self, event: ClientEvent) {
        let outcome = match event {
            ClientEvent::Message { message } => self.handle_new_message(&message).await,
            ClientEvent::MessageRead { message_id } => self.handle_message_read(message_id).await,
        };

        if let Err(error) = outcome {
            debug!(
                conversation_id = self.conversation_id,
                principal_id = self.principal.id,
                %error,
                "dropped client event"
            );
        }
    }

    /// Persist a new message, then fan it out. A failed persist never
    /// broadcasts.
    async fn handle_new_message(&self, content: &str) -> ChatResult<()> {
        if content.trim().is_empty() {
            return Err(ChatError::EmptyContent);
        }

        let message = self
            .messages
            .append(
                self.conversation_id,
                self.principal.id,
                &self.principal.username,
                content,
            )
            .await?;

        self.registry
            .broadcast(self.conversation_id, ServerEvent::message(&message));
        Ok(())
    }

    /// Run the read-receipt rule; only a fresh transition is worth a
    /// notification.
    ///
    /// The session is bound to one conversation, so a message id from any
    /// other conversation is invisible here, same as an unknown id.
    async fn handle_message_read(&self, message_id: i64) -> ChatResult<()> {
        let message = self
            .messages
            .find_by_id(message_id)
            .await?
            .ok_or_else(|| ChatError::message_not_found(message_id))?;
        if message.conversation_id != self.conversation_id {
            return Err(ChatError::message_not_found(message_id));
        }

        let receipt = self.coordinator.mark_read(message_id, &self.principal).await?;

        if receipt.newly_read {
            self.registry.broadcast(
                self.conversation_id,
                ServerEvent::message_read(message_id, &self.principal, receipt.read_at),
            );
        }
        Ok(())
    }
}
