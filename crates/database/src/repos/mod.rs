//! Data access layer for the chat store.
//!
//! Repositories own all SQL; the messaging core and the gateway only see
//! entities and `ChatResult`.

pub mod conversation_repository;
pub mod message_repository;

pub use conversation_repository::ConversationRepository;
pub use message_repository::MessageRepository;
