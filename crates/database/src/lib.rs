//! # Harvestchat Database Crate
//!
//! SQLite persistence for the chat service: connection preparation,
//! embedded migrations, the conversation and message entities, and the
//! repositories the messaging core builds on.

pub mod connection;
pub mod entities;
pub mod migrations;
pub mod repos;
pub mod types;

pub use connection::prepare_database;
pub use entities::{Conversation, Message};
pub use migrations::run_migrations;
pub use repos::{ConversationRepository, MessageRepository};
pub use types::{ChatError, ChatResult};

use harvestchat_config::DatabaseConfig;
use sqlx::SqlitePool;

/// Connect to the database and bring the schema up to date.
pub async fn initialize_database(config: &DatabaseConfig) -> anyhow::Result<SqlitePool> {
    let pool = prepare_database(config).await?;
    run_migrations(&pool).await?;
    Ok(pool)
}
