//! Message entity definitions

use serde::{Deserialize, Serialize};

/// One message in a conversation's append-only log.
///
/// `sender_username` is denormalised from the authenticated principal at
/// append time; the user store itself lives outside this service. `read_at`
/// is set exactly once, when `is_read` transitions false to true.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,
    pub conversation_id: i64,
    pub sender_id: i64,
    pub sender_username: String,
    pub content: String,
    pub created_at: String,
    pub is_read: bool,
    pub read_at: Option<String>,
}
