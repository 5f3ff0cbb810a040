//! Conversation entity definitions

use serde::{Deserialize, Serialize};

/// A persistent chat thread between a fixed set of participants.
///
/// The participant set is immutable after creation; `updated_at` tracks the
/// last message activity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: i64,
    pub participant_ids: Vec<i64>,
    pub created_at: String,
    pub updated_at: String,
}

impl Conversation {
    /// Whether the given principal belongs to this conversation.
    pub fn has_participant(&self, principal_id: i64) -> bool {
        self.participant_ids.contains(&principal_id)
    }

    /// The participant that is not `principal_id`, for two-party threads.
    pub fn other_participant(&self, principal_id: i64) -> Option<i64> {
        self.participant_ids
            .iter()
            .copied()
            .find(|id| *id != principal_id)
    }
}
