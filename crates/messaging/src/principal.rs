//! The authenticated actor behind a request or connection.

use serde::{Deserialize, Serialize};

/// Identity forwarded by the upstream auth layer. Token issuance and user
/// records live outside this service; the chat core only ever sees the id
/// and the display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: i64,
    pub username: String,
}

impl Principal {
    pub fn new(id: i64, username: impl Into<String>) -> Self {
        Self {
            id,
            username: username.into(),
        }
    }
}
