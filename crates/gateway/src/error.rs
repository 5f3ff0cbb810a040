//! Error types for the gateway layer.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use harvestchat_database::ChatError;
use serde_json::json;
use thiserror::Error;

/// Gateway error types
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Internal server error: {0}")]
    InternalError(String),
}

impl GatewayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::AuthenticationFailed(_) => StatusCode::UNAUTHORIZED,
            GatewayError::Forbidden(_) => StatusCode::FORBIDDEN,
            GatewayError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            GatewayError::NotFound(_) => StatusCode::NOT_FOUND,
            GatewayError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_response = json!({
            "error": status.as_str(),
            "message": self.to_string(),
        });

        (status, Json(error_response)).into_response()
    }
}

/// Result type for gateway operations
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Map domain failures onto HTTP statuses. Non-membership answers exactly
/// like a missing conversation so outsiders cannot probe for existence.
impl From<ChatError> for GatewayError {
    fn from(error: ChatError) -> Self {
        match error {
            ChatError::ConversationNotFound { id } => {
                GatewayError::NotFound(format!("Conversation {id} not found"))
            }
            ChatError::NotParticipant {
                conversation_id, ..
            } => GatewayError::NotFound(format!("Conversation {conversation_id} not found")),
            ChatError::MessageNotFound { id } => {
                GatewayError::NotFound(format!("Message {id} not found"))
            }
            ChatError::SelfReadRejected { .. } => {
                GatewayError::Forbidden("Cannot mark your own message as read".to_string())
            }
            ChatError::EmptyContent => {
                GatewayError::InvalidRequest("Message content cannot be empty".to_string())
            }
            ChatError::Validation { message } => GatewayError::InvalidRequest(message),
            ChatError::Database(error) => GatewayError::InternalError(error.to_string()),
        }
    }
}

impl From<sqlx::Error> for GatewayError {
    fn from(error: sqlx::Error) -> Self {
        GatewayError::InternalError(error.to_string())
    }
}
