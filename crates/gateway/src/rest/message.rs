//! Message REST endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use crate::error::{GatewayError, GatewayResult};
use crate::middleware::AuthenticatedPrincipal;
use crate::state::GatewayState;
use harvestchat_database::{ChatError, Message};

#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub id: i64,
    pub conversation_id: i64,
    pub sender_id: i64,
    pub sender_username: String,
    pub content: String,
    pub timestamp: String,
    pub is_read: bool,
    pub read_at: Option<String>,
    /// Whether the requesting principal authored this message.
    pub is_mine: bool,
}

impl MessageResponse {
    pub fn for_principal(message: Message, principal_id: i64) -> Self {
        Self {
            id: message.id,
            conversation_id: message.conversation_id,
            is_mine: message.sender_id == principal_id,
            sender_id: message.sender_id,
            sender_username: message.sender_username,
            content: message.content,
            timestamp: message.created_at,
            is_read: message.is_read,
            read_at: message.read_at,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateMessageRequest {
    pub content: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MarkReadResponse {
    pub status: String,
    pub message_id: i64,
    pub read_at: String,
}

/// Create message routes
pub fn create_message_routes() -> Router<Arc<GatewayState>> {
    Router::new()
        .route(
            "/conversations/:conversation_id/messages",
            axum::routing::get(list_messages).post(create_message),
        )
        .route(
            "/messages/:message_id/mark_read",
            axum::routing::post(mark_message_read),
        )
}

#[utoipa::path(
    get,
    path = "/api/conversations/{conversation_id}/messages",
    tag = "Messages",
    params(
        ("conversation_id" = i64, Path, description = "Conversation ID")
    ),
    responses(
        (status = 200, description = "Messages in send order", body = Vec<MessageResponse>),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Conversation not found or caller not a participant"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn list_messages(
    Path(conversation_id): Path<i64>,
    State(state): State<Arc<GatewayState>>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
) -> GatewayResult<Json<Vec<MessageResponse>>> {
    let messages = state
        .conversations
        .list_messages(conversation_id, principal.id)
        .await?;

    let responses = messages
        .into_iter()
        .map(|message| MessageResponse::for_principal(message, principal.id))
        .collect();
    Ok(Json(responses))
}

#[utoipa::path(
    post,
    path = "/api/conversations/{conversation_id}/messages",
    tag = "Messages",
    params(
        ("conversation_id" = i64, Path, description = "Conversation ID")
    ),
    request_body = CreateMessageRequest,
    responses(
        (status = 201, description = "Message stored", body = MessageResponse),
        (status = 400, description = "Empty content"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Conversation not found or caller not a participant"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn create_message(
    Path(conversation_id): Path<i64>,
    State(state): State<Arc<GatewayState>>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
    Json(payload): Json<CreateMessageRequest>,
) -> GatewayResult<impl IntoResponse> {
    let message = state
        .conversations
        .send_message(conversation_id, &principal, &payload.content)
        .await?;

    let response = MessageResponse::for_principal(message, principal.id);
    Ok((StatusCode::CREATED, Json(response)))
}

#[utoipa::path(
    post,
    path = "/api/messages/{message_id}/mark_read",
    tag = "Messages",
    params(
        ("message_id" = i64, Path, description = "Message ID")
    ),
    responses(
        (status = 200, description = "Message marked read", body = MarkReadResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Caller authored the message"),
        (status = 404, description = "Message not found or caller not a participant"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn mark_message_read(
    Path(message_id): Path<i64>,
    State(state): State<Arc<GatewayState>>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
) -> GatewayResult<Json<MarkReadResponse>> {
    let message = state
        .messages
        .find_by_id(message_id)
        .await?
        .ok_or_else(|| GatewayError::NotFound(format!("Message {message_id} not found")))?;

    // Membership gate first. An outsider's 404 carries the same body as an
    // unknown message id, never the conversation id.
    if let Err(error) = state
        .conversations
        .get(message.conversation_id, principal.id)
        .await
    {
        return Err(match error {
            ChatError::Database(_) => error.into(),
            _ => GatewayError::NotFound(format!("Message {message_id} not found")),
        });
    }

    let receipt = state.read_receipts.mark_read(message_id, &principal).await?;

    Ok(Json(MarkReadResponse {
        status: if receipt.newly_read {
            "message read".to_string()
        } else {
            "message already read".to_string()
        },
        message_id: receipt.message_id,
        read_at: receipt.read_at,
    }))
}
