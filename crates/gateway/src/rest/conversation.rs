//! Conversation REST endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use crate::error::GatewayResult;
use crate::middleware::AuthenticatedPrincipal;
use crate::rest::message::MessageResponse;
use crate::state::GatewayState;
use harvestchat_messaging::ConversationOverview;

#[derive(Debug, Serialize, ToSchema)]
pub struct ConversationResponse {
    pub id: i64,
    pub participant_ids: Vec<i64>,
    /// The participant that is not the requesting principal.
    pub other_participant_id: Option<i64>,
    pub created_at: String,
    pub updated_at: String,
    pub last_message: Option<MessageResponse>,
    pub unread_count: i64,
}

impl ConversationResponse {
    fn for_principal(overview: ConversationOverview, principal_id: i64) -> Self {
        Self {
            id: overview.conversation.id,
            participant_ids: overview.conversation.participant_ids,
            other_participant_id: overview.other_participant_id,
            created_at: overview.conversation.created_at,
            updated_at: overview.conversation.updated_at,
            last_message: overview
                .last_message
                .map(|message| MessageResponse::for_principal(message, principal_id)),
            unread_count: overview.unread_count,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateConversationRequest {
    /// The other participant to open a conversation with.
    pub participant_id: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UnreadCountResponse {
    pub conversation_id: i64,
    pub unread_count: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MarkConversationReadResponse {
    pub status: String,
    pub conversation_id: i64,
    /// Messages this request actually transitioned to read.
    pub marked_count: i64,
}

/// Create conversation routes
pub fn create_conversation_routes() -> Router<Arc<GatewayState>> {
    Router::new()
        .route(
            "/conversations",
            axum::routing::get(list_conversations).post(create_conversation),
        )
        .route(
            "/conversations/:conversation_id",
            axum::routing::get(get_conversation),
        )
        .route(
            "/conversations/:conversation_id/unread_count",
            axum::routing::get(unread_count),
        )
        .route(
            "/conversations/:conversation_id/mark_read",
            axum::routing::post(mark_conversation_read),
        )
}

#[utoipa::path(
    get,
    path = "/api/conversations",
    tag = "Conversations",
    responses(
        (status = 200, description = "The principal's conversations, most recent first", body = Vec<ConversationResponse>),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn list_conversations(
    State(state): State<Arc<GatewayState>>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
) -> GatewayResult<Json<Vec<ConversationResponse>>> {
    let overviews = state.conversations.list_for(principal.id).await?;

    let responses = overviews
        .into_iter()
        .map(|overview| ConversationResponse::for_principal(overview, principal.id))
        .collect();
    Ok(Json(responses))
}

#[utoipa::path(
    post,
    path = "/api/conversations",
    tag = "Conversations",
    request_body = CreateConversationRequest,
    responses(
        (status = 200, description = "Existing conversation for the pair", body = ConversationResponse),
        (status = 201, description = "Conversation created", body = ConversationResponse),
        (status = 400, description = "Cannot open a conversation with yourself"),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn create_conversation(
    State(state): State<Arc<GatewayState>>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
    Json(payload): Json<CreateConversationRequest>,
) -> GatewayResult<impl IntoResponse> {
    let (conversation, created) = state
        .conversations
        .open(principal.id, payload.participant_id)
        .await?;

    let overview = state
        .conversations
        .get_overview(conversation.id, principal.id)
        .await?;
    let response = ConversationResponse::for_principal(overview, principal.id);

    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(response)))
}

#[utoipa::path(
    get,
    path = "/api/conversations/{conversation_id}",
    tag = "Conversations",
    params(
        ("conversation_id" = i64, Path, description = "Conversation ID")
    ),
    responses(
        (status = 200, description = "Conversation details", body = ConversationResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Conversation not found or caller not a participant"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn get_conversation(
    Path(conversation_id): Path<i64>,
    State(state): State<Arc<GatewayState>>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
) -> GatewayResult<Json<ConversationResponse>> {
    let overview = state
        .conversations
        .get_overview(conversation_id, principal.id)
        .await?;
    Ok(Json(ConversationResponse::for_principal(
        overview,
        principal.id,
    )))
}

#[utoipa::path(
    get,
    path = "/api/conversations/{conversation_id}/unread_count",
    tag = "Conversations",
    params(
        ("conversation_id" = i64, Path, description = "Conversation ID")
    ),
    responses(
        (status = 200, description = "Unread messages authored by others", body = UnreadCountResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Conversation not found or caller not a participant"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn unread_count(
    Path(conversation_id): Path<i64>,
    State(state): State<Arc<GatewayState>>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
) -> GatewayResult<Json<UnreadCountResponse>> {
    let unread_count = state
        .conversations
        .unread_count(conversation_id, principal.id)
        .await?;

    Ok(Json(UnreadCountResponse {
        conversation_id,
        unread_count,
    }))
}

#[utoipa::path(
    post,
    path = "/api/conversations/{conversation_id}/mark_read",
    tag = "Conversations",
    params(
        ("conversation_id" = i64, Path, description = "Conversation ID")
    ),
    responses(
        (status = 200, description = "Unread messages from other participants marked read", body = MarkConversationReadResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Conversation not found or caller not a participant"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn mark_conversation_read(
    Path(conversation_id): Path<i64>,
    State(state): State<Arc<GatewayState>>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
) -> GatewayResult<Json<MarkConversationReadResponse>> {
    state.conversations.get(conversation_id, principal.id).await?;

    let marked_count = state
        .read_receipts
        .mark_conversation_read(conversation_id, &principal)
        .await?;

    Ok(Json(MarkConversationReadResponse {
        status: "conversation read".to_string(),
        conversation_id,
        marked_count,
    }))
}
