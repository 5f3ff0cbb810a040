//! # Harvestchat Gateway Crate
//!
//! The API gateway layer: HTTP REST endpoints and the conversation
//! WebSocket, routed onto the messaging services.
//!
//! ## Architecture
//!
//! - **REST**: conversation and message endpoints with OpenAPI documentation
//! - **WebSocket**: one live socket per (principal, conversation)
//! - **State**: shared repositories, services, and the channel registry
//! - **Middleware**: principal extraction, CORS, request logging

pub mod error;
pub mod middleware;
pub mod rest;
pub mod state;
pub mod websocket;

pub use error::{GatewayError, GatewayResult};
pub use middleware::AuthenticatedPrincipal;
pub use state::GatewayState;

use axum::{http::Method, middleware as axum_middleware, Router};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
#[cfg(debug_assertions)]
use utoipa::OpenApi;
#[cfg(debug_assertions)]
use utoipa_swagger_ui::SwaggerUi;

/// Create the main application router with all routes
pub fn create_router(state: GatewayState) -> Router {
    let arc_state = Arc::new(state);
    let router = Router::new()
        .merge(rest::create_rest_routes().with_state(arc_state.clone()))
        .merge(websocket::create_websocket_routes().with_state(arc_state))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET, Method::POST])
                .allow_headers(Any),
        )
        .layer(axum_middleware::from_fn(middleware::logging_middleware));

    // Serve Swagger UI in debug builds only.
    #[cfg(debug_assertions)]
    let router = {
        #[derive(OpenApi)]
        #[openapi(
            paths(
                rest::health::health_check,
                rest::conversation::list_conversations,
                rest::conversation::create_conversation,
                rest::conversation::get_conversation,
                rest::conversation::unread_count,
                rest::conversation::mark_conversation_read,
                rest::message::list_messages,
                rest::message::create_message,
                rest::message::mark_message_read,
            ),
            components(schemas(
                rest::health::HealthResponse,
                rest::conversation::ConversationResponse,
                rest::conversation::CreateConversationRequest,
                rest::conversation::UnreadCountResponse,
                rest::conversation::MarkConversationReadResponse,
                rest::message::MessageResponse,
                rest::message::CreateMessageRequest,
                rest::message::MarkReadResponse,
            )),
            tags(
                (name = "Health", description = "Service health"),
                (name = "Conversations", description = "Conversation management"),
                (name = "Messages", description = "Messages and read receipts"),
            )
        )]
        struct ApiDoc;

        router.merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
    };

    router
}
