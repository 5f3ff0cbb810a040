//! Chat WebSocket handler.
//!
//! One socket per (principal, conversation). The upgrade validates the
//! membership gate through [`ChatSession::connect`]; a refused caller gets
//! the socket closed without a structured error. After that a single task
//! pumps inbound frames into the session and fanout events back out, so
//! when the task ends the session drops and its registry slot is released.

use axum::{
    extract::{
        ws::{Message as WsMessage, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use harvestchat_messaging::{ChatSession, ClientEvent, Principal};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::middleware::AuthenticatedPrincipal;
use crate::state::GatewayState;

pub async fn chat_websocket_handler(
    ws: WebSocketUpgrade,
    Path(conversation_id): Path<i64>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
    State(state): State<Arc<GatewayState>>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state, principal, conversation_id))
}

async fn handle_socket(
    socket: WebSocket,
    state: Arc<GatewayState>,
    principal: Principal,
    conversation_id: i64,
) {
    let connected = ChatSession::connect(
        state.registry.clone(),
        &state.conversations,
        state.messages.clone(),
        state.read_receipts.clone(),
        principal,
        conversation_id,
    )
    .await;

    let (session, mut events) = match connected {
        Ok(pair) => pair,
        Err(error) => {
            debug!(conversation_id, %error, "refused socket connection");
            let mut socket = socket;
            let _ = socket.close().await;
            return;
        }
    };

    let (mut sink, mut stream) = socket.split();

    loop {
        tokio::select! {
            inbound = stream.next() => match inbound {
                Some(Ok(WsMessage::Text(text))) => {
                    // Unknown or malformed frames are silent no-ops.
                    if let Some(event) = ClientEvent::decode(&text) {
                        session.handle_event(event).await;
                    }
                }
                Some(Ok(WsMessage::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(error)) => {
                    debug!(conversation_id, %error, "socket receive error");
                    break;
                }
            },
            outbound = events.recv() => match outbound {
                Ok(event) => {
                    let Ok(text) = serde_json::to_string(&event) else {
                        continue;
                    };
                    if sink.send(WsMessage::Text(text)).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(
                        conversation_id,
                        principal_id = session.principal().id,
                        skipped,
                        "session lagged behind conversation fanout"
                    );
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
        }
    }

    debug!(
        conversation_id,
        principal_id = session.principal().id,
        "socket closed"
    );
    // `session` drops here and releases the registry slot.
}
