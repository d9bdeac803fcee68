//! services/api/src/web/ws_handler.rs
//!
//! Entry point and control loop for a realtime WebSocket connection.

use crate::{
    error::ApiError,
    web::{
        middleware::{authenticate, QueryParams, Viewer},
        protocol::{ClientMessage, ServerMessage},
        realtime::ConnectionId,
        state::AppState,
    },
};
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

#[derive(Debug, Default, Deserialize)]
pub struct WsParams {
    /// Browsers cannot set headers on an upgrade, so the token may ride in the query.
    pub token: Option<String>,
}

/// Upgrades the request. Anonymous sockets receive global events only.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Viewer(viewer): Viewer,
    QueryParams(params): QueryParams<WsParams>,
) -> Result<Response, ApiError> {
    let user_id = match (viewer, params.token) {
        (Some(user), _) => Some(user.id),
        (None, Some(token)) => Some(authenticate(&state, &token).await?.id),
        (None, None) => None,
    };
    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, user_id)))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>, user_id: Option<Uuid>) {
    let (conn_id, mut outbox) = state.hub.register();
    let shutdown = state.hub.shutdown_token();
    let (mut sink, mut stream) = socket.split();

    // --- Writer: drains the hub queue into the socket ---
    let writer_shutdown = shutdown.clone();
    let mut writer = tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = writer_shutdown.cancelled() => {
                    let _ = sink.send(Message::Close(None)).await;
                    break;
                }
                next = outbox.recv() => match next {
                    Some(text) => {
                        if sink.send(Message::Text(text.into())).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                },
            }
        }
    });

    // --- Reader: control frames from the client ---
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = &mut writer => break,
            frame = stream.next() => match frame {
                Some(Ok(Message::Text(text))) => handle_text(&state, conn_id, user_id, text.as_str()),
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!(conn_id = %conn_id, "WebSocket receive error: {}", e);
                    break;
                }
            },
        }
    }

    state.hub.unregister(conn_id);
    writer.abort();
    info!(conn_id = %conn_id, "WebSocket connection closed");
}

fn handle_text(state: &AppState, conn_id: ConnectionId, user_id: Option<Uuid>, text: &str) {
    let reply = match ClientMessage::parse(text) {
        Some(ClientMessage::JoinRoom(None)) => return,
        // A connection may only listen to its own room.
        Some(ClientMessage::JoinRoom(Some(room))) if Some(room) == user_id => {
            state.hub.join(conn_id, room);
            ServerMessage::RoomJoined { user_id: room }
        }
        Some(ClientMessage::JoinRoom(Some(room))) => {
            warn!(conn_id = %conn_id, room = %room, "Refused join for another user's room");
            ServerMessage::Error {
                message: "Cannot join another user's room".to_string(),
            }
        }
        None => {
            warn!(conn_id = %conn_id, "Ignoring unrecognized socket frame");
            return;
        }
    };

    match serde_json::to_string(&reply) {
        Ok(json) => state.hub.send_to_connection(conn_id, &json),
        Err(e) => error!("Failed to serialize socket reply: {}", e),
    }
}
