//! WebSocket handler
//!
//! Admits the socket from its handshake query parameters, then pumps
//! messages between the wire and the dispatcher. Handler failures reply
//! with a single `error` frame; only transport errors end the socket.

use axum::{
    extract::{ws::Message, Query, State, WebSocketUpgrade},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::mpsc;

use signal_core::{ConnectionState, DomainError, PeerId, RoomId};
use signal_service::RoomService;

use crate::connection::PeerSocket;
use crate::handlers::MessageDispatcher;
use crate::protocol::{ClientEvent, ServerEvent};
use crate::server::GatewayState;

/// Channel buffer size for outgoing events
const EVENT_BUFFER_SIZE: usize = 128;

/// Handshake query parameters; both are required for admission
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandshakeParams {
    room_id: Option<String>,
    peer_id: Option<String>,
}

/// WebSocket gateway handler
pub async fn gateway_handler(
    State(state): State<GatewayState>,
    Query(params): Query<HandshakeParams>,
    ws: WebSocketUpgrade,
) -> Response {
    let (room_id, peer_id) = match (params.room_id, params.peer_id) {
        (Some(room), Some(peer)) if !room.is_empty() && !peer.is_empty() => (room, peer),
        _ => {
            tracing::debug!("Handshake rejected: missing roomId or peerId");
            return (
                StatusCode::BAD_REQUEST,
                DomainError::MissingHandshakeFields.to_string(),
            )
                .into_response();
        }
    };

    ws.on_upgrade(move |socket| {
        handle_socket(state, socket, RoomId::new(room_id), PeerId::new(peer_id))
    })
}

/// Handle an upgraded WebSocket connection
async fn handle_socket(
    state: GatewayState,
    socket: axum::extract::ws::WebSocket,
    room_id: RoomId,
    peer_id: PeerId,
) {
    let (tx, mut rx) = mpsc::channel::<ServerEvent>(EVENT_BUFFER_SIZE);
    let peer_socket = PeerSocket::new(room_id.clone(), peer_id.clone(), tx);
    state.sockets().add_socket(peer_socket.clone());

    tracing::info!(
        socket_id = %peer_socket.socket_id(),
        room_id = %room_id,
        peer_id = %peer_id,
        "WebSocket connection established"
    );

    let (mut ws_sink, mut ws_stream) = socket.split();

    // Receive loop: parse, dispatch, and answer failures with error frames.
    let state_recv = state.clone();
    let socket_recv = peer_socket.clone();
    let recv_task = tokio::spawn(async move {
        while let Some(msg) = ws_stream.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    handle_text_message(&state_recv, &socket_recv, &text).await;
                }
                Ok(Message::Binary(_)) => {
                    tracing::debug!(
                        socket_id = %socket_recv.socket_id(),
                        "Binary frames not supported"
                    );
                    let _ = socket_recv
                        .send(ServerEvent::error("binary frames are not supported"))
                        .await;
                }
                Ok(Message::Ping(_) | Message::Pong(_)) => {
                    // Pong replies are handled by axum
                }
                Ok(Message::Close(_)) => {
                    tracing::info!(socket_id = %socket_recv.socket_id(), "Client closed connection");
                    break;
                }
                Err(e) => {
                    tracing::warn!(
                        socket_id = %socket_recv.socket_id(),
                        error = %e,
                        "WebSocket error"
                    );
                    break;
                }
            }
        }
    });

    // Send loop: serialize queued events onto the wire.
    let socket_id_send = peer_socket.socket_id().to_string();
    let send_task = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match event.to_json() {
                Ok(json) => {
                    if ws_sink.send(Message::Text(json.into())).await.is_err() {
                        tracing::warn!(socket_id = %socket_id_send, "Failed to write to WebSocket");
                        break;
                    }
                }
                Err(e) => {
                    tracing::error!(socket_id = %socket_id_send, error = %e, "Failed to serialize event");
                }
            }
        }
        let _ = ws_sink.close().await;
    });

    tokio::select! {
        _ = recv_task => {
            tracing::debug!(socket_id = %peer_socket.socket_id(), "Receive task ended");
        }
        _ = send_task => {
            tracing::debug!(socket_id = %peer_socket.socket_id(), "Send task ended");
        }
    }

    cleanup_socket(&state, &peer_socket).await;
}

/// Parse and dispatch one text frame
async fn handle_text_message(state: &GatewayState, socket: &Arc<PeerSocket>, text: &str) {
    let event = match ClientEvent::from_json(text) {
        Ok(event) => event,
        Err(e) => {
            tracing::debug!(
                socket_id = %socket.socket_id(),
                error = %e,
                "Failed to parse client event"
            );
            let _ = socket
                .send(ServerEvent::error(format!("malformed event: {e}")))
                .await;
            return;
        }
    };

    if let Err(e) = MessageDispatcher::dispatch(state, socket, event).await {
        tracing::debug!(
            socket_id = %socket.socket_id(),
            error = %e,
            "Handler refused event"
        );
        let _ = socket.send(e.to_server_event()).await;
    }
}

/// Deregister a socket; the peer's last socket also leaves the room and
/// reports `disconnected` to the health tracker.
async fn cleanup_socket(state: &GatewayState, socket: &Arc<PeerSocket>) {
    tracing::info!(socket_id = %socket.socket_id(), "Cleaning up socket");

    let Some((socket, last_for_peer)) = state.sockets().remove_socket(socket.socket_id()) else {
        return;
    };
    if !last_for_peer {
        return;
    }

    let peer_id = socket.peer_id().clone();
    let room_id = socket.room_id().clone();

    if let Err(e) = state
        .connections()
        .update_connection_state(&peer_id, ConnectionState::Disconnected)
        .await
    {
        tracing::warn!(peer_id = %peer_id, error = %e, "Failed to record disconnect");
    }

    let service = RoomService::new(state.service_context());
    match service.leave_room(&room_id, &peer_id).await {
        Ok(_) => {
            state
                .sockets()
                .broadcast_to_room(
                    &room_id,
                    ServerEvent::PlayerLeft {
                        peer_id: peer_id.clone(),
                        room_id: room_id.clone(),
                    },
                    None,
                )
                .await;
        }
        Err(e) => {
            // Never joined, or the room is already gone; nothing to announce.
            tracing::debug!(room_id = %room_id, peer_id = %peer_id, error = %e, "Leave on disconnect skipped");
        }
    }
}
