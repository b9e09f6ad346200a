//! Connection-state and reconnect-request handlers

use signal_core::{ConnectionState, PairKey, PeerId, RoomId};
use signal_service::RoomService;

use super::{HandlerError, HandlerResult};
use crate::protocol::{codes, ServerEvent};
use crate::server::GatewayState;

/// Handles `connection-state` ingress events
pub struct ConnectionStateHandler;

impl ConnectionStateHandler {
    pub async fn handle(
        state: &GatewayState,
        room_id: RoomId,
        peer_id: PeerId,
        new_state: ConnectionState,
    ) -> HandlerResult<()> {
        state
            .connections()
            .update_connection_state(&peer_id, new_state)
            .await?;

        // Every counterpart of this peer learns the new state; on failure,
        // both ends of a pair without an active fallback get the suggestion.
        let pairs = state
            .service_context()
            .peer_repo()
            .find_by_peer_id(&peer_id)
            .await
            .map_err(HandlerError::Domain)?;

        let mut notified: Vec<PeerId> = Vec::new();
        for connection in &pairs {
            let counterpart = if connection.id.local == peer_id {
                connection.id.remote.clone()
            } else {
                connection.id.local.clone()
            };
            if notified.contains(&counterpart) {
                continue;
            }
            notified.push(counterpart.clone());

            state
                .sockets()
                .send_to_peer(
                    &counterpart,
                    ServerEvent::PeerConnectionState {
                        peer_id: peer_id.clone(),
                        state: new_state,
                    },
                )
                .await;

            if new_state == ConnectionState::Failed {
                let pair = PairKey::new(peer_id.clone(), counterpart.clone());
                if !state.connections().is_using_fallback(&pair) {
                    let suggestion = ServerEvent::WebrtcFallbackSuggested {
                        from: peer_id.clone(),
                        room_id: room_id.clone(),
                        reason: "peer connection failed".to_string(),
                    };
                    state
                        .sockets()
                        .send_to_peer(&counterpart, suggestion.clone())
                        .await;
                    state.sockets().send_to_peer(&peer_id, suggestion).await;
                }
            }
        }

        Ok(())
    }
}

/// Handles `reconnect-request` ingress events
pub struct ReconnectRequestHandler;

impl ReconnectRequestHandler {
    pub async fn handle(
        state: &GatewayState,
        room_id: RoomId,
        from: PeerId,
        to: PeerId,
    ) -> HandlerResult<()> {
        let service = RoomService::new(state.service_context());
        let room = service.get_room(&room_id).await?;
        if !room.has_player(&to) {
            return Err(HandlerError::refused(
                codes::ERR_PEER_NOT_FOUND,
                format!("peer {to} is not a member of room {room_id}"),
            ));
        }

        state
            .sockets()
            .send_to_peer(&to, ServerEvent::ReconnectNeeded { from })
            .await;

        Ok(())
    }
}
