//! Relay fallback handlers
//!
//! The broker-mediated data path. Activation is an explicit exchange; relay
//! frames are rejected until the pair is in websocket fallback and are
//! forwarded without inspecting the payload.

use std::sync::Arc;

use serde_json::Value;

use signal_core::{FallbackMode, PairKey, PeerConnection, PeerId, RoomId};
use signal_service::RoomService;

use super::{HandlerError, HandlerResult};
use crate::connection::PeerSocket;
use crate::protocol::{codes, ServerEvent};
use crate::server::GatewayState;

/// Handles `webrtc-fallback-activate` ingress events
pub struct FallbackActivateHandler;

impl FallbackActivateHandler {
    pub async fn handle(
        state: &GatewayState,
        socket: &Arc<PeerSocket>,
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

        // Activation may arrive before any signaling for the pair; make sure
        // the aggregate exists so the health entry can hydrate.
        let pair = PairKey::new(from.clone(), to.clone());
        let repo = state.service_context().peer_repo();
        let known = repo
            .find_by_id(&pair)
            .await
            .map_err(HandlerError::Domain)?
            .is_some()
            || repo
                .find_by_id(&pair.reversed())
                .await
                .map_err(HandlerError::Domain)?
                .is_some();
        if !known {
            repo.save(&PeerConnection::create(pair, room_id.clone()))
                .await
                .map_err(HandlerError::Domain)?;
        }

        state
            .connections()
            .set_fallback_mode(&from, &to, FallbackMode::Websocket)
            .await?;

        state
            .sockets()
            .send_to_peer(
                &to,
                ServerEvent::WebrtcFallbackNeeded {
                    from: from.clone(),
                    room_id,
                },
            )
            .await;

        let _ = socket
            .send(ServerEvent::WebrtcFallbackActivated { to, success: true })
            .await;

        Ok(())
    }
}

/// Handles `relay-data` ingress events
pub struct RelayDataHandler;

impl RelayDataHandler {
    pub async fn handle(
        state: &GatewayState,
        from: PeerId,
        to: PeerId,
        payload: Value,
    ) -> HandlerResult<()> {
        let pair = PairKey::new(from.clone(), to.clone());
        if !state.connections().is_using_fallback(&pair) {
            return Err(HandlerError::refused(
                codes::ERR_FALLBACK_NOT_ENABLED,
                format!("relay fallback is not active for {pair}"),
            ));
        }

        state
            .sockets()
            .send_to_peer(&to, ServerEvent::RelayData { from, payload })
            .await;

        Ok(())
    }
}
