//! Join and leave handlers
//!
//! Join runs the admission guard before the membership use-case: stats are
//! refreshed from the live pair count, and a saturated room turns the join
//! away before the aggregate is touched.

use std::sync::Arc;

use signal_core::{PeerId, RoomId};
use signal_service::RoomService;

use super::{HandlerError, HandlerResult};
use crate::connection::PeerSocket;
use crate::protocol::{codes, ServerEvent};
use crate::server::GatewayState;

/// Handles `join` ingress events
pub struct JoinHandler;

impl JoinHandler {
    pub async fn handle(
        state: &GatewayState,
        socket: &Arc<PeerSocket>,
        room_id: RoomId,
        peer_id: PeerId,
    ) -> HandlerResult<()> {
        let service = RoomService::new(state.service_context());

        // Admission: refresh stats from the live pair count, then guard.
        let room = service.get_room(&room_id).await?;
        let pair_count = state
            .service_context()
            .peer_repo()
            .find_by_room_id(&room_id)
            .await
            .map_err(HandlerError::Domain)?
            .len();
        state.stats().refresh(&room_id, room.player_count(), pair_count);

        if !state.stats().admit(&room_id) {
            return Err(HandlerError::refused(
                codes::ERR_MAX_CONNECTIONS,
                format!("room {room_id} has reached its connection limit"),
            ));
        }

        let outcome = service.join_room(&room_id, peer_id.clone()).await?;
        state
            .stats()
            .refresh(&room_id, outcome.room.player_count(), pair_count);

        state
            .sockets()
            .broadcast_to_room(
                &room_id,
                ServerEvent::PlayerJoined {
                    peer_id: peer_id.clone(),
                    room_id: room_id.clone(),
                    total_players: outcome.room.player_count(),
                    is_room_owner: outcome.room.is_owner(&peer_id),
                },
                None,
            )
            .await;

        // The fresh socket gets the authoritative room snapshot.
        let _ = socket
            .send(ServerEvent::RoomState {
                room_id: outcome.room.id.clone(),
                owner_id: outcome.room.owner_id.clone(),
                players: outcome.room.members.clone(),
                rules: outcome.room.rules.clone(),
            })
            .await;

        Ok(())
    }
}

/// Handles `leave` ingress events
pub struct LeaveHandler;

impl LeaveHandler {
    pub async fn handle(
        state: &GatewayState,
        room_id: RoomId,
        peer_id: PeerId,
    ) -> HandlerResult<()> {
        let service = RoomService::new(state.service_context());
        service.leave_room(&room_id, &peer_id).await?;

        state
            .sockets()
            .broadcast_to_room(
                &room_id,
                ServerEvent::PlayerLeft {
                    peer_id,
                    room_id: room_id.clone(),
                },
                None,
            )
            .await;

        Ok(())
    }
}
