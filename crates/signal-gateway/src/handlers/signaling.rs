//! Signaling relay handler
//!
//! Offers, answers, and candidates take two paths at once: a synchronous
//! unicast to the recipient's sockets (the low-latency path, arrival order
//! preserved) and an enqueue on the room's message queue, whose drain
//! updates the pairwise aggregates and emits the domain events.

use serde_json::Value;

use signal_core::{PeerId, RoomId};
use signal_service::SignalKind;

use super::HandlerResult;
use crate::protocol::ServerEvent;
use crate::server::GatewayState;

/// Handles `offer`, `answer`, and `ice-candidate` ingress events
pub struct SignalingHandler;

impl SignalingHandler {
    pub async fn handle(
        state: &GatewayState,
        kind: SignalKind,
        room_id: RoomId,
        from: PeerId,
        to: PeerId,
        payload: Value,
    ) -> HandlerResult<()> {
        let forward = match kind {
            SignalKind::Offer => ServerEvent::Offer {
                from: from.clone(),
                offer: payload.clone(),
            },
            SignalKind::Answer => ServerEvent::Answer {
                from: from.clone(),
                answer: payload.clone(),
            },
            SignalKind::IceCandidate => ServerEvent::IceCandidate {
                from: from.clone(),
                candidate: payload.clone(),
            },
        };

        let sent = state.sockets().send_to_peer(&to, forward).await;
        if sent == 0 {
            tracing::debug!(
                kind = kind.as_str(),
                from = %from,
                to = %to,
                "Recipient offline, signaling not mirrored"
            );
        }

        state.queue().enqueue(kind, from, to, room_id, payload);
        Ok(())
    }
}
