//! Ingress event handlers
//!
//! One module per event family, fronted by a dispatcher that routes parsed
//! client events. Handler failures become a single `error` frame for the
//! triggering socket; the socket stays open.

mod connection_state;
mod error;
mod join;
mod relay;
mod signaling;

pub use connection_state::{ConnectionStateHandler, ReconnectRequestHandler};
pub use error::{HandlerError, HandlerResult};
pub use join::{JoinHandler, LeaveHandler};
pub use relay::{FallbackActivateHandler, RelayDataHandler};
pub use signaling::SignalingHandler;

use std::sync::Arc;

use signal_service::SignalKind;

use crate::connection::PeerSocket;
use crate::protocol::ClientEvent;
use crate::server::GatewayState;

/// Dispatch parsed client events to the matching handler
pub struct MessageDispatcher;

impl MessageDispatcher {
    pub async fn dispatch(
        state: &GatewayState,
        socket: &Arc<PeerSocket>,
        event: ClientEvent,
    ) -> HandlerResult<()> {
        tracing::trace!(
            socket_id = %socket.socket_id(),
            event = event.event_name(),
            "Dispatching client event"
        );

        match event {
            ClientEvent::Join { room_id, peer_id } => {
                JoinHandler::handle(state, socket, room_id, peer_id).await
            }
            ClientEvent::Leave { room_id, peer_id } => {
                LeaveHandler::handle(state, room_id, peer_id).await
            }
            ClientEvent::Offer {
                room_id,
                from,
                to,
                offer,
            } => SignalingHandler::handle(state, SignalKind::Offer, room_id, from, to, offer).await,
            ClientEvent::Answer {
                room_id,
                from,
                to,
                answer,
            } => {
                SignalingHandler::handle(state, SignalKind::Answer, room_id, from, to, answer).await
            }
            ClientEvent::IceCandidate {
                room_id,
                from,
                to,
                candidate,
            } => {
                SignalingHandler::handle(
                    state,
                    SignalKind::IceCandidate,
                    room_id,
                    from,
                    to,
                    candidate,
                )
                .await
            }
            ClientEvent::ReconnectRequest { room_id, from, to } => {
                ReconnectRequestHandler::handle(state, room_id, from, to).await
            }
            ClientEvent::ConnectionState {
                room_id,
                peer_id,
                state: new_state,
            } => ConnectionStateHandler::handle(state, room_id, peer_id, new_state).await,
            ClientEvent::WebrtcFallbackActivate { room_id, from, to } => {
                FallbackActivateHandler::handle(state, socket, room_id, from, to).await
            }
            ClientEvent::RelayData {
                room_id: _,
                from,
                to,
                payload,
            } => RelayDataHandler::handle(state, from, to, payload).await,
        }
    }
}
