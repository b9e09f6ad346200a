//! Individual WebSocket connection
//!
//! One peer may hold several sockets at once (reconnect handoff); each
//! socket carries the `(room, peer)` identity read from the handshake.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc;
use uuid::Uuid;

use signal_core::{PeerId, RoomId};

use crate::protocol::ServerEvent;

/// A single WebSocket connection bound to a peer in a room
pub struct PeerSocket {
    socket_id: String,
    room_id: RoomId,
    peer_id: PeerId,
    /// Channel to the socket's send task
    sender: mpsc::Sender<ServerEvent>,
    created_at: Instant,
}

impl PeerSocket {
    /// Create a new socket handle
    pub fn new(room_id: RoomId, peer_id: PeerId, sender: mpsc::Sender<ServerEvent>) -> Arc<Self> {
        Arc::new(Self {
            socket_id: Uuid::new_v4().to_string(),
            room_id,
            peer_id,
            sender,
            created_at: Instant::now(),
        })
    }

    /// Get the socket ID
    pub fn socket_id(&self) -> &str {
        &self.socket_id
    }

    /// Get the room this socket was admitted to
    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    /// Get the peer identity
    pub fn peer_id(&self) -> &PeerId {
        &self.peer_id
    }

    /// Get socket age
    pub fn age(&self) -> std::time::Duration {
        self.created_at.elapsed()
    }

    /// Send an event to this socket
    pub async fn send(&self, event: ServerEvent) -> Result<(), mpsc::error::SendError<ServerEvent>> {
        self.sender.send(event).await
    }

    /// Try to send without waiting for buffer space
    pub fn try_send(&self, event: ServerEvent) -> Result<(), mpsc::error::TrySendError<ServerEvent>> {
        self.sender.try_send(event)
    }

    /// Check if the socket's send channel is closed
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

impl std::fmt::Debug for PeerSocket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PeerSocket")
            .field("socket_id", &self.socket_id)
            .field("room_id", &self.room_id)
            .field("peer_id", &self.peer_id)
            .finish()
    }
}
