//! Socket manager
//!
//! The in-memory `peer → {sockets}` map and the room broadcast groups,
//! using DashMap for concurrent access. A peer counts as disconnected only
//! when its socket set empties.

use std::collections::HashSet;
use std::sync::Arc;

use dashmap::DashMap;

use signal_core::{PeerId, RoomId};

use super::PeerSocket;
use crate::protocol::ServerEvent;

/// Registry of all live sockets
pub struct SocketManager {
    /// All sockets by socket ID
    sockets: DashMap<String, Arc<PeerSocket>>,

    /// Peer identity to socket IDs
    peer_sockets: DashMap<PeerId, HashSet<String>>,

    /// Room broadcast group to socket IDs
    room_sockets: DashMap<RoomId, HashSet<String>>,
}

impl SocketManager {
    /// Create a new socket manager
    #[must_use]
    pub fn new() -> Self {
        Self {
            sockets: DashMap::new(),
            peer_sockets: DashMap::new(),
            room_sockets: DashMap::new(),
        }
    }

    /// Create a new socket manager wrapped in Arc
    #[must_use]
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Register a socket under its peer identity and room broadcast group
    pub fn add_socket(&self, socket: Arc<PeerSocket>) {
        let socket_id = socket.socket_id().to_string();

        self.peer_sockets
            .entry(socket.peer_id().clone())
            .or_default()
            .insert(socket_id.clone());
        self.room_sockets
            .entry(socket.room_id().clone())
            .or_default()
            .insert(socket_id.clone());
        self.sockets.insert(socket_id.clone(), socket.clone());

        tracing::debug!(
            socket_id = %socket_id,
            peer_id = %socket.peer_id(),
            room_id = %socket.room_id(),
            "Socket registered"
        );
    }

    /// Deregister a socket
    ///
    /// Returns the socket and whether it was the peer's last one, which is
    /// the point the peer counts as disconnected.
    pub fn remove_socket(&self, socket_id: &str) -> Option<(Arc<PeerSocket>, bool)> {
        let (_, socket) = self.sockets.remove(socket_id)?;

        self.room_sockets
            .alter(socket.room_id(), |_, mut members| {
                members.remove(socket_id);
                members
            });
        self.room_sockets.retain(|_, members| !members.is_empty());

        self.peer_sockets.alter(socket.peer_id(), |_, mut members| {
            members.remove(socket_id);
            members
        });
        let last_for_peer = self
            .peer_sockets
            .get(socket.peer_id())
            .map_or(true, |members| members.is_empty());
        self.peer_sockets.retain(|_, members| !members.is_empty());

        tracing::debug!(
            socket_id = %socket_id,
            peer_id = %socket.peer_id(),
            last_for_peer = last_for_peer,
            "Socket deregistered"
        );

        Some((socket, last_for_peer))
    }

    /// Get a socket by ID
    pub fn get_socket(&self, socket_id: &str) -> Option<Arc<PeerSocket>> {
        self.sockets.get(socket_id).map(|s| s.clone())
    }

    /// All sockets a peer currently holds
    pub fn peer_sockets(&self, peer_id: &PeerId) -> Vec<Arc<PeerSocket>> {
        self.peer_sockets
            .get(peer_id)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| self.sockets.get(id).map(|s| s.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Whether a peer has any live socket
    pub fn peer_online(&self, peer_id: &PeerId) -> bool {
        self.peer_sockets
            .get(peer_id)
            .is_some_and(|ids| !ids.is_empty())
    }

    /// Send an event to every socket a peer holds
    pub async fn send_to_peer(&self, peer_id: &PeerId, event: ServerEvent) -> usize {
        let sockets = self.peer_sockets(peer_id);
        let mut sent = 0;

        for socket in sockets {
            if socket.send(event.clone()).await.is_ok() {
                sent += 1;
            }
        }

        tracing::trace!(peer_id = %peer_id, sent = sent, "Event sent to peer sockets");
        sent
    }

    /// Broadcast an event to every socket in a room
    pub async fn broadcast_to_room(
        &self,
        room_id: &RoomId,
        event: ServerEvent,
        exclude_peer: Option<&PeerId>,
    ) -> usize {
        let sockets: Vec<Arc<PeerSocket>> = self
            .room_sockets
            .get(room_id)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| self.sockets.get(id).map(|s| s.clone()))
                    .collect()
            })
            .unwrap_or_default();

        let mut sent = 0;
        for socket in sockets {
            if exclude_peer == Some(socket.peer_id()) {
                continue;
            }
            if socket.send(event.clone()).await.is_ok() {
                sent += 1;
            }
        }

        tracing::trace!(room_id = %room_id, sent = sent, "Event broadcast to room");
        sent
    }

    /// Total number of live sockets
    pub fn socket_count(&self) -> usize {
        self.sockets.len()
    }

    /// Number of peers with at least one socket
    pub fn peer_count(&self) -> usize {
        self.peer_sockets.len()
    }

    /// Number of sockets attached to a room
    pub fn room_socket_count(&self, room_id: &RoomId) -> usize {
        self.room_sockets.get(room_id).map_or(0, |ids| ids.len())
    }
}

impl Default for SocketManager {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SocketManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SocketManager")
            .field("sockets", &self.sockets.len())
            .field("peers", &self.peer_sockets.len())
            .field("rooms", &self.room_sockets.len())
            .finish()
    }
}
