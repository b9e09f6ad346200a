//! In-memory implementation of PeerConnectionRepository

use async_trait::async_trait;
use dashmap::DashMap;

use signal_core::traits::{PeerConnectionRepository, RepoResult};
use signal_core::value_objects::{PairKey, PeerId, RoomId};
use signal_core::{DomainError, PeerConnection};

/// In-memory pairwise-connection store keyed by the directed pair key
#[derive(Default)]
pub struct InMemoryPeerConnectionRepository {
    connections: DashMap<PairKey, PeerConnection>,
}

impl InMemoryPeerConnectionRepository {
    #[must_use]
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
        }
    }

    /// Number of stored connections
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}

#[async_trait]
impl PeerConnectionRepository for InMemoryPeerConnectionRepository {
    async fn find_by_id(&self, id: &PairKey) -> RepoResult<Option<PeerConnection>> {
        Ok(self.connections.get(id).map(|c| c.clone()))
    }

    async fn find_by_room_id(&self, room_id: &RoomId) -> RepoResult<Vec<PeerConnection>> {
        Ok(self
            .connections
            .iter()
            .filter(|c| &c.room_id == room_id)
            .map(|c| c.clone())
            .collect())
    }

    async fn find_by_peer_id(&self, peer_id: &PeerId) -> RepoResult<Vec<PeerConnection>> {
        // Directional keys: a peer participates as local in some pairs and
        // remote in others, so this scans both sides.
        Ok(self
            .connections
            .iter()
            .filter(|c| c.id.involves(peer_id))
            .map(|c| c.clone())
            .collect())
    }

    async fn save(&self, connection: &PeerConnection) -> RepoResult<()> {
        self.connections
            .insert(connection.id.clone(), connection.clone());
        tracing::trace!(connection_id = %connection.id, "Peer connection saved");
        Ok(())
    }

    async fn delete(&self, id: &PairKey) -> RepoResult<()> {
        if self.connections.remove(id).is_none() {
            return Err(DomainError::StorageError(format!(
                "unknown peer connection: {id}"
            )));
        }
        tracing::debug!(connection_id = %id, "Peer connection deleted");
        Ok(())
    }
}
