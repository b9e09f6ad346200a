//! Repository traits (ports) - define the interface for aggregate storage
//!
//! The domain layer defines what it needs, and the infrastructure layer
//! provides the implementation. Stores are transactional at the
//! per-aggregate level: `save` atomically replaces the aggregate's state,
//! and read-modify-write on a single aggregate is serialized by the store.

use async_trait::async_trait;

use crate::entities::{PeerConnection, Room};
use crate::error::DomainError;
use crate::value_objects::{PairKey, PeerId, RoomId};

/// Result type for repository operations
pub type RepoResult<T> = Result<T, DomainError>;

// ============================================================================
// Room Repository
// ============================================================================

#[async_trait]
pub trait RoomRepository: Send + Sync {
    /// Find room by ID
    async fn find_by_id(&self, id: &RoomId) -> RepoResult<Option<Room>>;

    /// List rooms owned by a peer
    async fn find_by_owner_id(&self, owner_id: &PeerId) -> RepoResult<Vec<Room>>;

    /// List all active rooms
    async fn find_active(&self) -> RepoResult<Vec<Room>>;

    /// Persist the room's current state
    async fn save(&self, room: &Room) -> RepoResult<()>;

    /// Delete a room
    async fn delete(&self, id: &RoomId) -> RepoResult<()>;
}

// ============================================================================
// Peer-Connection Repository
// ============================================================================

#[async_trait]
pub trait PeerConnectionRepository: Send + Sync {
    /// Find a pairwise connection by its directed composite key
    async fn find_by_id(&self, id: &PairKey) -> RepoResult<Option<PeerConnection>>;

    /// List all pairwise connections created in a room
    async fn find_by_room_id(&self, room_id: &RoomId) -> RepoResult<Vec<PeerConnection>>;

    /// List all pairwise connections a peer participates in, either direction
    async fn find_by_peer_id(&self, peer_id: &PeerId) -> RepoResult<Vec<PeerConnection>>;

    /// Persist the connection's current state
    async fn save(&self, connection: &PeerConnection) -> RepoResult<()>;

    /// Delete a pairwise connection
    async fn delete(&self, id: &PairKey) -> RepoResult<()>;
}
