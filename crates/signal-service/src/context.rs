//! Service context - dependency container for services
//!
//! Holds the repositories and the event publisher needed by the use-cases.

use std::sync::Arc;

use signal_core::traits::{PeerConnectionRepository, RoomRepository};

use crate::publisher::EventPublisher;

/// Service context containing all dependencies
///
/// Cheap to clone; every service and the gateway hold their own copy.
#[derive(Clone)]
pub struct ServiceContext {
    room_repo: Arc<dyn RoomRepository>,
    peer_repo: Arc<dyn PeerConnectionRepository>,
    publisher: Arc<EventPublisher>,
}

impl ServiceContext {
    /// Create a new service context with all dependencies
    pub fn new(
        room_repo: Arc<dyn RoomRepository>,
        peer_repo: Arc<dyn PeerConnectionRepository>,
        publisher: Arc<EventPublisher>,
    ) -> Self {
        Self {
            room_repo,
            peer_repo,
            publisher,
        }
    }

    /// Get the room repository
    pub fn room_repo(&self) -> &dyn RoomRepository {
        self.room_repo.as_ref()
    }

    /// Get the peer-connection repository
    pub fn peer_repo(&self) -> &dyn PeerConnectionRepository {
        self.peer_repo.as_ref()
    }

    /// Get the domain-event publisher
    pub fn publisher(&self) -> &EventPublisher {
        self.publisher.as_ref()
    }

    /// Get a shared handle to the publisher
    pub fn publisher_arc(&self) -> Arc<EventPublisher> {
        self.publisher.clone()
    }
}

impl std::fmt::Debug for ServiceContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceContext")
            .field("room_repo", &"dyn RoomRepository")
            .field("peer_repo", &"dyn PeerConnectionRepository")
            .finish()
    }
}
