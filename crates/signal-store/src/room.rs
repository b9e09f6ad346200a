//! In-memory implementation of RoomRepository

use async_trait::async_trait;
use dashmap::DashMap;

use signal_core::traits::{RepoResult, RoomRepository};
use signal_core::value_objects::{PeerId, RoomId};
use signal_core::{DomainError, Room};

/// In-memory room store keyed by room id
///
/// `DashMap` entry locks give the per-aggregate transaction boundary the
/// domain layer assumes.
#[derive(Default)]
pub struct InMemoryRoomRepository {
    rooms: DashMap<RoomId, Room>,
}

impl InMemoryRoomRepository {
    #[must_use]
    pub fn new() -> Self {
        Self {
            rooms: DashMap::new(),
        }
    }

    /// Number of stored rooms
    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}

#[async_trait]
impl RoomRepository for InMemoryRoomRepository {
    async fn find_by_id(&self, id: &RoomId) -> RepoResult<Option<Room>> {
        Ok(self.rooms.get(id).map(|r| r.clone()))
    }

    async fn find_by_owner_id(&self, owner_id: &PeerId) -> RepoResult<Vec<Room>> {
        Ok(self
            .rooms
            .iter()
            .filter(|r| r.is_owner(owner_id))
            .map(|r| r.clone())
            .collect())
    }

    async fn find_active(&self) -> RepoResult<Vec<Room>> {
        Ok(self
            .rooms
            .iter()
            .filter(|r| r.active)
            .map(|r| r.clone())
            .collect())
    }

    async fn save(&self, room: &Room) -> RepoResult<()> {
        self.rooms.insert(room.id.clone(), room.clone());
        tracing::trace!(room_id = %room.id, "Room saved");
        Ok(())
    }

    async fn delete(&self, id: &RoomId) -> RepoResult<()> {
        if self.rooms.remove(id).is_none() {
            return Err(DomainError::UnknownRoom(id.clone()));
        }
        tracing::debug!(room_id = %id, "Room deleted");
        Ok(())
    }
}
