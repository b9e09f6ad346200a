//! Room service
//!
//! Use-cases for room lifecycle and membership. Each operation loads the
//! aggregate, mutates it, persists, then pulls and publishes the emitted
//! domain events. A room left inactive with no members is deleted in the
//! same use-case.

use tracing::{info, instrument};
use uuid::Uuid;

use signal_core::{DomainError, PeerId, Room, RoomId, RoomRules};

use crate::context::ServiceContext;
use crate::error::{ServiceError, ServiceResult};

/// Result of a join use-case
#[derive(Debug, Clone)]
pub struct JoinOutcome {
    pub room: Room,
    /// True when the peer was already a member (e.g. the owner joining the
    /// room it created, or a second socket); no mutation happened.
    pub rejoined: bool,
}

/// Room service
pub struct RoomService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> RoomService<'a> {
    /// Create a new RoomService
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Create a new room; the owner becomes the sole member
    #[instrument(skip(self, rules))]
    pub async fn create_room(&self, owner_id: PeerId, rules: RoomRules) -> ServiceResult<Room> {
        let room_id = RoomId::new(Uuid::new_v4().to_string());
        let mut room = Room::create(room_id, owner_id.clone(), rules)?;

        self.save_and_publish(&mut room).await?;

        info!(room_id = %room.id, owner_id = %owner_id, "Room created");
        Ok(room)
    }

    /// Get a room by id
    #[instrument(skip(self))]
    pub async fn get_room(&self, room_id: &RoomId) -> ServiceResult<Room> {
        self.ctx
            .room_repo()
            .find_by_id(room_id)
            .await?
            .ok_or_else(|| ServiceError::Domain(DomainError::UnknownRoom(room_id.clone())))
    }

    /// Join a peer to a room
    ///
    /// Joining a room the peer is already a member of is idempotent at this
    /// layer (multi-socket peers re-join on reconnect); the aggregate itself
    /// still rejects duplicate membership.
    #[instrument(skip(self))]
    pub async fn join_room(&self, room_id: &RoomId, peer_id: PeerId) -> ServiceResult<JoinOutcome> {
        let mut room = self.get_room(room_id).await?;

        if room.has_player(&peer_id) {
            return Ok(JoinOutcome {
                room,
                rejoined: true,
            });
        }

        room.join(peer_id.clone())?;
        self.save_and_publish(&mut room).await?;

        info!(room_id = %room_id, peer_id = %peer_id, players = room.player_count(), "Peer joined room");
        Ok(JoinOutcome {
            room,
            rejoined: false,
        })
    }

    /// Remove a peer from a room
    ///
    /// The room auto-closes when the last member leaves, and a room observed
    /// inactive with no members is deleted from the repository.
    #[instrument(skip(self))]
    pub async fn leave_room(&self, room_id: &RoomId, peer_id: &PeerId) -> ServiceResult<Room> {
        let mut room = self.get_room(room_id).await?;

        room.leave(peer_id)?;
        self.save_and_publish(&mut room).await?;

        if !room.active && room.members.is_empty() {
            self.ctx.room_repo().delete(room_id).await?;
            info!(room_id = %room_id, "Room destroyed after last leave");
        } else {
            info!(room_id = %room_id, peer_id = %peer_id, players = room.player_count(), "Peer left room");
        }

        Ok(room)
    }

    /// Replace the room rules; owner only
    #[instrument(skip(self, rules))]
    pub async fn update_rules(
        &self,
        room_id: &RoomId,
        caller: &PeerId,
        rules: RoomRules,
    ) -> ServiceResult<Room> {
        let mut room = self.get_room(room_id).await?;

        if !room.is_owner(caller) {
            return Err(DomainError::NotRoomOwner.into());
        }

        room.update_rules(rules)?;
        self.save_and_publish(&mut room).await?;

        info!(room_id = %room_id, "Room rules updated");
        Ok(room)
    }

    /// Close a room explicitly; owner only
    #[instrument(skip(self))]
    pub async fn close_room(&self, room_id: &RoomId, caller: &PeerId) -> ServiceResult<Room> {
        let mut room = self.get_room(room_id).await?;

        if !room.is_owner(caller) {
            return Err(DomainError::NotRoomOwner.into());
        }

        room.close()?;
        self.save_and_publish(&mut room).await?;

        if room.members.is_empty() {
            self.ctx.room_repo().delete(room_id).await?;
        }

        info!(room_id = %room_id, "Room closed");
        Ok(room)
    }

    /// Persist the room, then publish its pulled events
    ///
    /// Events are drained before the save so the stored copy never carries a
    /// pending buffer. Publisher failures are logged and do not fail the
    /// use-case; the mutation is already persisted.
    async fn save_and_publish(&self, room: &mut Room) -> ServiceResult<()> {
        let events = room.pull_domain_events();
        self.ctx.room_repo().save(room).await?;

        if !events.is_empty() {
            if let Err(e) = self.ctx.publisher().publish_all(events).await {
                tracing::error!(room_id = %room.id, error = %e, "Failed to publish room events");
            }
        }
        Ok(())
    }
}
