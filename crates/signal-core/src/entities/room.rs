//! Room aggregate - a named grouping of peers sharing signaling scope
//!
//! Membership invariants live here so the gateway cannot create ambiguous
//! states by racing two joins; callers serialize access through the
//! repository's per-aggregate boundary.

use chrono::{DateTime, Utc};

use crate::error::DomainError;
use crate::events::{
    DomainEvent, PlayerJoinedEvent, PlayerLeftEvent, RoomClosedEvent, RoomCreatedEvent,
    RoomRuleChangedEvent,
};
use crate::value_objects::{PeerId, RoomId, RoomRules};

/// Room aggregate
#[derive(Debug, Clone)]
pub struct Room {
    pub id: RoomId,
    pub owner_id: PeerId,
    pub rules: RoomRules,
    /// Insertion-ordered membership; duplicates forbidden
    pub members: Vec<PeerId>,
    /// Once cleared, no membership or rule mutation is allowed
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    /// Pending domain events, drained by the invoking use-case
    events: Vec<DomainEvent>,
}

impl Room {
    /// Create a new room; the owner becomes the sole member
    ///
    /// # Errors
    /// Returns `InvalidRoomRules` when the rules fail validation.
    pub fn create(id: RoomId, owner_id: PeerId, rules: RoomRules) -> Result<Self, DomainError> {
        rules.validate()?;

        let now = Utc::now();
        let mut room = Self {
            id: id.clone(),
            owner_id: owner_id.clone(),
            rules: rules.clone(),
            members: vec![owner_id.clone()],
            active: true,
            created_at: now,
            updated_at: now,
            events: Vec::new(),
        };

        room.record(DomainEvent::RoomCreated(RoomCreatedEvent {
            room_id: id,
            owner_id,
            rules,
            occurred_on: now,
        }));

        Ok(room)
    }

    /// Add a peer to the room
    ///
    /// # Errors
    /// `RoomInactive` when the room is closed, `RoomFull` at capacity,
    /// `AlreadyJoined` when the peer is already a member.
    pub fn join(&mut self, peer_id: PeerId) -> Result<(), DomainError> {
        if !self.active {
            return Err(DomainError::RoomInactive);
        }
        if self.members.len() as u32 >= self.rules.max_players {
            return Err(DomainError::RoomFull);
        }
        if self.has_player(&peer_id) {
            return Err(DomainError::AlreadyJoined);
        }

        self.members.push(peer_id.clone());
        self.touch();
        self.record(DomainEvent::PlayerJoined(PlayerJoinedEvent {
            room_id: self.id.clone(),
            peer_id,
            occurred_on: self.updated_at,
        }));

        Ok(())
    }

    /// Remove a peer from the room
    ///
    /// Emptying the room closes it in the same operation, emitting
    /// `player-left` then `room-closed`.
    ///
    /// # Errors
    /// `NotAMember` when the peer is not present.
    pub fn leave(&mut self, peer_id: &PeerId) -> Result<(), DomainError> {
        let Some(idx) = self.members.iter().position(|m| m == peer_id) else {
            return Err(DomainError::NotAMember);
        };

        self.members.remove(idx);
        self.touch();
        self.record(DomainEvent::PlayerLeft(PlayerLeftEvent {
            room_id: self.id.clone(),
            peer_id: peer_id.clone(),
            occurred_on: self.updated_at,
        }));

        if self.members.is_empty() && self.active {
            self.active = false;
            self.record(DomainEvent::RoomClosed(RoomClosedEvent {
                room_id: self.id.clone(),
                occurred_on: self.updated_at,
            }));
        }

        Ok(())
    }

    /// Replace the room rules
    ///
    /// A member count above the new `max_players` is not retroactively
    /// enforced; only future joins are restricted.
    ///
    /// # Errors
    /// `RoomInactive` when the room is closed, `InvalidRoomRules` on
    /// validation failure.
    pub fn update_rules(&mut self, rules: RoomRules) -> Result<(), DomainError> {
        if !self.active {
            return Err(DomainError::RoomInactive);
        }
        rules.validate()?;

        self.rules = rules.clone();
        self.touch();
        self.record(DomainEvent::RoomRuleChanged(RoomRuleChangedEvent {
            room_id: self.id.clone(),
            rules,
            occurred_on: self.updated_at,
        }));

        Ok(())
    }

    /// Close the room explicitly
    ///
    /// # Errors
    /// `AlreadyClosed` when the room is already inactive.
    pub fn close(&mut self) -> Result<(), DomainError> {
        if !self.active {
            return Err(DomainError::AlreadyClosed);
        }

        self.active = false;
        self.touch();
        self.record(DomainEvent::RoomClosed(RoomClosedEvent {
            room_id: self.id.clone(),
            occurred_on: self.updated_at,
        }));

        Ok(())
    }

    /// Check if a peer is the room owner
    #[inline]
    pub fn is_owner(&self, peer_id: &PeerId) -> bool {
        &self.owner_id == peer_id
    }

    /// Check if a peer is a member
    #[inline]
    pub fn has_player(&self, peer_id: &PeerId) -> bool {
        self.members.iter().any(|m| m == peer_id)
    }

    /// Current member count
    #[inline]
    pub fn player_count(&self) -> usize {
        self.members.len()
    }

    /// Drain the pending domain events in emission order
    pub fn pull_domain_events(&mut self) -> Vec<DomainEvent> {
        std::mem::take(&mut self.events)
    }

    fn record(&mut self, event: DomainEvent) {
        self.events.push(event);
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
