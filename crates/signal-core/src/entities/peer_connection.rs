//! Peer-connection aggregate - directed pairwise signaling state
//!
//! `(A,B)` and `(B,A)` are distinct aggregates. Lazily created by the signal
//! service on the first signaling message for a pair; deleted by the health
//! tracker's reaping rules or on explicit repository request.

use chrono::{DateTime, Duration, Utc};

use crate::events::{
    AnswerReceivedEvent, ConnectionStateChangedEvent, ConnectionTimeoutEvent, DomainEvent,
    IceCandidateReceivedEvent, OfferReceivedEvent,
};
use crate::value_objects::{ConnectionState, PairKey, RoomId};

/// A link is considered timed out when it leaves `connected` after this long
const CONNECTION_TIMEOUT_MS: i64 = 30_000;

/// Peer-connection aggregate
#[derive(Debug, Clone)]
pub struct PeerConnection {
    pub id: PairKey,
    /// Room in which the pair was created; immutable
    pub room_id: RoomId,
    pub state: ConnectionState,
    pub state_changed_at: DateTime<Utc>,
    /// When the pair last entered `connected`, if ever
    pub last_connected_at: Option<DateTime<Utc>>,
    /// Monotonic count of ICE candidates observed for this pair
    pub ice_candidate_count: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    /// Pending domain events, drained by the invoking use-case
    events: Vec<DomainEvent>,
}

impl PeerConnection {
    /// Create a fresh pair in state `new`
    pub fn create(id: PairKey, room_id: RoomId) -> Self {
        let now = Utc::now();
        Self {
            id,
            room_id,
            state: ConnectionState::New,
            state_changed_at: now,
            last_connected_at: None,
            ice_candidate_count: 0,
            created_at: now,
            updated_at: now,
            events: Vec::new(),
        }
    }

    /// Apply a reported connection state
    ///
    /// A report equal to the current state is a no-op: no event, no timestamp
    /// change. Otherwise exactly one `connection-state-changed` is emitted
    /// with `(previous, current)`. Dropping out of a `connected` phase that
    /// lasted longer than 30 s additionally emits `connection-timeout`.
    pub fn update_connection_state(&mut self, new_state: ConnectionState) {
        if new_state == self.state {
            return;
        }

        let now = Utc::now();
        let previous = self.state;
        self.state = new_state;
        self.state_changed_at = now;
        self.updated_at = now;

        self.record(DomainEvent::ConnectionStateChanged(
            ConnectionStateChangedEvent {
                room_id: self.room_id.clone(),
                peer_id: self.id.local.clone(),
                state: new_state,
                previous_state: previous,
                occurred_on: now,
            },
        ));

        if new_state.is_down() {
            if let Some(connected_at) = self.last_connected_at {
                if now - connected_at > Duration::milliseconds(CONNECTION_TIMEOUT_MS) {
                    self.record(DomainEvent::ConnectionTimeout(ConnectionTimeoutEvent {
                        room_id: self.room_id.clone(),
                        peer_id: self.id.local.clone(),
                        timeout_ms: CONNECTION_TIMEOUT_MS as u64,
                        occurred_on: now,
                    }));
                }
            }
        }

        if new_state == ConnectionState::Connected {
            self.last_connected_at = Some(now);
        }
    }

    /// Record an observed ICE candidate; does not alter connection state
    pub fn handle_ice_candidate(&mut self) {
        self.ice_candidate_count += 1;
        self.updated_at = Utc::now();
        self.record(DomainEvent::IceCandidateReceived(IceCandidateReceivedEvent {
            room_id: self.room_id.clone(),
            from: self.id.local.clone(),
            to: self.id.remote.clone(),
            occurred_on: self.updated_at,
        }));
    }

    /// Record an offer; forces the state to `connecting`
    pub fn handle_offer(&mut self) {
        self.update_connection_state(ConnectionState::Connecting);
        self.updated_at = Utc::now();
        self.record(DomainEvent::OfferReceived(OfferReceivedEvent {
            room_id: self.room_id.clone(),
            from: self.id.local.clone(),
            to: self.id.remote.clone(),
            occurred_on: self.updated_at,
        }));
    }

    /// Record an answer; forces the state to `connected`
    pub fn handle_answer(&mut self) {
        self.update_connection_state(ConnectionState::Connected);
        self.updated_at = Utc::now();
        self.record(DomainEvent::AnswerReceived(AnswerReceivedEvent {
            room_id: self.room_id.clone(),
            from: self.id.local.clone(),
            to: self.id.remote.clone(),
            occurred_on: self.updated_at,
        }));
    }

    /// Drain the pending domain events in emission order
    pub fn pull_domain_events(&mut self) -> Vec<DomainEvent> {
        std::mem::take(&mut self.events)
    }

    fn record(&mut self, event: DomainEvent) {
        self.events.push(event);
    }
}
