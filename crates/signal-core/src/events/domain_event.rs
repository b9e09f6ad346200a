//! Domain events - events emitted when domain state changes
//!
//! Aggregates accumulate these in a per-aggregate buffer; the use-case that
//! invoked the mutation pulls them and hands them to the event publisher.
//! Downstream consumers subscribe by event name.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value_objects::{ConnectionState, PeerId, RoomId, RoomRules};

/// All possible domain events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum DomainEvent {
    // =========================================================================
    // Room Events
    // =========================================================================
    RoomCreated(RoomCreatedEvent),
    PlayerJoined(PlayerJoinedEvent),
    PlayerLeft(PlayerLeftEvent),
    RoomRuleChanged(RoomRuleChangedEvent),
    RoomClosed(RoomClosedEvent),

    // =========================================================================
    // Connection Events
    // =========================================================================
    ConnectionStateChanged(ConnectionStateChangedEvent),
    IceCandidateReceived(IceCandidateReceivedEvent),
    OfferReceived(OfferReceivedEvent),
    AnswerReceived(AnswerReceivedEvent),
    ConnectionTimeout(ConnectionTimeoutEvent),
}

impl DomainEvent {
    /// Get the stable event name consumers subscribe by
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::RoomCreated(_) => "room-created",
            Self::PlayerJoined(_) => "player-joined",
            Self::PlayerLeft(_) => "player-left",
            Self::RoomRuleChanged(_) => "room-rule-changed",
            Self::RoomClosed(_) => "room-closed",
            Self::ConnectionStateChanged(_) => "connection-state-changed",
            Self::IceCandidateReceived(_) => "ice-candidate-received",
            Self::OfferReceived(_) => "offer-received",
            Self::AnswerReceived(_) => "answer-received",
            Self::ConnectionTimeout(_) => "connection-timeout",
        }
    }

    /// Get the timestamp of the event
    pub fn occurred_on(&self) -> DateTime<Utc> {
        match self {
            Self::RoomCreated(e) => e.occurred_on,
            Self::PlayerJoined(e) => e.occurred_on,
            Self::PlayerLeft(e) => e.occurred_on,
            Self::RoomRuleChanged(e) => e.occurred_on,
            Self::RoomClosed(e) => e.occurred_on,
            Self::ConnectionStateChanged(e) => e.occurred_on,
            Self::IceCandidateReceived(e) => e.occurred_on,
            Self::OfferReceived(e) => e.occurred_on,
            Self::AnswerReceived(e) => e.occurred_on,
            Self::ConnectionTimeout(e) => e.occurred_on,
        }
    }

    /// Get the room this event belongs to
    pub fn room_id(&self) -> &RoomId {
        match self {
            Self::RoomCreated(e) => &e.room_id,
            Self::PlayerJoined(e) => &e.room_id,
            Self::PlayerLeft(e) => &e.room_id,
            Self::RoomRuleChanged(e) => &e.room_id,
            Self::RoomClosed(e) => &e.room_id,
            Self::ConnectionStateChanged(e) => &e.room_id,
            Self::IceCandidateReceived(e) => &e.room_id,
            Self::OfferReceived(e) => &e.room_id,
            Self::AnswerReceived(e) => &e.room_id,
            Self::ConnectionTimeout(e) => &e.room_id,
        }
    }
}

// ============================================================================
// Event Structs
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomCreatedEvent {
    pub room_id: RoomId,
    pub owner_id: PeerId,
    pub rules: RoomRules,
    pub occurred_on: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerJoinedEvent {
    pub room_id: RoomId,
    pub peer_id: PeerId,
    pub occurred_on: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerLeftEvent {
    pub room_id: RoomId,
    pub peer_id: PeerId,
    pub occurred_on: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomRuleChangedEvent {
    pub room_id: RoomId,
    pub rules: RoomRules,
    pub occurred_on: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomClosedEvent {
    pub room_id: RoomId,
    pub occurred_on: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionStateChangedEvent {
    pub room_id: RoomId,
    pub peer_id: PeerId,
    pub state: ConnectionState,
    pub previous_state: ConnectionState,
    pub occurred_on: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IceCandidateReceivedEvent {
    pub room_id: RoomId,
    pub from: PeerId,
    pub to: PeerId,
    pub occurred_on: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfferReceivedEvent {
    pub room_id: RoomId,
    pub from: PeerId,
    pub to: PeerId,
    pub occurred_on: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerReceivedEvent {
    pub room_id: RoomId,
    pub from: PeerId,
    pub to: PeerId,
    pub occurred_on: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionTimeoutEvent {
    pub room_id: RoomId,
    pub peer_id: PeerId,
    pub timeout_ms: u64,
    pub occurred_on: DateTime<Utc>,
}
