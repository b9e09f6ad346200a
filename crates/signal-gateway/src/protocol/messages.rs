//! Socket event types
//!
//! The stable wire contract: internally tagged JSON with kebab-case event
//! names and camelCase fields. Session descriptions, candidates, and relay
//! payloads are opaque `serde_json::Value`s; the broker never inspects them.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use signal_core::{ConnectionState, PeerId, RoomId, RoomRules};

/// Client → server events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientEvent {
    #[serde(rename_all = "camelCase")]
    Join { room_id: RoomId, peer_id: PeerId },

    #[serde(rename_all = "camelCase")]
    Leave { room_id: RoomId, peer_id: PeerId },

    #[serde(rename_all = "camelCase")]
    Offer {
        room_id: RoomId,
        from: PeerId,
        to: PeerId,
        offer: Value,
    },

    #[serde(rename_all = "camelCase")]
    Answer {
        room_id: RoomId,
        from: PeerId,
        to: PeerId,
        answer: Value,
    },

    #[serde(rename_all = "camelCase")]
    IceCandidate {
        room_id: RoomId,
        from: PeerId,
        to: PeerId,
        candidate: Value,
    },

    #[serde(rename_all = "camelCase")]
    ReconnectRequest {
        room_id: RoomId,
        from: PeerId,
        to: PeerId,
    },

    #[serde(rename_all = "camelCase")]
    ConnectionState {
        room_id: RoomId,
        peer_id: PeerId,
        state: ConnectionState,
    },

    #[serde(rename_all = "camelCase")]
    WebrtcFallbackActivate {
        room_id: RoomId,
        from: PeerId,
        to: PeerId,
    },

    #[serde(rename_all = "camelCase")]
    RelayData {
        room_id: RoomId,
        from: PeerId,
        to: PeerId,
        payload: Value,
    },
}

impl ClientEvent {
    /// Deserialize from JSON text
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Stable event name
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::Join { .. } => "join",
            Self::Leave { .. } => "leave",
            Self::Offer { .. } => "offer",
            Self::Answer { .. } => "answer",
            Self::IceCandidate { .. } => "ice-candidate",
            Self::ReconnectRequest { .. } => "reconnect-request",
            Self::ConnectionState { .. } => "connection-state",
            Self::WebrtcFallbackActivate { .. } => "webrtc-fallback-activate",
            Self::RelayData { .. } => "relay-data",
        }
    }
}

/// Server → client events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerEvent {
    #[serde(rename_all = "camelCase")]
    RoomState {
        room_id: RoomId,
        owner_id: PeerId,
        players: Vec<PeerId>,
        rules: RoomRules,
    },

    #[serde(rename_all = "camelCase")]
    PlayerJoined {
        peer_id: PeerId,
        room_id: RoomId,
        total_players: usize,
        is_room_owner: bool,
    },

    #[serde(rename_all = "camelCase")]
    PlayerLeft { peer_id: PeerId, room_id: RoomId },

    #[serde(rename_all = "camelCase")]
    Offer { from: PeerId, offer: Value },

    #[serde(rename_all = "camelCase")]
    Answer { from: PeerId, answer: Value },

    #[serde(rename_all = "camelCase")]
    IceCandidate { from: PeerId, candidate: Value },

    #[serde(rename_all = "camelCase")]
    ReconnectNeeded { from: PeerId },

    #[serde(rename_all = "camelCase")]
    PeerConnectionState {
        peer_id: PeerId,
        state: ConnectionState,
    },

    #[serde(rename_all = "camelCase")]
    WebrtcFallbackSuggested {
        from: PeerId,
        room_id: RoomId,
        reason: String,
    },

    #[serde(rename_all = "camelCase")]
    WebrtcFallbackNeeded { from: PeerId, room_id: RoomId },

    #[serde(rename_all = "camelCase")]
    WebrtcFallbackActivated { to: PeerId, success: bool },

    #[serde(rename_all = "camelCase")]
    RelayData { from: PeerId, payload: Value },

    #[serde(rename_all = "camelCase")]
    Error {
        #[serde(skip_serializing_if = "Option::is_none")]
        code: Option<String>,
        message: String,
    },
}

impl ServerEvent {
    /// Serialize to JSON text
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Build an error event with a stable code
    pub fn error_with_code(code: &str, message: impl Into<String>) -> Self {
        Self::Error {
            code: Some(code.to_string()),
            message: message.into(),
        }
    }

    /// Build a free-form error event
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            code: None,
            message: message.into(),
        }
    }
}
