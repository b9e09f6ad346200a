//! Room rules - the owner-controlled settings of a room

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Settings a room owner may change while the room is active
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomRules {
    /// Maximum number of members, at least 1
    pub max_players: u32,
    /// Whether broker-mediated relay fallback is allowed
    pub allow_relay: bool,
    /// Target end-to-end latency hint for clients, milliseconds
    pub latency_target_ms: u32,
    /// Opus bitrate hint for clients, bits per second
    pub opus_bitrate: u32,
}

impl RoomRules {
    /// Validate the rules
    ///
    /// # Errors
    /// Returns `DomainError::InvalidRoomRules` when `max_players` is zero.
    /// `latency_target_ms` and `opus_bitrate` are unsigned, so their lower
    /// bounds hold by construction.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.max_players < 1 {
            return Err(DomainError::InvalidRoomRules(
                "maxPlayers must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for RoomRules {
    fn default() -> Self {
        Self {
            max_players: 4,
            allow_relay: true,
            latency_target_ms: 100,
            opus_bitrate: 64_000,
        }
    }
}
