//! Domain errors - error types for the domain layer

use thiserror::Error;

use crate::value_objects::{PeerId, RoomId};

/// Domain layer errors
#[derive(Debug, Error)]
pub enum DomainError {
    // =========================================================================
    // Validation Errors
    // =========================================================================
    #[error("Invalid room rules: {0}")]
    InvalidRoomRules(String),

    #[error("Handshake is missing roomId or peerId")]
    MissingHandshakeFields,

    #[error("Room not found: {0}")]
    UnknownRoom(RoomId),

    #[error("Peer not found: {0}")]
    UnknownPeer(PeerId),

    #[error("Not the room owner")]
    NotRoomOwner,

    // =========================================================================
    // State Errors (aggregate refused the transition)
    // =========================================================================
    #[error("Room is no longer active")]
    RoomInactive,

    #[error("Room is full")]
    RoomFull,

    #[error("Peer already joined this room")]
    AlreadyJoined,

    #[error("Peer is not a member of this room")]
    NotAMember,

    #[error("Room is already closed")]
    AlreadyClosed,

    // =========================================================================
    // Infrastructure Errors (wrapped)
    // =========================================================================
    #[error("Storage error: {0}")]
    StorageError(String),
}

impl DomainError {
    /// Get an error code string for API and socket responses
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidRoomRules(_) => "INVALID_ROOM_RULES",
            Self::MissingHandshakeFields => "MISSING_HANDSHAKE_FIELDS",
            Self::UnknownRoom(_) => "UNKNOWN_ROOM",
            Self::UnknownPeer(_) => "UNKNOWN_PEER",
            Self::NotRoomOwner => "NOT_ROOM_OWNER",
            Self::RoomInactive => "ROOM_INACTIVE",
            Self::RoomFull => "ROOM_FULL",
            Self::AlreadyJoined => "ALREADY_JOINED",
            Self::NotAMember => "NOT_A_MEMBER",
            Self::AlreadyClosed => "ALREADY_CLOSED",
            Self::StorageError(_) => "STORAGE_ERROR",
        }
    }

    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::UnknownRoom(_) | Self::UnknownPeer(_))
    }

    /// Check if this is a validation error
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidRoomRules(_) | Self::MissingHandshakeFields
        )
    }

    /// Check if this is an authorization error
    pub fn is_authorization(&self) -> bool {
        matches!(self, Self::NotRoomOwner)
    }

    /// Check if the aggregate refused a state transition
    ///
    /// These surface to the caller and must not be retried.
    pub fn is_state(&self) -> bool {
        matches!(
            self,
            Self::RoomInactive
                | Self::RoomFull
                | Self::AlreadyJoined
                | Self::NotAMember
                | Self::AlreadyClosed
        )
    }
}
