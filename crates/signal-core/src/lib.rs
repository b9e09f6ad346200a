//! # signal-core
//!
//! Domain layer containing the room and peer-connection aggregates, value
//! objects, repository traits, and domain events.
//! This crate has zero dependencies on infrastructure (sockets, web framework, etc.).

pub mod entities;
pub mod error;
pub mod events;
pub mod traits;
pub mod value_objects;

// Re-export commonly used types at crate root
pub use entities::{PeerConnection, Room};
pub use error::DomainError;
pub use events::DomainEvent;
pub use traits::{PeerConnectionRepository, RepoResult, RoomRepository};
pub use value_objects::{
    ConnectionState, ConnectionStateParseError, FallbackMode, PairKey, PeerId, RoomId, RoomRules,
};
