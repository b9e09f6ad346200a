//! Value objects - immutable types that represent domain concepts

mod connection_state;
mod ids;
mod room_rules;

pub use connection_state::{ConnectionState, ConnectionStateParseError, FallbackMode};
pub use ids::{PairKey, PeerId, RoomId};
pub use room_rules::RoomRules;
