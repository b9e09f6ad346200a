//! # signal-store
//!
//! In-memory implementations of the domain repository contracts. Durable
//! storage lives behind the same traits; the broker itself only needs the
//! per-aggregate serialization these maps provide (each entry is locked
//! while read-modify-written).

mod peer_connection;
mod room;

pub use peer_connection::InMemoryPeerConnectionRepository;
pub use room::InMemoryRoomRepository;
