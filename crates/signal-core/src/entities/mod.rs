//! Domain entities - core business objects

mod peer_connection;
mod room;

pub use peer_connection::PeerConnection;
pub use room::Room;
