//! Repository traits (ports)

mod repositories;

pub use repositories::{PeerConnectionRepository, RepoResult, RoomRepository};
