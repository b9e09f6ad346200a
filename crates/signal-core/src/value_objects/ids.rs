//! Identity types for rooms, peers, and directed peer pairs
//!
//! Room and peer identities are opaque strings assigned by the caller (the
//! admin API mints room ids, clients bring their own peer ids). A `PairKey`
//! is a *directed* `(local, remote)` tuple: `(A,B)` and `(B,A)` are distinct
//! keys on purpose, since each side of a WebRTC link keeps its own state.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque room identity
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(String);

impl RoomId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for RoomId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for RoomId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Opaque peer identity
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeerId(String);

impl PeerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for PeerId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for PeerId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Directed pairwise connection key
///
/// Serialized as `local->remote` when used as a composite string key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PairKey {
    pub local: PeerId,
    pub remote: PeerId,
}

impl PairKey {
    pub fn new(local: impl Into<PeerId>, remote: impl Into<PeerId>) -> Self {
        Self {
            local: local.into(),
            remote: remote.into(),
        }
    }

    /// The opposite direction of this pair
    #[must_use]
    pub fn reversed(&self) -> Self {
        Self {
            local: self.remote.clone(),
            remote: self.local.clone(),
        }
    }

    /// Check whether a peer participates in this pair (either side)
    #[inline]
    pub fn involves(&self, peer: &PeerId) -> bool {
        &self.local == peer || &self.remote == peer
    }

    /// Composite string form, e.g. `"alice->bob"`
    #[must_use]
    pub fn composite(&self) -> String {
        format!("{}->{}", self.local, self.remote)
    }
}

impl fmt::Display for PairKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}->{}", self.local, self.remote)
    }
}

impl From<(PeerId, PeerId)> for PairKey {
    fn from((local, remote): (PeerId, PeerId)) -> Self {
        Self { local, remote }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pair_key_is_directional() {
        let ab = PairKey::new("a", "b");
        let ba = PairKey::new("b", "a");
        assert_ne!(ab, ba);
        assert_eq!(ab.reversed(), ba);
    }

    #[test]
    fn test_pair_key_involves() {
        let pair = PairKey::new("alice", "bob");
        assert!(pair.involves(&PeerId::new("alice")));
        assert!(pair.involves(&PeerId::new("bob")));
        assert!(!pair.involves(&PeerId::new("carol")));
    }

    #[test]
    fn test_pair_key_composite() {
        let pair = PairKey::new("alice", "bob");
        assert_eq!(pair.composite(), "alice->bob");
        assert_eq!(pair.to_string(), "alice->bob");
    }

    #[test]
    fn test_id_serde_is_transparent() {
        let id = RoomId::new("room-1");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"room-1\"");

        let parsed: RoomId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, id);
    }
}
