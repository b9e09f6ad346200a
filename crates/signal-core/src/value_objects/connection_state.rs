//! Pairwise connection state and relay fallback mode

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// State of a directed pairwise connection, as reported by clients
///
/// Transitions are free: any state may follow any other. The aggregate only
/// cares about *changes*, which each emit exactly one state-changed event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    New,
    Connecting,
    Connected,
    Disconnected,
    Failed,
}

impl ConnectionState {
    /// Stable wire name
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
            Self::Failed => "failed",
        }
    }

    /// Whether the link is in a non-working state
    #[inline]
    pub fn is_down(&self) -> bool {
        matches!(self, Self::Disconnected | Self::Failed)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error when parsing a connection state from its wire name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown connection state: {0}")]
pub struct ConnectionStateParseError(pub String);

impl FromStr for ConnectionState {
    type Err = ConnectionStateParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(Self::New),
            "connecting" => Ok(Self::Connecting),
            "connected" => Ok(Self::Connected),
            "disconnected" => Ok(Self::Disconnected),
            "failed" => Ok(Self::Failed),
            other => Err(ConnectionStateParseError(other.to_string())),
        }
    }
}

/// Relay fallback mode of a pairwise connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FallbackMode {
    /// Direct peer-to-peer; the broker only relays signaling
    #[default]
    None,
    /// Broker-mediated data relay over the clients' existing sockets
    Websocket,
}
