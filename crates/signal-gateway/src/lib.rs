//! # signal-gateway
//!
//! WebSocket gateway for the signaling broker: per-peer socket multiplexing,
//! room fan-out, queue production, connection-state ingress, and the
//! relay fallback dispatcher.

pub mod connection;
pub mod handlers;
pub mod notifier;
pub mod protocol;
pub mod server;
pub mod stats;
