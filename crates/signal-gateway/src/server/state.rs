//! Gateway state
//!
//! Shared dependencies for the gateway server.

use std::sync::Arc;

use signal_common::AppConfig;
use signal_service::{ConnectionService, MessageQueue, ServiceContext};

use crate::connection::SocketManager;
use crate::stats::RoomStatsTable;

/// Gateway application state
#[derive(Clone)]
pub struct GatewayState {
    /// Service context with repositories and the event publisher
    service_context: ServiceContext,
    /// Socket registry and broadcast groups
    sockets: Arc<SocketManager>,
    /// Per-room admission stats
    stats: Arc<RoomStatsTable>,
    /// Pairwise health tracker
    connections: Arc<ConnectionService>,
    /// Signaling message queue
    queue: Arc<MessageQueue>,
    /// Application configuration
    config: Arc<AppConfig>,
}

impl GatewayState {
    /// Create a new gateway state
    pub fn new(
        service_context: ServiceContext,
        sockets: Arc<SocketManager>,
        stats: Arc<RoomStatsTable>,
        connections: Arc<ConnectionService>,
        queue: Arc<MessageQueue>,
        config: AppConfig,
    ) -> Self {
        Self {
            service_context,
            sockets,
            stats,
            connections,
            queue,
            config: Arc::new(config),
        }
    }

    /// Get the service context
    pub fn service_context(&self) -> &ServiceContext {
        &self.service_context
    }

    /// Get the socket manager
    pub fn sockets(&self) -> &SocketManager {
        &self.sockets
    }

    /// Get a shared handle to the socket manager
    pub fn sockets_arc(&self) -> Arc<SocketManager> {
        self.sockets.clone()
    }

    /// Get the room stats table
    pub fn stats(&self) -> &RoomStatsTable {
        &self.stats
    }

    /// Get the connection health service
    pub fn connections(&self) -> &ConnectionService {
        &self.connections
    }

    /// Get the message queue
    pub fn queue(&self) -> &MessageQueue {
        &self.queue
    }

    /// Get the application configuration
    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}

impl std::fmt::Debug for GatewayState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayState")
            .field("sockets", &self.sockets)
            .field("stats", &self.stats)
            .finish()
    }
}
