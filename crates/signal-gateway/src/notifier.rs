//! Reconnect notifier
//!
//! The connection service's out-of-band hook into the gateway: when a pair
//! needs reconnection, the counterpart peer is told who to reconnect with.

use std::sync::Arc;

use async_trait::async_trait;

use signal_service::{ConnectionHealth, ReconnectNotifier};

use crate::connection::SocketManager;
use crate::protocol::ServerEvent;

/// Notifier that unicasts `reconnect-needed` over the socket map
pub struct GatewayNotifier {
    sockets: Arc<SocketManager>,
}

impl GatewayNotifier {
    pub fn new(sockets: Arc<SocketManager>) -> Self {
        Self { sockets }
    }
}

#[async_trait]
impl ReconnectNotifier for GatewayNotifier {
    async fn reconnect_needed(&self, entry: &ConnectionHealth) {
        let sent = self
            .sockets
            .send_to_peer(
                &entry.id.remote,
                ServerEvent::ReconnectNeeded {
                    from: entry.id.local.clone(),
                },
            )
            .await;

        if sent == 0 {
            tracing::debug!(
                connection_id = %entry.id,
                "Counterpart offline, reconnect request not delivered"
            );
        }
    }
}
