//! Gateway server setup
//!
//! Builds the shared state (repositories, publisher, queue, health service,
//! stats), wires the background loops, and runs the WebSocket listener next
//! to the administrative HTTP listener.

mod handler;
mod state;

pub use handler::gateway_handler;
pub use state::GatewayState;

use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{routing::get, Router};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use signal_common::{AppConfig, AppError};
use signal_service::{
    ConnectionService, EventPublisher, MessageQueue, ServiceContext, SignalService,
};
use signal_store::{InMemoryPeerConnectionRepository, InMemoryRoomRepository};

use crate::connection::SocketManager;
use crate::notifier::GatewayNotifier;
use crate::stats::RoomStatsTable;

/// Create the gateway router
pub fn create_router(ws_path: &str) -> Router<GatewayState> {
    Router::new()
        .route(ws_path, get(gateway_handler))
        .route("/health", get(health_check))
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}

/// Build the complete application
pub fn create_app(state: GatewayState) -> Router {
    create_router(&state.config().ws_path)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Initialize all dependencies and create `GatewayState`
///
/// Starts the queue drain loop, the health monitor and reaper, and the
/// room-stats monitor.
pub fn create_gateway_state(config: AppConfig) -> GatewayState {
    let publisher = Arc::new(EventPublisher::new());
    let service_context = ServiceContext::new(
        Arc::new(InMemoryRoomRepository::new()),
        Arc::new(InMemoryPeerConnectionRepository::new()),
        publisher,
    );

    let sockets = SocketManager::new_shared();

    let notifier = Arc::new(GatewayNotifier::new(sockets.clone()));
    let connections = Arc::new(ConnectionService::new(
        service_context.clone(),
        config.health.clone(),
        notifier,
    ));
    connections.clone().start();

    // The queue drains into the signal service; injecting the sink here
    // keeps the queue/service references acyclic.
    let signal_service = Arc::new(SignalService::new(service_context.clone()));
    let queue = Arc::new(MessageQueue::new(config.queue.batch_size, signal_service));
    queue
        .clone()
        .start(Duration::from_millis(config.queue.drain_ms));

    let stats = Arc::new(RoomStatsTable::new(config.max_connections_per_room));
    spawn_stats_monitor(
        stats.clone(),
        service_context.clone(),
        Duration::from_millis(config.room_stats_monitor_ms),
    );

    GatewayState::new(service_context, sockets, stats, connections, queue, config)
}

/// Periodically reconcile the stats table against the live room set
fn spawn_stats_monitor(stats: Arc<RoomStatsTable>, ctx: ServiceContext, period: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let live: HashSet<_> = match ctx.room_repo().find_active().await {
                Ok(rooms) => rooms
                    .into_iter()
                    .filter(|r| !r.members.is_empty())
                    .map(|r| r.id)
                    .collect(),
                Err(e) => {
                    tracing::error!(error = %e, "Stats monitor failed to list active rooms");
                    continue;
                }
            };
            stats.monitor_once(&live);
        }
    });
}

/// Run the WebSocket listener
pub async fn run_server(app: Router, addr: SocketAddr) -> Result<(), AppError> {
    tracing::info!("Starting gateway server on {}", addr);

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| AppError::Config(format!("Failed to bind to {addr}: {e}")))?;

    tracing::info!("Gateway listening on ws://{}", addr);

    axum::serve(listener, app)
        .await
        .map_err(|e| AppError::Config(format!("Server error: {e}")))?;

    Ok(())
}

/// Run the gateway and the admin API off one shared state
pub async fn run(config: AppConfig) -> Result<(), AppError> {
    let ws_addr = SocketAddr::from(([0, 0, 0, 0], config.gateway.port));
    let api_addr = SocketAddr::from(([0, 0, 0, 0], config.api.port));

    let state = create_gateway_state(config.clone());

    // The admin API shares the gateway's repositories and publisher, so
    // rooms minted over HTTP are immediately joinable over the socket.
    let api_state = signal_api::AppState::new(state.service_context().clone(), config);
    let api_app = signal_api::create_app(api_state);
    tokio::spawn(async move {
        if let Err(e) = signal_api::run_server(api_app, api_addr).await {
            tracing::error!(error = %e, "Admin API server exited");
        }
    });

    let app = create_app(state);
    run_server(app, ws_addr).await
}
