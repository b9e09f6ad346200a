//! Connection health service
//!
//! In-memory directory of pairwise link health, keyed by the directed pair.
//! Client state reports flow through here into the aggregates; the monitor
//! loop requests reconnections for stale or failed links and the reaper
//! drops entries (and their aggregates) that are dead or out of attempts.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;

use signal_common::HealthConfig;
use signal_core::{ConnectionState, FallbackMode, PairKey, PeerId, RoomId};

use crate::context::ServiceContext;
use crate::error::ServiceResult;

/// Monitor loop period
const MONITOR_PERIOD: Duration = Duration::from_secs(10);

/// Reaper loop period
const REAPER_PERIOD: Duration = Duration::from_secs(60);

/// Entries silent this long (and not connected) are reaped
const REAP_IDLE: Duration = Duration::from_secs(300);

/// Health record for one directed pair
#[derive(Debug, Clone)]
pub struct ConnectionHealth {
    pub id: PairKey,
    pub room_id: RoomId,
    pub state: ConnectionState,
    pub last_updated: Instant,
    pub reconnect_attempts: u32,
    pub fallback_mode: FallbackMode,
}

impl ConnectionHealth {
    fn new(id: PairKey, room_id: RoomId, state: ConnectionState) -> Self {
        Self {
            id,
            room_id,
            state,
            last_updated: Instant::now(),
            reconnect_attempts: 0,
            fallback_mode: FallbackMode::None,
        }
    }
}

/// Counts partitioned by state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionStats {
    pub new: usize,
    pub connecting: usize,
    pub connected: usize,
    pub disconnected: usize,
    pub failed: usize,
    pub total: usize,
}

/// Hook through which the gateway notifies a counterpart peer that
/// reconnection is needed
#[async_trait]
pub trait ReconnectNotifier: Send + Sync {
    async fn reconnect_needed(&self, entry: &ConnectionHealth);
}

/// In-memory pairwise health tracker
pub struct ConnectionService {
    ctx: ServiceContext,
    entries: DashMap<PairKey, ConnectionHealth>,
    notifier: Arc<dyn ReconnectNotifier>,
    config: HealthConfig,
    running: Arc<AtomicBool>,
}

impl ConnectionService {
    /// Create a new connection service
    pub fn new(
        ctx: ServiceContext,
        config: HealthConfig,
        notifier: Arc<dyn ReconnectNotifier>,
    ) -> Self {
        Self {
            ctx,
            entries: DashMap::new(),
            notifier,
            config,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Apply a client state report for a peer
    ///
    /// Every pairwise aggregate the peer participates in (either direction)
    /// takes the transition; the in-memory entry mirrors it with reconnect
    /// accounting. Returns the number of pairs updated.
    pub async fn update_connection_state(
        &self,
        peer_id: &PeerId,
        new_state: ConnectionState,
    ) -> ServiceResult<usize> {
        let connections = self.ctx.peer_repo().find_by_peer_id(peer_id).await?;
        let count = connections.len();

        for mut connection in connections {
            let pair = connection.id.clone();
            connection.update_connection_state(new_state);

            {
                let mut entry = self.entries.entry(pair.clone()).or_insert_with(|| {
                    ConnectionHealth::new(pair.clone(), connection.room_id.clone(), new_state)
                });
                let previous = entry.state;
                if previous == ConnectionState::Connected && new_state.is_down() {
                    entry.reconnect_attempts += 1;
                } else if new_state == ConnectionState::Connected && previous.is_down() {
                    entry.reconnect_attempts = 0;
                }
                entry.state = new_state;
                entry.last_updated = Instant::now();
            }

            let events = connection.pull_domain_events();
            self.ctx.peer_repo().save(&connection).await?;

            if let Err(e) = self.ctx.publisher().publish_all(events).await {
                tracing::error!(connection_id = %pair, error = %e, "Failed to publish health events");
            }
        }

        tracing::debug!(peer_id = %peer_id, state = %new_state, pairs = count, "Connection state applied");
        Ok(count)
    }

    /// Request a reconnection for a pair
    ///
    /// Refused once the attempt budget is spent. Returns whether the
    /// counterpart was notified.
    pub async fn trigger_reconnection(&self, pair: &PairKey) -> bool {
        let entry = {
            let Some(mut entry) = self.entries.get_mut(pair) else {
                return false;
            };
            if entry.reconnect_attempts >= self.config.max_reconnect_attempts {
                tracing::debug!(connection_id = %pair, "Reconnect budget spent, refusing");
                return false;
            }
            entry.reconnect_attempts += 1;
            entry.last_updated = Instant::now();
            entry.clone()
        };

        tracing::info!(
            connection_id = %pair,
            attempt = entry.reconnect_attempts,
            "Requesting reconnection"
        );
        self.notifier.reconnect_needed(&entry).await;
        true
    }

    /// Run one monitor pass
    ///
    /// Stale connected links and failed links with budget left get a
    /// reconnection request. Returns the number of requests made.
    pub async fn monitor_once(&self) -> usize {
        let stale_after = Duration::from_millis(self.config.stale_connection_ms);
        let candidates: Vec<PairKey> = self
            .entries
            .iter()
            .filter(|entry| match entry.state {
                ConnectionState::Connected => entry.last_updated.elapsed() > stale_after,
                ConnectionState::Failed => {
                    entry.reconnect_attempts < self.config.max_reconnect_attempts
                }
                _ => false,
            })
            .map(|entry| entry.id.clone())
            .collect();

        let mut triggered = 0;
        for pair in candidates {
            if self.trigger_reconnection(&pair).await {
                triggered += 1;
            }
        }
        triggered
    }

    /// Run one reaper pass
    ///
    /// Removes long-idle non-connected entries and pairs that are down with
    /// the attempt budget spent, deleting the underlying aggregates.
    /// Returns the number of entries removed.
    pub async fn reap_once(&self) -> usize {
        let doomed: Vec<PairKey> = self
            .entries
            .iter()
            .filter(|entry| {
                let idle_dead = entry.last_updated.elapsed() > REAP_IDLE
                    && entry.state != ConnectionState::Connected;
                let exhausted = entry.reconnect_attempts >= self.config.max_reconnect_attempts
                    && entry.state.is_down();
                idle_dead || exhausted
            })
            .map(|entry| entry.id.clone())
            .collect();

        let mut reaped = 0;
        for pair in doomed {
            self.entries.remove(&pair);
            if let Err(e) = self.ctx.peer_repo().delete(&pair).await {
                tracing::debug!(connection_id = %pair, error = %e, "Aggregate already gone during reap");
            }
            reaped += 1;
        }

        if reaped > 0 {
            tracing::info!(reaped = reaped, "Reaped stale connections");
        }
        reaped
    }

    /// Set the relay fallback mode for a pair
    ///
    /// Resolves the entry by either direction; a missing entry is hydrated
    /// from the repository. Entering websocket fallback refunds one
    /// reconnect attempt.
    pub async fn set_fallback_mode(
        &self,
        local: &PeerId,
        remote: &PeerId,
        mode: FallbackMode,
    ) -> ServiceResult<()> {
        let forward = PairKey::new(local.clone(), remote.clone());
        let key = match self.resolve_entry(&forward).await? {
            Some(key) => key,
            None => {
                return Err(crate::error::ServiceError::not_found(
                    "Connection",
                    forward.composite(),
                ))
            }
        };

        if let Some(mut entry) = self.entries.get_mut(&key) {
            let entering_websocket =
                mode == FallbackMode::Websocket && entry.fallback_mode != FallbackMode::Websocket;
            entry.fallback_mode = mode;
            entry.last_updated = Instant::now();
            if entering_websocket {
                entry.reconnect_attempts = entry.reconnect_attempts.saturating_sub(1);
            }
        }

        tracing::info!(connection_id = %key, mode = ?mode, "Fallback mode set");
        Ok(())
    }

    /// Check whether a pair is in websocket fallback, either direction
    pub fn is_using_fallback(&self, pair: &PairKey) -> bool {
        let check = |key: &PairKey| {
            self.entries
                .get(key)
                .is_some_and(|e| e.fallback_mode == FallbackMode::Websocket)
        };
        check(pair) || check(&pair.reversed())
    }

    /// Number of entries in websocket fallback
    pub fn fallback_connection_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.fallback_mode == FallbackMode::Websocket)
            .count()
    }

    /// Look up a health entry by pair, exact direction only
    pub fn get(&self, pair: &PairKey) -> Option<ConnectionHealth> {
        self.entries.get(pair).map(|e| e.clone())
    }

    /// Counts partitioned by state plus the total
    pub fn connection_stats(&self) -> ConnectionStats {
        let mut by_state: HashMap<ConnectionState, usize> = HashMap::new();
        for entry in self.entries.iter() {
            *by_state.entry(entry.state).or_default() += 1;
        }
        ConnectionStats {
            new: by_state.get(&ConnectionState::New).copied().unwrap_or(0),
            connecting: by_state
                .get(&ConnectionState::Connecting)
                .copied()
                .unwrap_or(0),
            connected: by_state
                .get(&ConnectionState::Connected)
                .copied()
                .unwrap_or(0),
            disconnected: by_state
                .get(&ConnectionState::Disconnected)
                .copied()
                .unwrap_or(0),
            failed: by_state.get(&ConnectionState::Failed).copied().unwrap_or(0),
            total: self.entries.len(),
        }
    }

    /// Resolve an entry key by either direction, hydrating from the
    /// repository when the directory has neither.
    async fn resolve_entry(&self, pair: &PairKey) -> ServiceResult<Option<PairKey>> {
        if self.entries.contains_key(pair) {
            return Ok(Some(pair.clone()));
        }
        let reversed = pair.reversed();
        if self.entries.contains_key(&reversed) {
            return Ok(Some(reversed));
        }

        for key in [pair.clone(), reversed] {
            if let Some(connection) = self.ctx.peer_repo().find_by_id(&key).await? {
                self.entries.insert(
                    key.clone(),
                    ConnectionHealth::new(key.clone(), connection.room_id, connection.state),
                );
                return Ok(Some(key));
            }
        }

        Ok(None)
    }

    /// Start the monitor and reaper loops
    pub fn start(self: Arc<Self>) {
        if self.running.swap(true, Ordering::SeqCst) {
            tracing::warn!("Connection service loops already running");
            return;
        }

        let monitor = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(MONITOR_PERIOD);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            while monitor.running.load(Ordering::SeqCst) {
                ticker.tick().await;
                monitor.monitor_once().await;
            }
        });

        let reaper = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(REAPER_PERIOD);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            while reaper.running.load(Ordering::SeqCst) {
                ticker.tick().await;
                reaper.reap_once().await;
            }
        });

        tracing::info!("Connection service monitor and reaper started");
    }

    /// Stop the monitor and reaper loops
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

impl Drop for ConnectionService {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::publisher::EventPublisher;
    use signal_core::PeerConnection;
    use signal_store::{InMemoryPeerConnectionRepository, InMemoryRoomRepository};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingNotifier {
        notified: Mutex<Vec<PairKey>>,
    }

    #[async_trait]
    impl ReconnectNotifier for RecordingNotifier {
        async fn reconnect_needed(&self, entry: &ConnectionHealth) {
            self.notified.lock().unwrap().push(entry.id.clone());
        }
    }

    fn config() -> HealthConfig {
        HealthConfig {
            stale_connection_ms: 30_000,
            max_reconnect_attempts: 3,
        }
    }

    async fn setup() -> (Arc<ConnectionService>, ServiceContext, Arc<RecordingNotifier>) {
        let ctx = ServiceContext::new(
            Arc::new(InMemoryRoomRepository::new()),
            Arc::new(InMemoryPeerConnectionRepository::new()),
            Arc::new(EventPublisher::new()),
        );
        let notifier = Arc::new(RecordingNotifier::default());
        let service = Arc::new(ConnectionService::new(
            ctx.clone(),
            config(),
            notifier.clone() as Arc<dyn ReconnectNotifier>,
        ));
        (service, ctx, notifier)
    }

    async fn seed_pair(ctx: &ServiceContext, local: &str, remote: &str) -> PairKey {
        let pair = PairKey::new(local, remote);
        let pc = PeerConnection::create(pair.clone(), RoomId::new("r1"));
        ctx.peer_repo().save(&pc).await.unwrap();
        pair
    }

    #[tokio::test]
    async fn test_state_report_updates_both_directions() {
        let (service, ctx, _) = setup().await;
        seed_pair(&ctx, "a", "b").await;
        seed_pair(&ctx, "b", "a").await;

        let updated = service
            .update_connection_state(&PeerId::new("a"), ConnectionState::Connected)
            .await
            .unwrap();
        assert_eq!(updated, 2);

        let stats = service.connection_stats();
        assert_eq!(stats.connected, 2);
        assert_eq!(stats.total, 2);
    }

    #[tokio::test]
    async fn test_reconnect_accounting() {
        let (service, ctx, _) = setup().await;
        let pair = seed_pair(&ctx, "a", "b").await;
        let peer = PeerId::new("a");

        service
            .update_connection_state(&peer, ConnectionState::Connected)
            .await
            .unwrap();
        service
            .update_connection_state(&peer, ConnectionState::Failed)
            .await
            .unwrap();
        assert_eq!(service.get(&pair).unwrap().reconnect_attempts, 1);

        // Reconnecting resets the budget
        service
            .update_connection_state(&peer, ConnectionState::Connected)
            .await
            .unwrap();
        assert_eq!(service.get(&pair).unwrap().reconnect_attempts, 0);
    }

    #[tokio::test]
    async fn test_trigger_refused_after_budget_spent() {
        let (service, ctx, notifier) = setup().await;
        let pair = seed_pair(&ctx, "a", "b").await;
        service
            .update_connection_state(&PeerId::new("a"), ConnectionState::Failed)
            .await
            .unwrap();

        assert!(service.trigger_reconnection(&pair).await);
        assert!(service.trigger_reconnection(&pair).await);
        assert!(service.trigger_reconnection(&pair).await);
        // Budget of 3 spent
        assert!(!service.trigger_reconnection(&pair).await);
        assert_eq!(notifier.notified.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_monitor_triggers_failed_with_budget() {
        let (service, ctx, notifier) = setup().await;
        seed_pair(&ctx, "a", "b").await;
        service
            .update_connection_state(&PeerId::new("a"), ConnectionState::Failed)
            .await
            .unwrap();

        assert_eq!(service.monitor_once().await, 1);
        assert_eq!(notifier.notified.lock().unwrap().len(), 1);

        // Two more passes spend the budget; the fourth finds nothing to do
        service.monitor_once().await;
        service.monitor_once().await;
        assert_eq!(service.monitor_once().await, 0);
        assert_eq!(notifier.notified.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_monitor_triggers_stale_connected() {
        let (service, ctx, notifier) = setup().await;
        let pair = seed_pair(&ctx, "a", "b").await;
        service
            .update_connection_state(&PeerId::new("a"), ConnectionState::Connected)
            .await
            .unwrap();

        // Fresh entry: nothing to do
        assert_eq!(service.monitor_once().await, 0);

        // Backdate past the stale threshold
        if let Some(past) = Instant::now().checked_sub(Duration::from_secs(60)) {
            service.entries.get_mut(&pair).unwrap().last_updated = past;
            assert_eq!(service.monitor_once().await, 1);
            assert_eq!(notifier.notified.lock().unwrap().len(), 1);
        }
    }

    #[tokio::test]
    async fn test_reaper_removes_exhausted_pairs() {
        let (service, ctx, _) = setup().await;
        let pair = seed_pair(&ctx, "a", "b").await;
        service
            .update_connection_state(&PeerId::new("a"), ConnectionState::Failed)
            .await
            .unwrap();
        service.trigger_reconnection(&pair).await;
        service.trigger_reconnection(&pair).await;
        service.trigger_reconnection(&pair).await;

        assert_eq!(service.reap_once().await, 1);
        assert!(service.get(&pair).is_none());
        assert!(ctx.peer_repo().find_by_id(&pair).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_reaper_removes_long_idle_entries() {
        let (service, ctx, _) = setup().await;
        let pair = seed_pair(&ctx, "a", "b").await;
        service
            .update_connection_state(&PeerId::new("a"), ConnectionState::Disconnected)
            .await
            .unwrap();

        assert_eq!(service.reap_once().await, 0);

        if let Some(past) = Instant::now().checked_sub(Duration::from_secs(400)) {
            service.entries.get_mut(&pair).unwrap().last_updated = past;
            assert_eq!(service.reap_once().await, 1);
        }
    }

    #[tokio::test]
    async fn test_reaper_spares_connected_entries() {
        let (service, ctx, _) = setup().await;
        let pair = seed_pair(&ctx, "a", "b").await;
        service
            .update_connection_state(&PeerId::new("a"), ConnectionState::Connected)
            .await
            .unwrap();

        if let Some(past) = Instant::now().checked_sub(Duration::from_secs(400)) {
            service.entries.get_mut(&pair).unwrap().last_updated = past;
            assert_eq!(service.reap_once().await, 0);
            assert!(service.get(&pair).is_some());
        }
    }

    #[tokio::test]
    async fn test_fallback_resolves_either_direction() {
        let (service, ctx, _) = setup().await;
        let pair = seed_pair(&ctx, "a", "b").await;
        service
            .update_connection_state(&PeerId::new("a"), ConnectionState::Failed)
            .await
            .unwrap();

        // Activation arrives from the other side
        service
            .set_fallback_mode(&PeerId::new("b"), &PeerId::new("a"), FallbackMode::Websocket)
            .await
            .unwrap();

        assert!(service.is_using_fallback(&pair));
        assert!(service.is_using_fallback(&pair.reversed()));
        assert_eq!(service.fallback_connection_count(), 1);
    }

    #[tokio::test]
    async fn test_fallback_hydrates_from_repository() {
        let (service, ctx, _) = setup().await;
        let pair = seed_pair(&ctx, "a", "b").await;

        // No in-memory entry yet; the repository copy backs the activation
        service
            .set_fallback_mode(&PeerId::new("a"), &PeerId::new("b"), FallbackMode::Websocket)
            .await
            .unwrap();
        assert!(service.is_using_fallback(&pair));
    }

    #[tokio::test]
    async fn test_fallback_unknown_pair_errors() {
        let (service, _, _) = setup().await;
        let result = service
            .set_fallback_mode(&PeerId::new("x"), &PeerId::new("y"), FallbackMode::Websocket)
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_entering_websocket_refunds_one_attempt() {
        let (service, ctx, _) = setup().await;
        let pair = seed_pair(&ctx, "a", "b").await;
        service
            .update_connection_state(&PeerId::new("a"), ConnectionState::Failed)
            .await
            .unwrap();
        service.trigger_reconnection(&pair).await;
        service.trigger_reconnection(&pair).await;
        assert_eq!(service.get(&pair).unwrap().reconnect_attempts, 2);

        service
            .set_fallback_mode(&PeerId::new("a"), &PeerId::new("b"), FallbackMode::Websocket)
            .await
            .unwrap();
        assert_eq!(service.get(&pair).unwrap().reconnect_attempts, 1);

        // Setting the same mode again is not another refund
        service
            .set_fallback_mode(&PeerId::new("a"), &PeerId::new("b"), FallbackMode::Websocket)
            .await
            .unwrap();
        assert_eq!(service.get(&pair).unwrap().reconnect_attempts, 1);
    }
}
