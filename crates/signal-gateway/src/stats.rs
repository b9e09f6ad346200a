//! Room statistics table
//!
//! Transient per-room counters backing join admission. The only hard guard
//! is the pairwise-connection cap; a pair count far off the expected
//! `n·(n−1)/2` is logged but never rejects anyone.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use dashmap::DashMap;

use signal_core::RoomId;

/// Stats entries idle longer than this are reaped
const STATS_IDLE_REAP: Duration = Duration::from_secs(600);

/// Stats entries stale longer than this are eligible for deactivation
const STATS_STALE: Duration = Duration::from_secs(300);

/// Healthy band for `connections / expected_pairs`
const PAIR_RATIO_BAND: (f64, f64) = (0.8, 1.5);

/// Transient counters for one room
#[derive(Debug, Clone)]
pub struct RoomStats {
    pub member_count: usize,
    pub connection_count: usize,
    pub active: bool,
    pub last_updated: Instant,
}

/// Gateway-local room stats with the admission guard
pub struct RoomStatsTable {
    entries: DashMap<RoomId, RoomStats>,
    max_connections_per_room: usize,
}

impl RoomStatsTable {
    /// Create a table with the given per-room connection cap
    #[must_use]
    pub fn new(max_connections_per_room: usize) -> Self {
        Self {
            entries: DashMap::new(),
            max_connections_per_room,
        }
    }

    /// Record fresh counts for a room
    pub fn refresh(&self, room_id: &RoomId, member_count: usize, connection_count: usize) {
        self.entries.insert(
            room_id.clone(),
            RoomStats {
                member_count,
                connection_count,
                active: true,
                last_updated: Instant::now(),
            },
        );

        // n·(n−1)/2 pairs expected for n members; a ratio outside the band
        // is suspicious churn but never grounds for rejection.
        let expected = member_count * member_count.saturating_sub(1) / 2;
        if expected > 0 {
            let ratio = connection_count as f64 / expected as f64;
            if !(PAIR_RATIO_BAND.0..=PAIR_RATIO_BAND.1).contains(&ratio) {
                tracing::warn!(
                    room_id = %room_id,
                    members = member_count,
                    connections = connection_count,
                    expected = expected,
                    ratio = ratio,
                    "Pairwise connection count outside expected band"
                );
            }
        }
    }

    /// Admission guard for joins
    pub fn admit(&self, room_id: &RoomId) -> bool {
        self.entries
            .get(room_id)
            .map_or(true, |s| s.connection_count < self.max_connections_per_room)
    }

    /// Get a room's stats snapshot
    pub fn get(&self, room_id: &RoomId) -> Option<RoomStats> {
        self.entries.get(room_id).map(|s| s.clone())
    }

    /// Number of tracked rooms
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Run one monitor pass
    ///
    /// Reaps entries idle past ten minutes and deactivates stale entries
    /// whose room is no longer in the live set. Returns `(reaped,
    /// deactivated)`.
    pub fn monitor_once(&self, live_rooms: &HashSet<RoomId>) -> (usize, usize) {
        let before = self.entries.len();
        self.entries
            .retain(|_, stats| stats.last_updated.elapsed() <= STATS_IDLE_REAP);
        let reaped = before - self.entries.len();

        let mut deactivated = 0;
        for mut entry in self.entries.iter_mut() {
            if entry.active
                && entry.last_updated.elapsed() > STATS_STALE
                && (!live_rooms.contains(entry.key()) || entry.member_count == 0)
            {
                entry.active = false;
                deactivated += 1;
            }
        }

        if reaped > 0 || deactivated > 0 {
            tracing::info!(reaped = reaped, deactivated = deactivated, "Room stats monitor pass");
        }
        (reaped, deactivated)
    }
}

impl std::fmt::Debug for RoomStatsTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoomStatsTable")
            .field("rooms", &self.entries.len())
            .field("max_connections_per_room", &self.max_connections_per_room)
            .finish()
    }
}
