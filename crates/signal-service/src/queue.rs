//! Per-room prioritized signaling message queue
//!
//! Producers never block on other rooms: the queues live in a `DashMap`
//! keyed by room, so enqueue and drain only contend on the same room's
//! entry. A background drain loop takes a bounded batch per room per tick,
//! coalesces it per directed pair, and hands each group to the injected
//! [`SignalSink`] (the signal service). The sink is injected at
//! construction, which keeps the queue ↔ signal-service reference acyclic.
//!
//! Ordering: `(priority asc, sequence asc)`, so offers drain before answers
//! before candidates, FIFO within a priority class. Under overflow the loss class
//! is stale ICE candidates; offers and answers are never dropped.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;

use signal_core::{PairKey, PeerId, RoomId};

use crate::error::ServiceError;

/// Queue length above which stale candidates are shed
const MAX_QUEUE_LENGTH: usize = 1000;

/// Candidates older than this are dropped during overflow shedding
const CANDIDATE_DROP_AGE: Duration = Duration::from_secs(5);

/// Kind of signaling message, which fixes its priority class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalKind {
    Offer,
    Answer,
    IceCandidate,
}

impl SignalKind {
    /// Fixed priority mapping; lower drains earlier
    #[inline]
    pub fn priority(&self) -> u8 {
        match self {
            Self::Offer => 1,
            Self::Answer => 2,
            Self::IceCandidate => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Offer => "offer",
            Self::Answer => "answer",
            Self::IceCandidate => "ice-candidate",
        }
    }
}

/// A signaling message waiting to be drained
#[derive(Debug, Clone)]
pub struct SignalingMessage {
    pub kind: SignalKind,
    pub from: PeerId,
    pub to: PeerId,
    pub room_id: RoomId,
    pub payload: Value,
    pub enqueued_at: Instant,
    seq: u64,
}

impl SignalingMessage {
    fn order_key(&self) -> (u8, u64) {
        (self.kind.priority(), self.seq)
    }
}

#[derive(Debug)]
struct QueueEntry(SignalingMessage);

impl PartialEq for QueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.0.order_key() == other.0.order_key()
    }
}

impl Eq for QueueEntry {}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.order_key().cmp(&other.0.order_key())
    }
}

/// One drained, coalesced group for a directed pair
///
/// Offer and answer are last-wins within the batch; candidates accumulate
/// in arrival order.
#[derive(Debug, Clone, Default)]
pub struct CoalescedSignals {
    pub offer: Option<Value>,
    pub answer: Option<Value>,
    pub candidates: Vec<Value>,
}

impl CoalescedSignals {
    pub fn is_empty(&self) -> bool {
        self.offer.is_none() && self.answer.is_none() && self.candidates.is_empty()
    }
}

/// Consumer of drained signal batches
#[async_trait]
pub trait SignalSink: Send + Sync {
    async fn process_batch(
        &self,
        pair: PairKey,
        room_id: RoomId,
        batch: CoalescedSignals,
    ) -> Result<(), ServiceError>;
}

/// Per-room prioritized FIFO with coalescing drain
pub struct MessageQueue {
    queues: DashMap<RoomId, BinaryHeap<Reverse<QueueEntry>>>,
    seq: AtomicU64,
    batch_size: usize,
    sink: Arc<dyn SignalSink>,
    running: Arc<AtomicBool>,
}

impl MessageQueue {
    /// Create a queue draining into the given sink
    pub fn new(batch_size: usize, sink: Arc<dyn SignalSink>) -> Self {
        Self {
            queues: DashMap::new(),
            seq: AtomicU64::new(0),
            batch_size,
            sink,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Enqueue a signaling message; never blocks the producer on other rooms
    ///
    /// When the room's queue length exceeds the guard, stale ICE candidates
    /// are shed synchronously. Offers and answers are never dropped.
    pub fn enqueue(
        &self,
        kind: SignalKind,
        from: PeerId,
        to: PeerId,
        room_id: RoomId,
        payload: Value,
    ) {
        let message = SignalingMessage {
            kind,
            from,
            to,
            room_id: room_id.clone(),
            payload,
            enqueued_at: Instant::now(),
            seq: self.seq.fetch_add(1, Ordering::Relaxed),
        };

        let mut queue = self.queues.entry(room_id.clone()).or_default();
        queue.push(Reverse(QueueEntry(message)));

        if queue.len() > MAX_QUEUE_LENGTH {
            let now = Instant::now();
            let before = queue.len();
            queue.retain(|Reverse(QueueEntry(m))| {
                m.kind != SignalKind::IceCandidate
                    || now.duration_since(m.enqueued_at) <= CANDIDATE_DROP_AGE
            });
            let dropped = before - queue.len();
            if dropped > 0 {
                tracing::warn!(
                    room_id = %room_id,
                    dropped = dropped,
                    pending = queue.len(),
                    "Queue over capacity, dropped stale candidates"
                );
            }
        }
    }

    /// Pending message count for a room
    pub fn len(&self, room_id: &RoomId) -> usize {
        self.queues.get(room_id).map_or(0, |queue| queue.len())
    }

    /// Whether a room has no pending messages
    pub fn is_empty(&self, room_id: &RoomId) -> bool {
        self.len(room_id) == 0
    }

    /// Run one drain tick over every non-empty room queue
    ///
    /// Returns the number of coalesced groups dispatched. A failing group is
    /// logged and skipped; other groups still run.
    pub async fn drain_once(&self) -> usize {
        // Take batches under the per-room locks, dispatch with none held.
        let batches = self.take_batches();
        let mut dispatched = 0;

        for (room_id, pair, batch) in batches {
            match self
                .sink
                .process_batch(pair.clone(), room_id.clone(), batch)
                .await
            {
                Ok(()) => dispatched += 1,
                Err(e) => {
                    tracing::error!(
                        room_id = %room_id,
                        connection_id = %pair,
                        error = %e,
                        "Signal batch processing failed"
                    );
                }
            }
        }

        dispatched
    }

    fn take_batches(&self) -> Vec<(RoomId, PairKey, CoalescedSignals)> {
        let rooms: Vec<RoomId> = self.queues.iter().map(|entry| entry.key().clone()).collect();
        let mut out = Vec::new();

        // Each room's entry is locked only while its own batch is popped, so
        // draining one room never stalls another room's enqueue.
        for room_id in rooms {
            let Some(mut queue) = self.queues.get_mut(&room_id) else {
                continue;
            };
            if queue.is_empty() {
                continue;
            }

            // Pops come out in (priority, sequence) order, so within a group
            // the last offer/answer seen is the newest.
            let mut groups: HashMap<PairKey, CoalescedSignals> = HashMap::new();
            let mut order = Vec::new();
            for _ in 0..self.batch_size {
                let Some(Reverse(QueueEntry(message))) = queue.pop() else {
                    break;
                };
                let pair = PairKey::new(message.from.clone(), message.to.clone());
                let group = groups.entry(pair.clone()).or_insert_with(|| {
                    order.push(pair.clone());
                    CoalescedSignals::default()
                });
                match message.kind {
                    SignalKind::Offer => group.offer = Some(message.payload),
                    SignalKind::Answer => group.answer = Some(message.payload),
                    SignalKind::IceCandidate => group.candidates.push(message.payload),
                }
            }
            drop(queue);
            self.queues.remove_if(&room_id, |_, queue| queue.is_empty());

            for pair in order {
                if let Some(batch) = groups.remove(&pair) {
                    out.push((room_id.clone(), pair, batch));
                }
            }
        }

        out
    }

    /// Start the background drain loop
    pub fn start(self: Arc<Self>, period: Duration) {
        if self.running.swap(true, Ordering::SeqCst) {
            tracing::warn!("Message queue drain loop already running");
            return;
        }

        let queue = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            while queue.running.load(Ordering::SeqCst) {
                ticker.tick().await;
                queue.drain_once().await;
            }
            tracing::info!("Message queue drain loop stopped");
        });

        tracing::info!(period_ms = period.as_millis() as u64, "Message queue drain loop started");
    }

    /// Stop the background drain loop
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

impl Drop for MessageQueue {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
    }
}
