//! Signal service
//!
//! Applies drained signaling batches to the pairwise aggregates. The
//! aggregate for a pair is created lazily on its first signaling message.
//! One save per batch; the pulled domain events go to the publisher in
//! emission order.

use async_trait::async_trait;
use tracing::instrument;

use signal_core::{PairKey, PeerConnection, RoomId};

use crate::context::ServiceContext;
use crate::error::{ServiceError, ServiceResult};
use crate::queue::{CoalescedSignals, SignalSink};

/// Signal batch processor
#[derive(Clone)]
pub struct SignalService {
    ctx: ServiceContext,
}

impl SignalService {
    /// Create a new SignalService
    pub fn new(ctx: ServiceContext) -> Self {
        Self { ctx }
    }

    /// Apply one coalesced batch to a pair's aggregate
    ///
    /// Offer before answer before candidates, matching drain priority.
    #[instrument(skip(self, batch), fields(connection_id = %pair))]
    pub async fn batch_process_connection(
        &self,
        pair: PairKey,
        room_id: RoomId,
        batch: CoalescedSignals,
    ) -> ServiceResult<()> {
        if batch.is_empty() {
            return Ok(());
        }

        // An established link is one aggregate regardless of which side is
        // sending, so resolve the reverse direction before creating.
        let mut connection = match self.ctx.peer_repo().find_by_id(&pair).await? {
            Some(existing) => existing,
            None => match self.ctx.peer_repo().find_by_id(&pair.reversed()).await? {
                Some(existing) => existing,
                None => {
                    tracing::debug!(connection_id = %pair, room_id = %room_id, "Creating peer connection");
                    PeerConnection::create(pair.clone(), room_id)
                }
            },
        };

        if batch.offer.is_some() {
            connection.handle_offer();
        }
        if batch.answer.is_some() {
            connection.handle_answer();
        }
        for _ in &batch.candidates {
            connection.handle_ice_candidate();
        }

        // Drain before saving so the stored copy carries no pending buffer.
        let events = connection.pull_domain_events();
        self.ctx.peer_repo().save(&connection).await?;

        if let Err(e) = self.ctx.publisher().publish_all(events).await {
            tracing::error!(connection_id = %pair, error = %e, "Failed to publish signaling events");
        }

        Ok(())
    }
}

#[async_trait]
impl SignalSink for SignalService {
    async fn process_batch(
        &self,
        pair: PairKey,
        room_id: RoomId,
        batch: CoalescedSignals,
    ) -> Result<(), ServiceError> {
        self.batch_process_connection(pair, room_id, batch).await
    }
}
