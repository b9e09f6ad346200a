//! # signal-service
//!
//! Application layer: the domain-event publisher, room use-cases, the
//! prioritized signaling message queue, the signal batch processor, and the
//! pairwise connection-health service.

mod context;
mod error;
mod health;
mod publisher;
mod queue;
mod room;
mod signaling;

pub use context::ServiceContext;
pub use error::{ServiceError, ServiceResult};
pub use health::{
    ConnectionHealth, ConnectionService, ConnectionStats, ReconnectNotifier,
};
pub use publisher::{EventHandler, EventPublisher};
pub use queue::{CoalescedSignals, MessageQueue, SignalKind, SignalSink, SignalingMessage};
pub use room::{JoinOutcome, RoomService};
pub use signaling::SignalService;
