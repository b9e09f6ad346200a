//! Domain events

mod domain_event;

pub use domain_event::{
    AnswerReceivedEvent, ConnectionStateChangedEvent, ConnectionTimeoutEvent, DomainEvent,
    IceCandidateReceivedEvent, OfferReceivedEvent, PlayerJoinedEvent, PlayerLeftEvent,
    RoomClosedEvent, RoomCreatedEvent, RoomRuleChangedEvent,
};
