//! Domain-event publisher
//!
//! Multicasts events, by event name, to registered handlers in the order
//! they were published. Handlers are awaited one at a time so a single
//! publisher instance gives downstream consumers a total order.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use signal_core::DomainEvent;

/// A subscriber for domain events
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, event: &DomainEvent) -> anyhow::Result<()>;
}

/// Registry-based domain-event publisher
///
/// Duplicate registrations are permitted; each registration fires once per
/// matching event.
#[derive(Default)]
pub struct EventPublisher {
    handlers: RwLock<HashMap<String, Vec<Arc<dyn EventHandler>>>>,
}

impl EventPublisher {
    #[must_use]
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(HashMap::new()),
        }
    }

    /// Register a handler for an event name; appended after existing handlers
    pub async fn register(&self, event_name: &str, handler: Arc<dyn EventHandler>) {
        self.handlers
            .write()
            .await
            .entry(event_name.to_string())
            .or_default()
            .push(handler);

        tracing::debug!(event_name = %event_name, "Event handler registered");
    }

    /// Remove the first registration matching this handler
    pub async fn unregister(&self, event_name: &str, handler: &Arc<dyn EventHandler>) {
        let mut handlers = self.handlers.write().await;
        if let Some(list) = handlers.get_mut(event_name) {
            if let Some(idx) = list.iter().position(|h| Arc::ptr_eq(h, handler)) {
                list.remove(idx);
            }
            if list.is_empty() {
                handlers.remove(event_name);
            }
        }
    }

    /// Fan an event out to every handler registered for its name
    ///
    /// Every handler is attempted even when an earlier one fails; the first
    /// failure is surfaced afterwards.
    pub async fn publish(&self, event: &DomainEvent) -> anyhow::Result<()> {
        let handlers = {
            let map = self.handlers.read().await;
            map.get(event.event_type()).cloned().unwrap_or_default()
        };

        let mut first_error = None;
        for handler in &handlers {
            if let Err(e) = handler.handle(event).await {
                tracing::error!(
                    event_type = %event.event_type(),
                    error = %e,
                    "Event handler failed"
                );
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Publish a batch of events in order
    ///
    /// At-least-once within the batch: a failure for one event is surfaced,
    /// but every subsequent event is still attempted.
    pub async fn publish_all(&self, events: Vec<DomainEvent>) -> anyhow::Result<()> {
        let mut first_error = None;
        for event in &events {
            if let Err(e) = self.publish(event).await {
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Number of handlers registered for an event name
    pub async fn handler_count(&self, event_name: &str) -> usize {
        self.handlers
            .read()
            .await
            .get(event_name)
            .map_or(0, Vec::len)
    }
}
