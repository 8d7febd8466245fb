//! Domain events
//!
//! Aggregates publish events describing what happened; subscribers such as
//! the audit handler react to them. Events carry no protected plaintext.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::audit::RequestOrigin;
use crate::error::Result;

/// Something that happened to an aggregate
pub trait DomainEvent: Send + Sync {
    /// Snake-case name, matching an audit action where one exists
    fn event_type(&self) -> &str;

    fn aggregate_id(&self) -> Uuid;

    /// Who caused the event; `None` for the system or an anonymous caller
    fn actor_id(&self) -> Option<Uuid>;

    fn timestamp(&self) -> DateTime<Utc>;

    /// Redacted payload
    fn data(&self) -> Option<&serde_json::Value>;

    /// Request origin, when the event came from an external request
    fn origin(&self) -> Option<&RequestOrigin> {
        None
    }
}

#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Deliver to every interested subscriber, stopping at the first error
    async fn publish(&self, event: &dyn DomainEvent) -> Result<()>;
}

#[async_trait]
pub trait EventSubscriber: Send + Sync {
    /// Handle a domain event
    async fn handle(&self, event: &dyn DomainEvent) -> Result<()>;

    /// Event names this subscriber wants
    fn subscribed_events(&self) -> &[&str];
}

/// In-process fan-out to registered subscribers
#[derive(Default, Clone)]
pub struct EventBus {
    subscribers: Vec<Arc<dyn EventSubscriber>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber
    pub fn subscribe(mut self, subscriber: Arc<dyn EventSubscriber>) -> Self {
        self.subscribers.push(subscriber);
        self
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

#[async_trait]
impl EventPublisher for EventBus {
    async fn publish(&self, event: &dyn DomainEvent) -> Result<()> {
        for subscriber in &self.subscribers {
            if subscriber
                .subscribed_events()
                .iter()
                .any(|t| *t == event.event_type())
            {
                subscriber.handle(event).await?;
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}
