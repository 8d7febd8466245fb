//! Audit entries for non-crypto domain events

use async_trait::async_trait;

use super::entity::{AuditAction, AuditEntry};
use super::trail::AuditTrail;
use crate::domain::events::{DomainEvent, EventSubscriber};
use crate::error::{Error, Result};

/// Event types that map one-to-one onto audit actions
const AUDITED_EVENTS: &[&str] = &[
    "user_registered",
    "user_logged_in",
    "login_failed",
    "email_changed",
    "role_changed",
    "resource_created",
    "resource_completed",
    "resource_deleted",
];

/// Appends one audit entry per subscribed domain event
#[derive(Debug, Clone)]
pub struct AuditEventHandler {
    trail: AuditTrail,
    resource_type: String,
}

impl AuditEventHandler {
    /// Create a handler that labels entries with `resource_type`
    pub fn new(trail: AuditTrail, resource_type: impl Into<String>) -> Self {
        Self {
            trail,
            resource_type: resource_type.into(),
        }
    }
}

#[async_trait]
impl EventSubscriber for AuditEventHandler {
    async fn handle(&self, event: &dyn DomainEvent) -> Result<()> {
        let action = AuditAction::parse(event.event_type()).ok_or_else(|| {
            Error::Other(format!("no audit action for event '{}'", event.event_type()))
        })?;

        let mut entry = AuditEntry::new(
            event.actor_id(),
            action,
            self.resource_type.clone(),
            Some(event.aggregate_id().to_string()),
        );
        entry.created_at = event.timestamp();
        if let Some(data) = event.data() {
            entry = entry.with_details(data.to_string());
        }
        if let Some(origin) = event.origin() {
            entry = entry.with_origin(origin);
        }

        self.trail.record(entry).await
    }

    fn subscribed_events(&self) -> &[&str] {
        AUDITED_EVENTS
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::audit::{AuditQuery, RequestOrigin};
    use crate::domain::events::{EventBus, EventPublisher};
    use crate::infrastructure::InMemoryAuditRepository;
    use chrono::{DateTime, Utc};
    use std::sync::Arc;
    use uuid::Uuid;

    struct LoginEvent {
        user_id: Uuid,
        event_type: &'static str,
        data: Option<serde_json::Value>,
        origin: RequestOrigin,
        at: DateTime<Utc>,
    }

    impl DomainEvent for LoginEvent {
        fn event_type(&self) -> &str {
            self.event_type
        }

        fn aggregate_id(&self) -> Uuid {
            self.user_id
        }

        fn actor_id(&self) -> Option<Uuid> {
            Some(self.user_id)
        }

        fn timestamp(&self) -> DateTime<Utc> {
            self.at
        }

        fn data(&self) -> Option<&serde_json::Value> {
            self.data.as_ref()
        }

        fn origin(&self) -> Option<&RequestOrigin> {
            Some(&self.origin)
        }
    }

    #[tokio::test]
    async fn test_event_becomes_audit_entry() {
        let trail = AuditTrail::new(Arc::new(InMemoryAuditRepository::new()));
        let bus = EventBus::new().subscribe(Arc::new(AuditEventHandler::new(trail.clone(), "user")));

        let user_id = Uuid::new_v4();
        let event = LoginEvent {
            user_id,
            event_type: "user_logged_in",
            data: Some(serde_json::json!({"method": "password"})),
            origin: RequestOrigin::new("192.0.2.1", "test-agent"),
            at: Utc::now(),
        };
        bus.publish(&event).await.unwrap();

        let page = trail.search(AuditQuery::default()).await.unwrap();
        assert_eq!(page.total_count, 1);
        let entry = &page.items[0];
        assert_eq!(entry.action, AuditAction::UserLoggedIn);
        assert_eq!(entry.actor_id, Some(user_id));
        assert_eq!(entry.resource_type, "user");
        assert_eq!(entry.resource_id, Some(user_id.to_string()));
        assert_eq!(entry.ip_address.as_deref(), Some("192.0.2.1"));
        assert_eq!(entry.created_at, event.at);
        assert!(entry.details.as_deref().unwrap().contains("password"));
    }

    #[test]
    fn test_every_subscribed_event_has_an_action() {
        for event_type in AUDITED_EVENTS {
            assert!(AuditAction::parse(event_type).is_some(), "{}", event_type);
        }
    }
}
