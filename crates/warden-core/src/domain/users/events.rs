//! User domain events

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::audit::RequestOrigin;
use crate::domain::events::DomainEvent;

/// What happened to a user account
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserEventType {
    Registered,
    LoggedIn,
    LoginFailed,
    EmailChanged,
}

impl UserEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Registered => "user_registered",
            Self::LoggedIn => "user_logged_in",
            Self::LoginFailed => "login_failed",
            Self::EmailChanged => "email_changed",
        }
    }
}

/// A user event; `data` carries redacted values only
#[derive(Debug, Clone)]
pub struct UserEvent {
    pub event_type: UserEventType,
    pub user_id: Uuid,
    pub actor_id: Option<Uuid>,
    pub timestamp: DateTime<Utc>,
    pub data: Option<serde_json::Value>,
    pub origin: Option<RequestOrigin>,
}

impl UserEvent {
    pub fn new(event_type: UserEventType, user_id: Uuid) -> Self {
        Self {
            event_type,
            user_id,
            actor_id: None,
            timestamp: Utc::now(),
            data: None,
            origin: None,
        }
    }

    pub fn with_actor(mut self, actor_id: Uuid) -> Self {
        self.actor_id = Some(actor_id);
        self
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_origin(mut self, origin: &RequestOrigin) -> Self {
        self.origin = Some(origin.clone());
        self
    }
}

impl DomainEvent for UserEvent {
    fn event_type(&self) -> &str {
        self.event_type.as_str()
    }

    fn aggregate_id(&self) -> Uuid {
        self.user_id
    }

    fn actor_id(&self) -> Option<Uuid> {
        self.actor_id
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    fn data(&self) -> Option<&serde_json::Value> {
        self.data.as_ref()
    }

    fn origin(&self) -> Option<&RequestOrigin> {
        self.origin.as_ref()
    }
}
