//! Audit trail entities

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Closed set of auditable actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    UserRegistered,
    UserLoggedIn,
    LoginFailed,
    EmailChanged,
    RoleChanged,
    /// Automated, reason-coded decryption by the system
    ProtectedDataAccessed,
    /// Break-the-glass reveal of another user's data
    ProtectedDataRevealed,
    /// Self-service reveal of the caller's own data
    OwnDataRevealed,
    /// Break-the-glass reveal of a sensitive note on a resource
    SensitiveNoteRevealed,
    ResourceCreated,
    ResourceCompleted,
    ResourceDeleted,
}

impl AuditAction {
    pub const ALL: &[Self] = &[
        Self::UserRegistered,
        Self::UserLoggedIn,
        Self::LoginFailed,
        Self::EmailChanged,
        Self::RoleChanged,
        Self::ProtectedDataAccessed,
        Self::ProtectedDataRevealed,
        Self::OwnDataRevealed,
        Self::SensitiveNoteRevealed,
        Self::ResourceCreated,
        Self::ResourceCompleted,
        Self::ResourceDeleted,
    ];

    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UserRegistered => "user_registered",
            Self::UserLoggedIn => "user_logged_in",
            Self::LoginFailed => "login_failed",
            Self::EmailChanged => "email_changed",
            Self::RoleChanged => "role_changed",
            Self::ProtectedDataAccessed => "protected_data_accessed",
            Self::ProtectedDataRevealed => "protected_data_revealed",
            Self::OwnDataRevealed => "own_data_revealed",
            Self::SensitiveNoteRevealed => "sensitive_note_revealed",
            Self::ResourceCreated => "resource_created",
            Self::ResourceCompleted => "resource_completed",
            Self::ResourceDeleted => "resource_deleted",
        }
    }

    /// Parse from the string representation
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|action| action.as_str() == s)
    }
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Where a request came from
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestOrigin {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl RequestOrigin {
    pub fn new(ip_address: impl Into<String>, user_agent: impl Into<String>) -> Self {
        Self {
            ip_address: Some(ip_address.into()),
            user_agent: Some(user_agent.into()),
        }
    }
}

/// One immutable audit record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    pub id: Uuid,
    /// `None` means the system acted, not a person
    pub actor_id: Option<Uuid>,
    pub action: AuditAction,
    pub resource_type: String,
    pub resource_id: Option<String>,
    pub details: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl AuditEntry {
    /// Create a new entry stamped with the current time
    pub fn new(
        actor_id: Option<Uuid>,
        action: AuditAction,
        resource_type: impl Into<String>,
        resource_id: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            actor_id,
            action,
            resource_type: resource_type.into(),
            resource_id,
            details: None,
            ip_address: None,
            user_agent: None,
            created_at: Utc::now(),
        }
    }

    /// Attach serialized details
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Attach request origin
    pub fn with_origin(mut self, origin: &RequestOrigin) -> Self {
        self.ip_address = origin.ip_address.clone();
        self.user_agent = origin.user_agent.clone();
        self
    }

    /// Whether the system, rather than a person, performed the action
    pub fn is_system(&self) -> bool {
        self.actor_id.is_none()
    }
}

/// Default page size for audit searches
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Filters for an audit search; all supplied filters are ANDed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditQuery {
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
    pub action: Option<AuditAction>,
    pub actor_id: Option<Uuid>,
    pub resource_type: Option<String>,
    /// 1-based page number
    pub page: u32,
    pub page_size: u32,
}

impl Default for AuditQuery {
    fn default() -> Self {
        Self {
            date_from: None,
            date_to: None,
            action: None,
            actor_id: None,
            resource_type: None,
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl AuditQuery {
    /// Whether an entry satisfies every supplied filter
    pub fn matches(&self, entry: &AuditEntry) -> bool {
        self.date_from.is_none_or(|from| entry.created_at >= from)
            && self.date_to.is_none_or(|to| entry.created_at <= to)
            && self.action.is_none_or(|action| entry.action == action)
            && self.actor_id.is_none_or(|actor| entry.actor_id == Some(actor))
            && self
                .resource_type
                .as_deref()
                .is_none_or(|rt| entry.resource_type == rt)
    }

    /// Number of rows to skip for the requested page
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.page_size)
    }
}

/// Page envelope returned by searches
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total_count: u64,
    pub page: u32,
    pub page_size: u32,
}

impl<T> Page<T> {
    pub fn empty(page: u32, page_size: u32) -> Self {
        Self {
            items: Vec::new(),
            total_count: 0,
            page,
            page_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_action_string_roundtrip() {
        for action in AuditAction::ALL {
            assert_eq!(AuditAction::parse(action.as_str()), Some(*action));
        }
        assert_eq!(AuditAction::parse("unknown"), None);
    }

    #[test]
    fn test_action_serializes_snake_case() {
        let json = serde_json::to_string(&AuditAction::ProtectedDataRevealed).unwrap();
        assert_eq!(json, "\"protected_data_revealed\"");
    }

    #[test]
    fn test_entry_builder() {
        let actor = Uuid::new_v4();
        let entry = AuditEntry::new(
            Some(actor),
            AuditAction::ProtectedDataRevealed,
            "user",
            Some("42".to_string()),
        )
        .with_details("{}")
        .with_origin(&RequestOrigin::new("10.0.0.1", "curl/8"));

        assert_eq!(entry.actor_id, Some(actor));
        assert!(!entry.is_system());
        assert_eq!(entry.ip_address.as_deref(), Some("10.0.0.1"));
        assert_eq!(entry.user_agent.as_deref(), Some("curl/8"));
        assert_eq!(entry.details.as_deref(), Some("{}"));
    }

    #[test]
    fn test_entry_serializes_camel_case() {
        let entry = AuditEntry::new(None, AuditAction::ProtectedDataAccessed, "user", None);
        let json = serde_json::to_value(&entry).unwrap();
        assert!(json.get("actorId").is_some());
        assert!(json.get("resourceType").is_some());
        assert!(json.get("createdAt").is_some());
    }

    #[test]
    fn test_query_matches_all_filters() {
        let actor = Uuid::new_v4();
        let entry = AuditEntry::new(Some(actor), AuditAction::UserLoggedIn, "user", None);

        let query = AuditQuery {
            date_from: Some(entry.created_at - Duration::minutes(1)),
            date_to: Some(entry.created_at + Duration::minutes(1)),
            action: Some(AuditAction::UserLoggedIn),
            actor_id: Some(actor),
            resource_type: Some("user".to_string()),
            ..Default::default()
        };
        assert!(query.matches(&entry));

        let wrong_action = AuditQuery {
            action: Some(AuditAction::LoginFailed),
            ..query.clone()
        };
        assert!(!wrong_action.matches(&entry));

        let too_late = AuditQuery {
            date_from: Some(entry.created_at + Duration::seconds(1)),
            ..query
        };
        assert!(!too_late.matches(&entry));
    }

    #[test]
    fn test_query_offset() {
        let query = AuditQuery {
            page: 3,
            page_size: 10,
            ..Default::default()
        };
        assert_eq!(query.offset(), 20);

        let zero = AuditQuery {
            page: 0,
            ..Default::default()
        };
        assert_eq!(zero.offset(), 0);
    }

    #[test]
    fn test_page_serializes_envelope() {
        let page: Page<u8> = Page::empty(1, 20);
        let json = serde_json::to_value(&page).unwrap();
        assert_eq!(json["totalCount"], 0);
        assert_eq!(json["pageSize"], 20);
        assert!(json["items"].as_array().unwrap().is_empty());
    }
}
