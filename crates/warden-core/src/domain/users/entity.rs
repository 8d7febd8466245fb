//! User aggregate

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::domain::access::EncryptedSubject;
use crate::domain::protection::{ProtectedField, Redactable};

/// A registered user whose identifying attributes are stored encrypted
///
/// Serializes with redacted email and display name and without the
/// password hash.
#[derive(Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub email: ProtectedField,
    pub display_name: ProtectedField,
    #[serde(skip)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(email: ProtectedField, display_name: ProtectedField, password_hash: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            email,
            display_name,
            password_hash,
            created_at: now,
            updated_at: now,
        }
    }

    /// Replace the email wholesale
    pub fn change_email(&mut self, email: ProtectedField) {
        self.email = email;
        self.updated_at = Utc::now();
    }

    /// The ciphertext view consumed by the access gateway
    pub(crate) fn encrypted_attributes(&self) -> EncryptedSubject {
        EncryptedSubject {
            subject_id: self.id,
            email: self.email.encrypted().to_string(),
            display_name: self.display_name.encrypted().to_string(),
        }
    }
}

impl std::fmt::Debug for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("email", &self.email.redacted())
            .field("display_name", &self.display_name.redacted())
            .field("created_at", &self.created_at)
            .finish_non_exhaustive()
    }
}
