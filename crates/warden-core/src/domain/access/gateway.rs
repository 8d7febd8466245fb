//! Access gateway
//!
//! The only place persisted protected fields are decrypted. Every entry point
//! goes through [`AccessGateway::decrypt_subject`] (or its note counterpart),
//! which owns the cipher handle.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::cipher::FieldCipher;
use super::repository::{EncryptedSubject, NoteRepository, SubjectRepository};
use super::revealed::{RevealedField, RevealedNote, RevealedSubject};
use crate::domain::audit::{AuditAction, AuditEntry, AuditTrail};
use crate::domain::protection::SecureString;
use crate::error::{Error, Result};

/// Resource type recorded for subject access
pub const SUBJECT_RESOURCE_TYPE: &str = "user";

/// Why the system itself needs plaintext
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemAccessReason {
    TransactionalEmail,
    PasswordResetEmail,
    DataExport,
    DataMigration,
}

impl SystemAccessReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TransactionalEmail => "transactional_email",
            Self::PasswordResetEmail => "password_reset_email",
            Self::DataExport => "data_export",
            Self::DataMigration => "data_migration",
        }
    }
}

impl std::fmt::Display for SystemAccessReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Plaintext attributes handed to trusted system code
///
/// Values are zeroed on drop and print as `***`.
#[derive(Debug, Clone)]
pub struct DecryptedSubject {
    pub subject_id: Uuid,
    pub email: SecureString,
    pub display_name: SecureString,
}

/// Single authorized decryption entry point
pub struct AccessGateway {
    cipher: Arc<FieldCipher>,
    subjects: Arc<dyn SubjectRepository>,
    notes: Arc<dyn NoteRepository>,
    audit: AuditTrail,
}

impl AccessGateway {
    pub fn new(
        cipher: Arc<FieldCipher>,
        subjects: Arc<dyn SubjectRepository>,
        notes: Arc<dyn NoteRepository>,
        audit: AuditTrail,
    ) -> Self {
        Self {
            cipher,
            subjects,
            notes,
            audit,
        }
    }

    /// Decrypt a subject for automated system use
    ///
    /// Always records a `protected_data_accessed` entry with no actor before
    /// the plaintext is returned. A missing subject records nothing.
    pub async fn access_for_system(
        &self,
        subject_id: Uuid,
        reason: SystemAccessReason,
        details: Option<&str>,
    ) -> Result<DecryptedSubject> {
        let (_, decrypted) = self.decrypt_subject(subject_id).await?;

        let details = serde_json::json!({
            "reason": reason,
            "details": details,
        });
        let entry = AuditEntry::new(
            None,
            AuditAction::ProtectedDataAccessed,
            SUBJECT_RESOURCE_TYPE,
            Some(subject_id.to_string()),
        )
        .with_details(details.to_string());
        self.audit.record(entry).await?;

        tracing::info!(subject_id = %subject_id, reason = %reason, "System accessed protected data");
        Ok(decrypted)
    }

    /// Reveal another user's attributes to an administrator
    ///
    /// Writes no audit entry; the calling command records it with the
    /// operator's justification.
    pub async fn reveal_for_admin(&self, subject_id: Uuid) -> Result<RevealedSubject> {
        self.reveal_subject(subject_id).await
    }

    /// Reveal a user's own attributes to them
    ///
    /// Writes no audit entry; the calling command records it.
    pub async fn reveal_for_owner(&self, subject_id: Uuid) -> Result<RevealedSubject> {
        self.reveal_subject(subject_id).await
    }

    /// Reveal the sensitive note on a resource to an administrator
    ///
    /// Writes no audit entry; the calling command records it.
    pub async fn reveal_note_for_admin(&self, resource_id: &str) -> Result<RevealedNote> {
        let note = self
            .notes
            .find_by_resource(resource_id)
            .await?
            .ok_or_else(|| Error::ResourceNotFound(resource_id.to_string()))?;

        // Integrity is checked here so a tampered note fails before any audit write
        drop(self.cipher.decrypt(note.note.encrypted())?);

        Ok(RevealedNote {
            note: RevealedField::new(self.cipher.clone(), note.note.encrypted().to_string()),
            resource_id: note.resource_id,
            resource_type: note.resource_type,
        })
    }

    async fn reveal_subject(&self, subject_id: Uuid) -> Result<RevealedSubject> {
        let (encrypted, decrypted) = self.decrypt_subject(subject_id).await?;
        drop(decrypted);

        tracing::debug!(subject_id = %subject_id, "Prepared protected data for reveal");
        Ok(RevealedSubject {
            subject_id,
            email: RevealedField::new(self.cipher.clone(), encrypted.email),
            display_name: RevealedField::new(self.cipher.clone(), encrypted.display_name),
        })
    }

    /// Load the current persisted blobs for a subject and decrypt them
    async fn decrypt_subject(
        &self,
        subject_id: Uuid,
    ) -> Result<(EncryptedSubject, DecryptedSubject)> {
        let encrypted = self
            .subjects
            .find_encrypted_attributes(subject_id)
            .await?
            .ok_or_else(|| Error::SubjectNotFound(subject_id.to_string()))?;

        let email = self.cipher.decrypt(&encrypted.email).inspect_err(|_| {
            tracing::error!(subject_id = %subject_id, "Integrity check failed on email");
        })?;
        let display_name = self.cipher.decrypt(&encrypted.display_name).inspect_err(|_| {
            tracing::error!(subject_id = %subject_id, "Integrity check failed on display name");
        })?;

        let decrypted = DecryptedSubject {
            subject_id,
            email: SecureString::new(email.to_string()),
            display_name: SecureString::new(display_name.to_string()),
        };
        Ok((encrypted, decrypted))
    }
}

impl std::fmt::Debug for AccessGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessGateway")
            .field("audit", &self.audit)
            .finish_non_exhaustive()
    }
}
