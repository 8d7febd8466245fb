//! Collaborator interfaces consumed by the access gateway

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::protection::ProtectedField;
use crate::error::Result;

/// Ciphertext blobs of a subject's protected attributes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedSubject {
    pub subject_id: Uuid,
    pub email: String,
    pub display_name: String,
}

/// A sensitive note attached to a resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredNote {
    pub resource_id: String,
    pub resource_type: String,
    pub note: ProtectedField,
}

/// Read access to persisted subject records
#[async_trait]
pub trait SubjectRepository: Send + Sync {
    /// Fetch the encrypted attributes of a subject, `None` if it does not exist
    async fn find_encrypted_attributes(&self, subject_id: Uuid) -> Result<Option<EncryptedSubject>>;
}

/// Storage for sensitive resource notes
#[async_trait]
pub trait NoteRepository: Send + Sync {
    /// Insert or replace the note on a resource
    async fn save(&self, note: &StoredNote) -> Result<()>;

    /// Fetch the note on a resource, `None` if there is none
    async fn find_by_resource(&self, resource_id: &str) -> Result<Option<StoredNote>>;
}
