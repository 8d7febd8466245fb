//! Credential verification collaborator

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::protection::TransientSecret;
use crate::error::Result;

/// Checks a freshly supplied password against stored credentials
#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    /// `Ok(false)` for a wrong password or an unknown subject
    async fn verify_password(&self, subject_id: Uuid, candidate: &TransientSecret) -> Result<bool>;
}
