//! User persistence and password hashing interfaces

use async_trait::async_trait;
use uuid::Uuid;

use super::entity::User;
use crate::domain::protection::TransientSecret;
use crate::error::Result;

/// Storage for user aggregates
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a new user; a taken email hash is `Error::DuplicateEmail`
    async fn insert(&self, user: &User) -> Result<()>;

    /// Replace an existing user's fields
    async fn update(&self, user: &User) -> Result<()>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>>;

    /// Exact-match lookup on the email hash column
    async fn find_by_email_hash(&self, hash: &str) -> Result<Option<User>>;
}

/// One-way password hashing
pub trait CredentialHasher: Send + Sync {
    /// Hash a password into a self-describing string
    fn hash(&self, password: &TransientSecret) -> Result<String>;

    /// Check a candidate password against a stored hash
    fn verify(&self, stored_hash: &str, candidate: &TransientSecret) -> Result<bool>;
}
