//! User service
//!
//! The write path for protected user attributes. Raw input is validated and
//! encrypted by the [`FieldProtector`]; lookups go through the email hash and
//! never decrypt.

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use super::entity::User;
use super::events::{UserEvent, UserEventType};
use super::repository::{CredentialHasher, UserRepository};
use crate::domain::audit::RequestOrigin;
use crate::domain::events::EventPublisher;
use crate::domain::protection::{FieldProtector, Redactable, TransientSecret, hash_for_lookup};
use crate::domain::reveal::CredentialVerifier;
use crate::error::{Error, Result};

/// Minimum accepted password length in characters
pub const MIN_PASSWORD_LEN: usize = 8;

/// Registration, lookup, email change and login
pub struct UserService {
    users: Arc<dyn UserRepository>,
    protector: FieldProtector,
    hasher: Arc<dyn CredentialHasher>,
    events: Arc<dyn EventPublisher>,
}

impl UserService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        protector: FieldProtector,
        hasher: Arc<dyn CredentialHasher>,
        events: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            users,
            protector,
            hasher,
            events,
        }
    }

    /// Register a new user
    pub async fn register(
        &self,
        email: &str,
        display_name: &str,
        password: &TransientSecret,
        origin: &RequestOrigin,
    ) -> Result<User> {
        let email = self.protector.protect_email(email)?;
        let display_name = self.protector.protect_display_name(display_name)?;
        validate_password(password)?;

        if let Some(hash) = email.hash() {
            if self.users.find_by_email_hash(hash).await?.is_some() {
                return Err(Error::DuplicateEmail);
            }
        }

        let user = User::new(email, display_name, self.hasher.hash(password)?);
        self.users.insert(&user).await?;

        tracing::info!(user_id = %user.id, email = %user.email, "Registered user");
        let event = UserEvent::new(UserEventType::Registered, user.id)
            .with_actor(user.id)
            .with_data(serde_json::json!({ "email": user.email.redacted() }))
            .with_origin(origin);
        self.events.publish(&event).await?;

        Ok(user)
    }

    /// Find a user by raw email via the lookup hash
    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        self.users.find_by_email_hash(&hash_for_lookup(email)).await
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        self.users.find_by_id(id).await
    }

    /// Replace a user's email with a freshly protected value
    pub async fn change_email(
        &self,
        user_id: Uuid,
        new_email: &str,
        origin: &RequestOrigin,
    ) -> Result<User> {
        let mut user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| Error::SubjectNotFound(user_id.to_string()))?;

        let email = self.protector.protect_email(new_email)?;
        if let Some(hash) = email.hash() {
            if let Some(existing) = self.users.find_by_email_hash(hash).await? {
                if existing.id != user_id {
                    return Err(Error::DuplicateEmail);
                }
            }
        }

        let previous = user.email.redacted();
        user.change_email(email);
        self.users.update(&user).await?;

        tracing::info!(user_id = %user.id, "Changed user email");
        let event = UserEvent::new(UserEventType::EmailChanged, user.id)
            .with_actor(user.id)
            .with_data(serde_json::json!({
                "from": previous,
                "to": user.email.redacted(),
            }))
            .with_origin(origin);
        self.events.publish(&event).await?;

        Ok(user)
    }

    /// Verify email and password
    ///
    /// Publishes `user_logged_in` or, for a known user with a wrong password,
    /// `login_failed`. Unknown emails and wrong passwords return the same
    /// error.
    pub async fn authenticate(
        &self,
        email: &str,
        password: &TransientSecret,
        origin: &RequestOrigin,
    ) -> Result<User> {
        let Some(user) = self.find_by_email(email).await? else {
            tracing::warn!("Login attempt for unknown email");
            return Err(Error::InvalidCredentials);
        };

        if !self.hasher.verify(&user.password_hash, password)? {
            tracing::warn!(user_id = %user.id, "Login failed");
            let event = UserEvent::new(UserEventType::LoginFailed, user.id).with_origin(origin);
            self.events.publish(&event).await?;
            return Err(Error::InvalidCredentials);
        }

        let event = UserEvent::new(UserEventType::LoggedIn, user.id)
            .with_actor(user.id)
            .with_origin(origin);
        self.events.publish(&event).await?;
        Ok(user)
    }
}

impl std::fmt::Debug for UserService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserService")
            .field("protector", &self.protector)
            .finish_non_exhaustive()
    }
}

fn validate_password(password: &TransientSecret) -> Result<()> {
    if password.expose().chars().count() < MIN_PASSWORD_LEN {
        return Err(Error::Validation(format!(
            "password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

/// Re-authentication against stored user password hashes
pub struct UserCredentialVerifier {
    users: Arc<dyn UserRepository>,
    hasher: Arc<dyn CredentialHasher>,
}

impl UserCredentialVerifier {
    pub fn new(users: Arc<dyn UserRepository>, hasher: Arc<dyn CredentialHasher>) -> Self {
        Self { users, hasher }
    }
}

#[async_trait]
impl CredentialVerifier for UserCredentialVerifier {
    async fn verify_password(&self, subject_id: Uuid, candidate: &TransientSecret) -> Result<bool> {
        match self.users.find_by_id(subject_id).await? {
            Some(user) => self.hasher.verify(&user.password_hash, candidate),
            None => Ok(false),
        }
    }
}
