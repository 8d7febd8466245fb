//! Validate-and-encrypt write path
//!
//! Raw input becomes a [`ProtectedField`] here and nowhere else. The
//! redacted form is derived from the plaintext before it is encrypted.

use std::sync::Arc;

use crate::domain::access::FieldCipher;
use crate::error::{Error, Result};

use super::hasher::hash_for_lookup;
use super::redaction::FieldKind;
use super::values::ProtectedField;

/// Maximum accepted email length
pub const MAX_EMAIL_LEN: usize = 254;

/// Maximum accepted display-name length in characters
pub const MAX_DISPLAY_NAME_LEN: usize = 100;

/// Maximum accepted note length in characters
pub const MAX_NOTE_LEN: usize = 10_000;

/// Turns validated raw input into protected fields
#[derive(Debug, Clone)]
pub struct FieldProtector {
    cipher: Arc<FieldCipher>,
}

impl FieldProtector {
    pub fn new(cipher: Arc<FieldCipher>) -> Self {
        Self { cipher }
    }

    /// Encrypt a raw value under the given redaction rule
    ///
    /// When `lookup` is set the field also carries a lookup hash.
    pub fn protect(&self, kind: FieldKind, raw: &str, lookup: bool) -> Result<ProtectedField> {
        let redacted = kind.redact(raw);
        let hash = lookup.then(|| hash_for_lookup(raw));
        let encrypted = self.cipher.encrypt(raw)?;
        Ok(ProtectedField::new(encrypted, redacted, hash))
    }

    /// Validate and protect an email address, with a lookup hash
    pub fn protect_email(&self, raw: &str) -> Result<ProtectedField> {
        let email = raw.trim();
        validate_email(email)?;
        self.protect(FieldKind::Email, email, true)
    }

    /// Validate and protect a display name
    pub fn protect_display_name(&self, raw: &str) -> Result<ProtectedField> {
        let name = raw.trim();
        let len = name.chars().count();
        if len == 0 {
            return Err(Error::Validation("display name must not be empty".to_string()));
        }
        if len > MAX_DISPLAY_NAME_LEN {
            return Err(Error::Validation(format!(
                "display name must be at most {} characters",
                MAX_DISPLAY_NAME_LEN
            )));
        }
        self.protect(FieldKind::Generic, name, false)
    }

    /// Validate and protect a free-text sensitive note
    pub fn protect_note(&self, raw: &str) -> Result<ProtectedField> {
        if raw.trim().is_empty() {
            return Err(Error::Validation("note must not be empty".to_string()));
        }
        if raw.chars().count() > MAX_NOTE_LEN {
            return Err(Error::Validation(format!(
                "note must be at most {} characters",
                MAX_NOTE_LEN
            )));
        }
        self.protect(FieldKind::Note, raw, false)
    }
}

/// Basic structural email check
pub fn validate_email(email: &str) -> Result<()> {
    let invalid = |reason: &str| Err(Error::Validation(format!("invalid email address: {}", reason)));

    if email.is_empty() {
        return invalid("empty");
    }
    if email.len() > MAX_EMAIL_LEN {
        return invalid("too long");
    }
    if email.chars().any(char::is_whitespace) {
        return invalid("contains whitespace");
    }

    let Some((local, domain)) = email.split_once('@') else {
        return invalid("missing '@'");
    };
    if local.is_empty() {
        return invalid("empty local part");
    }
    if domain.contains('@') {
        return invalid("more than one '@'");
    }
    if !domain.contains('.') || domain.starts_with('.') || domain.ends_with('.') {
        return invalid("malformed domain");
    }

    Ok(())
}
