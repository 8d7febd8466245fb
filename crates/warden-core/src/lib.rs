//! Warden Core Library
//!
//! This crate provides protected-data handling for Warden, including:
//! - Field encryption (AES-256-GCM) with a stored redacted form and lookup hash
//! - Redaction rules shared by storage and diagnostics
//! - An access gateway that is the only path from ciphertext to plaintext
//! - Break-the-glass reveal commands with justification and re-authentication
//! - An append-only audit trail (SQLite)
//! - Log scrubbing for `tracing`

pub mod config;
pub mod diagnostics;
pub mod domain;
pub mod error;
pub mod infrastructure;

pub use error::{Error, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::domain::protection::{ProtectedField, Redactable, SecureString, TransientSecret};
    pub use crate::error::{Error, Result};
}
