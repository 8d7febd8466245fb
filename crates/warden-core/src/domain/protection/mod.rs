//! Protected data model
//!
//! - **Redaction**: pure rules shared by storage and log scrubbing
//! - **Hasher**: normalized lookup hash for encrypted-field search
//! - **Values**: `ProtectedField`, `TransientSecret`, `SecureString`, `Redactable`
//! - **Protector**: validate + encrypt raw input into a `ProtectedField`
//!
//! Nothing in this module can decrypt. Decryption lives in
//! [`crate::domain::access`].

pub mod hasher;
pub mod protector;
pub mod redaction;
pub mod values;

pub use hasher::{LOOKUP_HASH_LEN, hash_for_lookup};
pub use protector::{FieldProtector, validate_email};
pub use redaction::{
    EMAIL_PLACEHOLDER, FieldKind, GENERIC_PLACEHOLDER, NOTE_PLACEHOLDER, redact_email,
    redact_generic, redact_note,
};
pub use values::{ProtectedField, Redactable, SecureString, TransientSecret};
