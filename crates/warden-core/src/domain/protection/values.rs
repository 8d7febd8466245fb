//! Protected value types
//!
//! Callers hold these instead of raw strings. Every type here implements
//! [`Redactable`], and its `Debug` and `Display` output is the redacted
//! form, so it stays masked however it ends up in a log line.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use super::redaction::GENERIC_PLACEHOLDER;

/// A value that knows how to produce a display-safe form of itself
pub trait Redactable {
    /// The placeholder that is safe to log, display, or serialize
    fn redacted(&self) -> String;
}

/// Implement `Debug` and `Display` through [`Redactable::redacted`]
#[macro_export]
macro_rules! impl_redacted_fmt {
    ($ty:ty) => {
        impl ::std::fmt::Debug for $ty {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(&$crate::domain::protection::Redactable::redacted(self))
            }
        }

        impl ::std::fmt::Display for $ty {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(&$crate::domain::protection::Redactable::redacted(self))
            }
        }
    };
}

/// At-rest form of one encrypted attribute
///
/// Immutable once built. A changed value gets a whole new field.
#[derive(Clone, PartialEq, Eq)]
pub struct ProtectedField {
    encrypted: String,
    redacted: String,
    hash: Option<String>,
}

impl ProtectedField {
    pub(crate) fn new(encrypted: String, redacted: String, hash: Option<String>) -> Self {
        Self {
            encrypted,
            redacted,
            hash,
        }
    }

    /// Rehydrate a field from its persisted columns
    pub fn from_stored(encrypted: String, redacted: String, hash: Option<String>) -> Self {
        Self::new(encrypted, redacted, hash)
    }

    /// The ciphertext blob
    pub fn encrypted(&self) -> &str {
        &self.encrypted
    }

    /// The lookup hash, if this field supports exact-match search
    pub fn hash(&self) -> Option<&str> {
        self.hash.as_deref()
    }
}

impl Redactable for ProtectedField {
    fn redacted(&self) -> String {
        self.redacted.clone()
    }
}

impl_redacted_fmt!(ProtectedField);

impl Serialize for ProtectedField {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.redacted)
    }
}

/// A raw secret that lives for one request and is never persisted
///
/// Serializes as the fixed mask. Deserializes from a plain string so it can
/// sit directly in command inputs.
pub struct TransientSecret {
    inner: Zeroizing<String>,
}

impl TransientSecret {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            inner: Zeroizing::new(value.into()),
        }
    }

    /// Borrow the raw value for a one-off check such as password verification
    pub fn expose(&self) -> &str {
        &self.inner
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl Redactable for TransientSecret {
    fn redacted(&self) -> String {
        GENERIC_PLACEHOLDER.to_string()
    }
}

impl_redacted_fmt!(TransientSecret);

impl Serialize for TransientSecret {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(GENERIC_PLACEHOLDER)
    }
}

impl<'de> Deserialize<'de> for TransientSecret {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Self::new)
    }
}

/// A decrypted string that is securely zeroed when dropped
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecureString {
    inner: String,
}

impl SecureString {
    pub(crate) fn new(s: String) -> Self {
        Self { inner: s }
    }

    /// Get the string value
    pub fn as_str(&self) -> &str {
        &self.inner
    }
}

impl Redactable for SecureString {
    fn redacted(&self) -> String {
        GENERIC_PLACEHOLDER.to_string()
    }
}

impl_redacted_fmt!(SecureString);

impl AsRef<str> for SecureString {
    fn as_ref(&self) -> &str {
        &self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field() -> ProtectedField {
        ProtectedField::new(
            "Y2lwaGVydGV4dA==".to_string(),
            "j***@example.com".to_string(),
            Some("ABC123".to_string()),
        )
    }

    #[test]
    fn test_protected_field_formats_as_redacted() {
        let field = field();
        assert_eq!(format!("{}", field), "j***@example.com");
        assert_eq!(format!("{:?}", field), "j***@example.com");
        assert!(!format!("{:?}", field).contains("Y2lwaGVydGV4dA"));
    }

    #[test]
    fn test_protected_field_serializes_redacted_only() {
        let json = serde_json::to_string(&field()).unwrap();
        assert_eq!(json, "\"j***@example.com\"");
    }

    #[test]
    fn test_protected_field_accessors() {
        let field = field();
        assert_eq!(field.encrypted(), "Y2lwaGVydGV4dA==");
        assert_eq!(field.hash(), Some("ABC123"));
        assert_eq!(field.redacted(), "j***@example.com");
    }

    #[test]
    fn test_transient_secret_never_shows_value() {
        let secret = TransientSecret::new("hunter2");
        assert_eq!(format!("{}", secret), "***");
        assert_eq!(format!("{:?}", secret), "***");
        assert_eq!(serde_json::to_string(&secret).unwrap(), "\"***\"");
        assert_eq!(secret.expose(), "hunter2");
    }

    #[test]
    fn test_transient_secret_deserializes_from_string() {
        let secret: TransientSecret = serde_json::from_str("\"hunter2\"").unwrap();
        assert_eq!(secret.expose(), "hunter2");
        assert!(!secret.is_empty());
    }

    #[test]
    fn test_secure_string_debug_redacted() {
        let secure = SecureString::new("secret".to_string());
        let debug = format!("{:?}", secure);
        assert!(!debug.contains("secret"));
        assert_eq!(secure.as_str(), "secret");
    }
}
