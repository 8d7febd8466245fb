//! Output-only revealed values
//!
//! A [`RevealedField`] holds ciphertext and decrypts only while it is being
//! serialized into a response. It has no plaintext getter, no `Clone`, and
//! no constructor outside this module tree, and it serializes at most once.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::ser::Error as _;
use serde::{Serialize, Serializer};
use uuid::Uuid;

use super::cipher::FieldCipher;
use crate::domain::protection::{GENERIC_PLACEHOLDER, Redactable};

/// Ciphertext whose plaintext appears only in one outbound response
pub struct RevealedField {
    cipher: Arc<FieldCipher>,
    ciphertext: String,
    emitted: AtomicBool,
}

impl RevealedField {
    pub(super) fn new(cipher: Arc<FieldCipher>, ciphertext: String) -> Self {
        Self {
            cipher,
            ciphertext,
            emitted: AtomicBool::new(false),
        }
    }

    /// Whether the plaintext has already been written out
    pub fn is_emitted(&self) -> bool {
        self.emitted.load(Ordering::Acquire)
    }
}

impl Serialize for RevealedField {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.emitted.swap(true, Ordering::AcqRel) {
            return Err(S::Error::custom("revealed field has already been emitted"));
        }

        let plaintext = self
            .cipher
            .decrypt(&self.ciphertext)
            .map_err(|_| S::Error::custom("revealed field could not be decrypted"))?;
        serializer.serialize_str(&plaintext)
    }
}

impl Redactable for RevealedField {
    fn redacted(&self) -> String {
        GENERIC_PLACEHOLDER.to_string()
    }
}

crate::impl_redacted_fmt!(RevealedField);

/// A subject's protected attributes, revealed for one response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RevealedSubject {
    pub subject_id: Uuid,
    pub email: RevealedField,
    pub display_name: RevealedField,
}

/// A resource note, revealed for one response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RevealedNote {
    pub resource_id: String,
    pub resource_type: String,
    pub note: RevealedField,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::access::EncryptionKey;

    fn revealed(value: &str) -> RevealedField {
        let cipher = Arc::new(FieldCipher::new(&EncryptionKey::generate()));
        let ciphertext = cipher.encrypt(value).unwrap();
        RevealedField::new(cipher, ciphertext)
    }

    #[test]
    fn test_serializes_plaintext_once() {
        let field = revealed("john@example.com");
        assert!(!field.is_emitted());

        let json = serde_json::to_string(&field).unwrap();
        assert_eq!(json, "\"john@example.com\"");
        assert!(field.is_emitted());

        assert!(serde_json::to_string(&field).is_err());
    }

    #[test]
    fn test_debug_and_display_never_decrypt() {
        let field = revealed("john@example.com");
        assert_eq!(format!("{:?}", field), "***");
        assert_eq!(format!("{}", field), "***");
        assert!(!field.is_emitted());
    }

    #[test]
    fn test_tampered_ciphertext_fails_serialization_without_detail() {
        let cipher = Arc::new(FieldCipher::new(&EncryptionKey::generate()));
        let other = FieldCipher::new(&EncryptionKey::generate());
        let field = RevealedField::new(cipher, other.encrypt("secret").unwrap());

        let err = serde_json::to_string(&field).unwrap_err();
        assert!(err.to_string().contains("could not be decrypted"));
    }

    #[test]
    fn test_revealed_subject_shape() {
        let subject = RevealedSubject {
            subject_id: Uuid::nil(),
            email: revealed("john@example.com"),
            display_name: revealed("John Doe"),
        };
        let json = serde_json::to_value(&subject).unwrap();
        assert_eq!(json["email"], "john@example.com");
        assert_eq!(json["displayName"], "John Doe");
        assert_eq!(json["subjectId"], Uuid::nil().to_string());
    }
}
