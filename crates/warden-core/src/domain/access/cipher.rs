//! Field-level authenticated encryption
//!
//! AES-256-GCM over single string values. Each blob is
//! `base64(nonce || tag || ciphertext)` with a fresh 96-bit nonce per call.
//!
//! `encrypt` is public. `decrypt` is visible to the `access` module only,
//! which is how the gateway stays the single decryption path.

use aes_gcm::{
    Aes256Gcm, Nonce, Tag,
    aead::{AeadCore, AeadInPlace, KeyInit, OsRng},
};
use base64::{Engine, engine::general_purpose::STANDARD};
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// Size of AES-256 key in bytes
pub const KEY_SIZE: usize = 32;

/// Size of AES-GCM nonce in bytes
pub const NONCE_SIZE: usize = 12;

/// Size of AES-GCM authentication tag in bytes
pub const TAG_SIZE: usize = 16;

/// Errors raised by the field cipher
#[derive(Debug, Error)]
pub enum CipherError {
    #[error("Invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    #[error("Invalid key encoding: {0}")]
    InvalidKeyEncoding(String),

    #[error("Malformed ciphertext: {0}")]
    MalformedCiphertext(String),

    #[error("Authentication tag mismatch")]
    AuthenticationFailed,

    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),
}

/// A 256-bit field encryption key, zeroed on drop
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct EncryptionKey {
    bytes: [u8; KEY_SIZE],
}

impl EncryptionKey {
    /// Generate a new random key
    pub fn generate() -> Self {
        let generated = Aes256Gcm::generate_key(OsRng);
        let mut bytes = [0u8; KEY_SIZE];
        bytes.copy_from_slice(&generated);
        Self { bytes }
    }

    /// Create a key from raw bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CipherError> {
        if bytes.len() != KEY_SIZE {
            return Err(CipherError::InvalidKeyLength {
                expected: KEY_SIZE,
                actual: bytes.len(),
            });
        }
        let mut key_bytes = [0u8; KEY_SIZE];
        key_bytes.copy_from_slice(bytes);
        Ok(Self { bytes: key_bytes })
    }

    /// Create a key from a base64-encoded string
    pub fn from_base64(encoded: &str) -> Result<Self, CipherError> {
        let bytes = Zeroizing::new(
            STANDARD
                .decode(encoded.trim())
                .map_err(|e| CipherError::InvalidKeyEncoding(e.to_string()))?,
        );
        Self::from_bytes(&bytes)
    }

    /// Export key as base64 string
    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.bytes)
    }

    fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }
}

impl std::fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptionKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Authenticated encryption of single string fields
///
/// Stateless apart from the immutable key schedule, so one instance can be
/// shared across any number of concurrent callers.
pub struct FieldCipher {
    cipher: Aes256Gcm,
}

impl FieldCipher {
    /// Build a cipher from a loaded key
    pub fn new(key: &EncryptionKey) -> Self {
        Self {
            cipher: Aes256Gcm::new(key.as_bytes().into()),
        }
    }

    /// Encrypt a plaintext value into a transport-safe blob
    pub fn encrypt(&self, plaintext: &str) -> Result<String, CipherError> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let mut buffer = plaintext.as_bytes().to_vec();

        let tag = self
            .cipher
            .encrypt_in_place_detached(&nonce, b"", &mut buffer)
            .map_err(|e| CipherError::EncryptionFailed(e.to_string()))?;

        let mut blob = Vec::with_capacity(NONCE_SIZE + TAG_SIZE + buffer.len());
        blob.extend_from_slice(&nonce);
        blob.extend_from_slice(&tag);
        blob.extend_from_slice(&buffer);

        Ok(STANDARD.encode(blob))
    }

    /// Decrypt a blob produced by [`FieldCipher::encrypt`]
    ///
    /// Returns the plaintext wrapped in [`Zeroizing`] so the buffer is wiped
    /// as soon as the caller drops it.
    pub(super) fn decrypt(&self, blob: &str) -> Result<Zeroizing<String>, CipherError> {
        let raw = STANDARD
            .decode(blob)
            .map_err(|e| CipherError::MalformedCiphertext(format!("not valid base64: {}", e)))?;

        if raw.len() < NONCE_SIZE + TAG_SIZE {
            return Err(CipherError::MalformedCiphertext(format!(
                "expected at least {} bytes, got {}",
                NONCE_SIZE + TAG_SIZE,
                raw.len()
            )));
        }

        let (nonce_bytes, rest) = raw.split_at(NONCE_SIZE);
        let (tag_bytes, ciphertext) = rest.split_at(TAG_SIZE);
        let nonce = Nonce::from_slice(nonce_bytes);
        let tag = Tag::from_slice(tag_bytes);

        let mut buffer = Zeroizing::new(ciphertext.to_vec());
        self.cipher
            .decrypt_in_place_detached(nonce, b"", &mut buffer, tag)
            .map_err(|_| CipherError::AuthenticationFailed)?;

        let plaintext = String::from_utf8(std::mem::take(&mut *buffer)).map_err(|e| {
            let mut bytes = e.into_bytes();
            bytes.zeroize();
            CipherError::MalformedCiphertext("plaintext is not valid UTF-8".to_string())
        })?;

        Ok(Zeroizing::new(plaintext))
    }
}

impl std::fmt::Debug for FieldCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldCipher").finish_non_exhaustive()
    }
}
