//! Deterministic lookup hashing for encrypted fields
//!
//! Ciphertexts are randomized, so equality search runs against a separate
//! one-way hash column instead.

use sha2::{Digest, Sha256};

/// Length of a lookup hash in hex characters
pub const LOOKUP_HASH_LEN: usize = 64;

/// Hash a raw value for exact-match lookup
///
/// Input is trimmed and lower-cased first, so `" User@Example.COM "` and
/// `"user@example.com"` produce the same uppercase hex digest.
pub fn hash_for_lookup(raw: &str) -> String {
    let normalized = raw.trim().to_lowercase();
    let digest = Sha256::digest(normalized.as_bytes());
    hex::encode_upper(digest)
}
