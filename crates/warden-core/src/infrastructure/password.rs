//! Argon2id password hashing
//!
//! Hashes are PHC strings (`$argon2id$v=19$m=...`) so the parameters travel
//! with the hash and older hashes keep verifying after a parameter change.

use aes_gcm::aead::{OsRng, rand_core::RngCore};
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};

use crate::domain::protection::TransientSecret;
use crate::domain::users::CredentialHasher;
use crate::error::{Error, Result};

/// Argon2id memory cost in KiB
const ARGON2_MEMORY_KB: u32 = 19 * 1024;
/// Argon2id iterations
const ARGON2_ITERATIONS: u32 = 2;
/// Argon2id lanes
const ARGON2_PARALLELISM: u32 = 1;

const SALT_LEN: usize = 16;

/// Argon2id implementation of [`CredentialHasher`]
#[derive(Debug, Clone)]
pub struct Argon2Hasher {
    params: Params,
}

impl Argon2Hasher {
    pub fn new() -> Result<Self> {
        Self::with_cost(ARGON2_MEMORY_KB, ARGON2_ITERATIONS)
    }

    /// Custom memory (KiB) and iteration cost
    pub fn with_cost(memory_kb: u32, iterations: u32) -> Result<Self> {
        let params = Params::new(memory_kb, iterations, ARGON2_PARALLELISM, None)
            .map_err(|e| Error::PasswordHash(e.to_string()))?;
        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }
}

impl CredentialHasher for Argon2Hasher {
    fn hash(&self, password: &TransientSecret) -> Result<String> {
        let mut salt = [0u8; SALT_LEN];
        OsRng.fill_bytes(&mut salt);
        let salt = SaltString::encode_b64(&salt).map_err(|e| Error::PasswordHash(e.to_string()))?;

        let hash = self
            .argon2()
            .hash_password(password.expose().as_bytes(), &salt)
            .map_err(|e| Error::PasswordHash(e.to_string()))?;
        Ok(hash.to_string())
    }

    fn verify(&self, stored_hash: &str, candidate: &TransientSecret) -> Result<bool> {
        let parsed =
            PasswordHash::new(stored_hash).map_err(|e| Error::PasswordHash(e.to_string()))?;

        match self
            .argon2()
            .verify_password(candidate.expose().as_bytes(), &parsed)
        {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(Error::PasswordHash(e.to_string())),
        }
    }
}
