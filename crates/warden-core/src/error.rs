//! Error types for Warden

use serde::Serialize;
use thiserror::Error;

use crate::domain::access::CipherError;

/// Result type alias using Warden's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Warden error types
///
/// Every non-fatal category is meant to be translated into an
/// [`ErrorResponse`] at the command boundary instead of bubbling up raw.
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors (E100-E199)
    #[error("Configuration error: {0}")]
    Configuration(String),

    // Ciphertext errors (E200-E299)
    #[error("Malformed ciphertext: {0}")]
    MalformedCiphertext(String),

    #[error("Integrity check failed: ciphertext was tampered with, corrupted, or encrypted under another key")]
    IntegrityViolation,

    #[error("Encryption failed: {0}")]
    Encryption(String),

    // Validation errors (E300-E399)
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("An account with this email address already exists")]
    DuplicateEmail,

    // Authentication errors (E400-E499)
    #[error("Re-authentication failed: the supplied password is incorrect")]
    ReauthenticationFailed,

    #[error("Invalid credentials")]
    InvalidCredentials,

    // Lookup errors (E500-E599)
    #[error("Subject '{0}' not found")]
    SubjectNotFound(String),

    #[error("Resource '{0}' not found")]
    ResourceNotFound(String),

    // Infrastructure errors (E600-E699)
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Audit write failed: {0}")]
    AuditWriteFailed(String),

    #[error("Stored data could not be parsed: {0}")]
    Parse(String),

    #[error("Password hashing failed: {0}")]
    PasswordHash(String),

    // Generic errors
    #[error("{0}")]
    Other(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Get error code for this error type
    pub fn code(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "E100",
            Self::MalformedCiphertext(_) => "E200",
            Self::IntegrityViolation => "E201",
            Self::Encryption(_) => "E202",
            Self::Validation(_) => "E300",
            Self::DuplicateEmail => "E301",
            Self::ReauthenticationFailed => "E400",
            Self::InvalidCredentials => "E401",
            Self::SubjectNotFound(_) => "E500",
            Self::ResourceNotFound(_) => "E501",
            Self::DatabaseError(_) => "E600",
            Self::Serialization(_) => "E601",
            Self::AuditWriteFailed(_) => "E602",
            Self::Parse(_) => "E603",
            Self::PasswordHash(_) => "E604",
            Self::Other(_) | Self::Io(_) => "E9999",
        }
    }

    /// Whether retrying the same operation could succeed
    ///
    /// Integrity failures are permanent: the same bytes under the same key
    /// will fail the same way forever.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::DatabaseError(err) => matches!(
                err,
                sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) | sqlx::Error::PoolClosed
            ),
            Self::AuditWriteFailed(_) => true,
            _ => false,
        }
    }

    /// Storage, serialization and other failures the caller cannot act on
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            Self::Configuration(_)
                | Self::Encryption(_)
                | Self::DatabaseError(_)
                | Self::Serialization(_)
                | Self::AuditWriteFailed(_)
                | Self::Parse(_)
                | Self::PasswordHash(_)
                | Self::Other(_)
                | Self::Io(_)
        )
    }

    /// Translate into the shape handed to an external caller.
    ///
    /// Internal failures collapse to a generic message so no driver text,
    /// SQL, or file paths leak out.
    pub fn to_response(&self) -> ErrorResponse {
        let message = match self {
            err if err.is_internal() => "An internal error occurred".to_string(),
            Self::MalformedCiphertext(_) => "The stored value is malformed".to_string(),
            other => other.to_string(),
        };

        ErrorResponse {
            code: self.code(),
            message,
        }
    }
}

impl From<CipherError> for Error {
    fn from(err: CipherError) -> Self {
        match err {
            CipherError::InvalidKeyLength { .. } | CipherError::InvalidKeyEncoding(_) => {
                Self::Configuration(err.to_string())
            }
            CipherError::MalformedCiphertext(msg) => Self::MalformedCiphertext(msg),
            CipherError::AuthenticationFailed => Self::IntegrityViolation,
            CipherError::EncryptionFailed(msg) => Self::Encryption(msg),
        }
    }
}

/// Caller-facing error payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorResponse {
    pub code: &'static str,
    pub message: String,
}
