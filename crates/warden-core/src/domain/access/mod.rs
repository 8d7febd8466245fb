//! Audited access to protected data
//!
//! The cipher lives in a private submodule. Its `decrypt` is visible only
//! inside this module, so the gateway and the output-only revealed field are
//! the only code able to turn ciphertext back into plaintext.

mod cipher;
pub mod gateway;
pub mod repository;
pub mod revealed;

pub use cipher::{CipherError, EncryptionKey, FieldCipher, KEY_SIZE, NONCE_SIZE, TAG_SIZE};
pub use gateway::{AccessGateway, DecryptedSubject, SUBJECT_RESOURCE_TYPE, SystemAccessReason};
pub use repository::{EncryptedSubject, NoteRepository, StoredNote, SubjectRepository};
pub use revealed::{RevealedField, RevealedNote, RevealedSubject};
