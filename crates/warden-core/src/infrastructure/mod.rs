//! Infrastructure
//!
//! SQLite persistence, in-memory repositories and Argon2 password hashing.

pub mod database;
pub mod in_memory;
pub mod migrations;
pub mod password;
pub mod sqlite_audit_repository;
pub mod sqlite_note_repository;
pub mod sqlite_user_repository;

pub use database::{Database, DatabaseConfig, default_database_path};
pub use in_memory::{InMemoryAuditRepository, InMemoryNoteRepository, InMemoryUserRepository};
pub use migrations::{CURRENT_VERSION, MigrationStatus};
pub use password::Argon2Hasher;
pub use sqlite_audit_repository::SqliteAuditRepository;
pub use sqlite_note_repository::SqliteNoteRepository;
pub use sqlite_user_repository::SqliteUserRepository;
