//! Schema migrations
//!
//! An ordered list of schema steps. Each pending step runs in its own
//! transaction together with its row in the `_migrations` ledger, so a failed
//! step leaves the previous version intact.

use chrono::Utc;
use sqlx::SqlitePool;

use super::database::to_db_timestamp;
use crate::error::Result;

const LEDGER_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS _migrations (
        version INTEGER PRIMARY KEY NOT NULL,
        description TEXT NOT NULL,
        applied_at TEXT NOT NULL
    );
"#;

struct Migration {
    version: i32,
    description: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "users and protected notes",
        sql: USERS_AND_NOTES,
    },
    Migration {
        version: 2,
        description: "append-only audit trail",
        sql: AUDIT_TRAIL,
    },
];

/// Schema version this build expects
pub const CURRENT_VERSION: i32 = 2;

// Every protected attribute is an encrypted column plus a redacted column.
// The email additionally has a unique lookup hash.
const USERS_AND_NOTES: &str = r#"
    CREATE TABLE IF NOT EXISTS users (
        id TEXT PRIMARY KEY NOT NULL,
        email_encrypted TEXT NOT NULL,
        email_redacted TEXT NOT NULL,
        email_hash TEXT NOT NULL UNIQUE CHECK (length(email_hash) = 64),
        display_name_encrypted TEXT NOT NULL,
        display_name_redacted TEXT NOT NULL,
        password_hash TEXT NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS protected_notes (
        resource_id TEXT PRIMARY KEY NOT NULL,
        resource_type TEXT NOT NULL,
        note_encrypted TEXT NOT NULL,
        note_redacted TEXT NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_protected_notes_resource_type ON protected_notes(resource_type);
"#;

// Timestamps are fixed-width RFC 3339 UTC text, so text order is time order.
const AUDIT_TRAIL: &str = r#"
    CREATE TABLE IF NOT EXISTS audit_entries (
        id TEXT PRIMARY KEY NOT NULL,
        actor_id TEXT,
        action TEXT NOT NULL,
        resource_type TEXT NOT NULL,
        resource_id TEXT,
        details TEXT,
        ip_address TEXT,
        user_agent TEXT,
        created_at TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_audit_entries_created_at ON audit_entries(created_at);
    CREATE INDEX IF NOT EXISTS idx_audit_entries_action ON audit_entries(action);
    CREATE INDEX IF NOT EXISTS idx_audit_entries_actor_id ON audit_entries(actor_id);
    CREATE INDEX IF NOT EXISTS idx_audit_entries_resource_type ON audit_entries(resource_type);

    CREATE TRIGGER IF NOT EXISTS audit_entries_no_update
    BEFORE UPDATE ON audit_entries
    BEGIN
        SELECT RAISE(ABORT, 'audit entries are append-only');
    END;

    CREATE TRIGGER IF NOT EXISTS audit_entries_no_delete
    BEFORE DELETE ON audit_entries
    BEGIN
        SELECT RAISE(ABORT, 'audit entries are append-only');
    END;
"#;

async fn applied_version(pool: &SqlitePool) -> Result<i32> {
    sqlx::raw_sql(LEDGER_TABLE).execute(pool).await?;

    let (version,): (Option<i32>,) = sqlx::query_as("SELECT MAX(version) FROM _migrations")
        .fetch_one(pool)
        .await?;
    Ok(version.unwrap_or(0))
}

/// Apply every step newer than the ledger's highest version
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    let applied = applied_version(pool).await?;
    let pending: Vec<&Migration> = MIGRATIONS.iter().filter(|m| m.version > applied).collect();
    if pending.is_empty() {
        tracing::debug!(version = applied, "Schema is current");
        return Ok(());
    }

    for migration in pending {
        let mut tx = pool.begin().await?;
        sqlx::raw_sql(migration.sql).execute(&mut *tx).await?;
        sqlx::query("INSERT INTO _migrations (version, description, applied_at) VALUES (?, ?, ?)")
            .bind(migration.version)
            .bind(migration.description)
            .bind(to_db_timestamp(&Utc::now()))
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        tracing::info!(
            version = migration.version,
            description = migration.description,
            "Applied schema migration"
        );
    }
    Ok(())
}

/// Applied versus expected schema version
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MigrationStatus {
    pub applied_version: i32,
    pub expected_version: i32,
}

impl MigrationStatus {
    pub fn is_current(&self) -> bool {
        self.applied_version >= self.expected_version
    }
}

pub async fn migration_status(pool: &SqlitePool) -> Result<MigrationStatus> {
    Ok(MigrationStatus {
        applied_version: applied_version(pool).await?,
        expected_version: CURRENT_VERSION,
    })
}
