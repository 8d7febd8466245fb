//! SQLite storage
//!
//! One pool per process. File databases run in WAL mode with foreign keys
//! enforced; `:memory:` databases are pinned to a single connection because
//! every SQLite connection to `:memory:` opens a fresh, empty database.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};

use super::migrations::{self, MigrationStatus};
use crate::error::{Error, Result};

pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// How long a writer waits on a locked database before failing
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const MEMORY_PATH: &str = ":memory:";

/// Where and how to open the store
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// File path, or `:memory:`
    pub path: PathBuf,
    pub max_connections: u32,
    /// Apply pending schema migrations when the pool opens
    pub migrate_on_open: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self::with_path(default_database_path())
    }
}

impl DatabaseConfig {
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            migrate_on_open: true,
        }
    }

    /// Private throwaway database, used by tests
    pub fn in_memory() -> Self {
        Self {
            max_connections: 1,
            ..Self::with_path(MEMORY_PATH)
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max.max(1);
        self
    }

    /// Leave the schema as it is on open
    pub fn no_migrate(mut self) -> Self {
        self.migrate_on_open = false;
        self
    }

    fn is_memory(&self) -> bool {
        self.path.as_os_str() == MEMORY_PATH
    }

    fn connect_options(&self) -> Result<SqliteConnectOptions> {
        let options = if self.is_memory() {
            SqliteConnectOptions::from_str("sqlite::memory:")?
        } else {
            SqliteConnectOptions::new()
                .filename(&self.path)
                .create_if_missing(true)
                .journal_mode(SqliteJournalMode::Wal)
                .synchronous(SqliteSynchronous::Normal)
        };
        Ok(options.foreign_keys(true).busy_timeout(BUSY_TIMEOUT))
    }
}

/// `<data dir>/warden/warden.db`, or `warden.db` when no data dir exists
pub fn default_database_path() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("warden"))
        .unwrap_or_default()
        .join("warden.db")
}

/// Fixed-width RFC 3339 text; lexical order matches chronological order
pub(crate) fn to_db_timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn from_db_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|e| Error::Parse(format!("invalid timestamp '{}': {}", raw, e)))
}

/// Shared handle to the Warden store
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
    config: DatabaseConfig,
}

impl Database {
    /// Open the store, creating the file and its directory when missing
    pub async fn new(config: DatabaseConfig) -> Result<Self> {
        if !config.is_memory() {
            let parent = config.path.parent().filter(|dir| !dir.as_os_str().is_empty());
            if let Some(dir) = parent {
                std::fs::create_dir_all(dir)?;
            }
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(config.connect_options()?)
            .await?;
        tracing::debug!(path = %config.path.display(), max_connections = config.max_connections, "Opened store");

        let db = Self { pool, config };
        if db.config.migrate_on_open {
            db.migrate().await?;
        }
        Ok(db)
    }

    pub async fn in_memory() -> Result<Self> {
        Self::new(DatabaseConfig::in_memory()).await
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn migrate(&self) -> Result<()> {
        migrations::run_migrations(&self.pool).await
    }

    pub async fn migration_status(&self) -> Result<MigrationStatus> {
        migrations::migration_status(&self.pool).await
    }

    /// Round-trip a trivial query
    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Wait for checked-out connections and close the pool
    pub async fn close(&self) {
        self.pool.close().await;
    }

    pub fn path(&self) -> &Path {
        &self.config.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamps_are_fixed_width_and_ordered() {
        let early = DateTime::parse_from_rfc3339("2024-01-01T09:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let late = early + chrono::Duration::microseconds(1500);

        let (a, b) = (to_db_timestamp(&early), to_db_timestamp(&late));
        assert_eq!(a, "2024-01-01T09:00:00.000000Z");
        assert_eq!(a.len(), b.len());
        assert!(a < b);
        assert_eq!(from_db_timestamp(&b).unwrap(), late);
        assert!(from_db_timestamp("yesterday").is_err());
    }

    #[tokio::test]
    async fn test_in_memory_database_is_migrated() {
        let db = Database::in_memory().await.unwrap();
        db.health_check().await.unwrap();

        let status = db.migration_status().await.unwrap();
        assert!(status.is_current());
    }

    #[tokio::test]
    async fn test_file_database_creates_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("warden.db");

        let db = Database::new(DatabaseConfig::with_path(&path)).await.unwrap();
        db.health_check().await.unwrap();
        assert!(path.exists());
        assert_eq!(db.path(), path.as_path());
        db.close().await;
    }

    #[tokio::test]
    async fn test_no_migrate_leaves_schema_empty() {
        let db = Database::new(DatabaseConfig::in_memory().no_migrate()).await.unwrap();
        let status = db.migration_status().await.unwrap();
        assert_eq!(status.applied_version, 0);
        assert!(!status.is_current());
    }
}
