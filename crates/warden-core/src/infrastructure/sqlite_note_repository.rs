//! SQLite-backed sensitive note repository

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, SqlitePool};

use super::database::to_db_timestamp;
use crate::domain::access::{NoteRepository, StoredNote};
use crate::domain::protection::{ProtectedField, Redactable};
use crate::error::Result;

/// SQLite implementation of [`NoteRepository`]
#[derive(Debug, Clone)]
pub struct SqliteNoteRepository {
    pool: SqlitePool,
}

impl SqliteNoteRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NoteRepository for SqliteNoteRepository {
    async fn save(&self, note: &StoredNote) -> Result<()> {
        let now = to_db_timestamp(&Utc::now());
        sqlx::query(
            r#"
            INSERT INTO protected_notes (resource_id, resource_type, note_encrypted, note_redacted, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(resource_id) DO UPDATE SET
                resource_type = excluded.resource_type,
                note_encrypted = excluded.note_encrypted,
                note_redacted = excluded.note_redacted,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&note.resource_id)
        .bind(&note.resource_type)
        .bind(note.note.encrypted())
        .bind(note.note.redacted())
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_resource(&self, resource_id: &str) -> Result<Option<StoredNote>> {
        let row = sqlx::query(
            "SELECT resource_id, resource_type, note_encrypted, note_redacted FROM protected_notes WHERE resource_id = ?",
        )
        .bind(resource_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| StoredNote {
            resource_id: r.get("resource_id"),
            resource_type: r.get("resource_type"),
            note: ProtectedField::from_stored(r.get("note_encrypted"), r.get("note_redacted"), None),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::protection::NOTE_PLACEHOLDER;
    use crate::infrastructure::Database;

    fn note(resource_id: &str, encrypted: &str) -> StoredNote {
        StoredNote {
            resource_id: resource_id.to_string(),
            resource_type: "task".to_string(),
            note: ProtectedField::from_stored(encrypted.to_string(), NOTE_PLACEHOLDER.to_string(), None),
        }
    }

    #[tokio::test]
    async fn test_save_and_find() {
        let db = Database::in_memory().await.unwrap();
        let repo = SqliteNoteRepository::new(db.pool().clone());

        repo.save(&note("task-1", "BLOB1")).await.unwrap();
        let found = repo.find_by_resource("task-1").await.unwrap().unwrap();
        assert_eq!(found, note("task-1", "BLOB1"));
        assert!(repo.find_by_resource("task-2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_overwrites_existing_note() {
        let db = Database::in_memory().await.unwrap();
        let repo = SqliteNoteRepository::new(db.pool().clone());

        repo.save(&note("task-1", "BLOB1")).await.unwrap();
        repo.save(&note("task-1", "BLOB2")).await.unwrap();

        let found = repo.find_by_resource("task-1").await.unwrap().unwrap();
        assert_eq!(found.note.encrypted(), "BLOB2");
    }
}
