//! SQLite-backed user repository
//!
//! Persists users as encrypted, redacted and hash columns. This repository
//! never sees plaintext and never decrypts.

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use super::database::{from_db_timestamp, to_db_timestamp};
use crate::domain::access::{EncryptedSubject, SubjectRepository};
use crate::domain::protection::{ProtectedField, Redactable};
use crate::domain::users::{User, UserRepository};
use crate::error::{Error, Result};

const SELECT_USER: &str = r#"
    SELECT id, email_encrypted, email_redacted, email_hash,
           display_name_encrypted, display_name_redacted,
           password_hash, created_at, updated_at
    FROM users
"#;

/// SQLite implementation of [`UserRepository`] and [`SubjectRepository`]
#[derive(Debug, Clone)]
pub struct SqliteUserRepository {
    pool: SqlitePool,
}

impl SqliteUserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_user(row: sqlx::sqlite::SqliteRow) -> Result<User> {
        let id_str: String = row.get("id");
        let id = Uuid::parse_str(&id_str)
            .map_err(|e| Error::Parse(format!("Invalid UUID: {}", e)))?;
        let created_at: String = row.get("created_at");
        let updated_at: String = row.get("updated_at");

        Ok(User {
            id,
            email: ProtectedField::from_stored(
                row.get("email_encrypted"),
                row.get("email_redacted"),
                Some(row.get("email_hash")),
            ),
            display_name: ProtectedField::from_stored(
                row.get("display_name_encrypted"),
                row.get("display_name_redacted"),
                None,
            ),
            password_hash: row.get("password_hash"),
            created_at: from_db_timestamp(&created_at)?,
            updated_at: from_db_timestamp(&updated_at)?,
        })
    }
}

fn email_hash(user: &User) -> Result<&str> {
    user.email
        .hash()
        .ok_or_else(|| Error::Validation("email field has no lookup hash".to_string()))
}

/// Unique-constraint failures on the email hash surface as duplicates
fn map_write_error(err: sqlx::Error) -> Error {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => Error::DuplicateEmail,
        _ => Error::DatabaseError(err),
    }
}

#[async_trait]
impl UserRepository for SqliteUserRepository {
    async fn insert(&self, user: &User) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, email_encrypted, email_redacted, email_hash,
                               display_name_encrypted, display_name_redacted,
                               password_hash, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(user.id.to_string())
        .bind(user.email.encrypted())
        .bind(user.email.redacted())
        .bind(email_hash(user)?)
        .bind(user.display_name.encrypted())
        .bind(user.display_name.redacted())
        .bind(&user.password_hash)
        .bind(to_db_timestamp(&user.created_at))
        .bind(to_db_timestamp(&user.updated_at))
        .execute(&self.pool)
        .await
        .map_err(map_write_error)?;

        Ok(())
    }

    async fn update(&self, user: &User) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET email_encrypted = ?, email_redacted = ?, email_hash = ?,
                display_name_encrypted = ?, display_name_redacted = ?,
                password_hash = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(user.email.encrypted())
        .bind(user.email.redacted())
        .bind(email_hash(user)?)
        .bind(user.display_name.encrypted())
        .bind(user.display_name.redacted())
        .bind(&user.password_hash)
        .bind(to_db_timestamp(&user.updated_at))
        .bind(user.id.to_string())
        .execute(&self.pool)
        .await
        .map_err(map_write_error)?;

        if result.rows_affected() == 0 {
            return Err(Error::SubjectNotFound(user.id.to_string()));
        }
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let row = sqlx::query(&format!("{} WHERE id = ?", SELECT_USER))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_user).transpose()
    }

    async fn find_by_email_hash(&self, hash: &str) -> Result<Option<User>> {
        let row = sqlx::query(&format!("{} WHERE email_hash = ?", SELECT_USER))
            .bind(hash)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_user).transpose()
    }
}

#[async_trait]
impl SubjectRepository for SqliteUserRepository {
    async fn find_encrypted_attributes(&self, subject_id: Uuid) -> Result<Option<EncryptedSubject>> {
        let row = sqlx::query(
            "SELECT email_encrypted, display_name_encrypted FROM users WHERE id = ?",
        )
        .bind(subject_id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| EncryptedSubject {
            subject_id,
            email: r.get("email_encrypted"),
            display_name: r.get("display_name_encrypted"),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::access::{EncryptionKey, FieldCipher};
    use crate::domain::protection::FieldProtector;
    use crate::infrastructure::Database;
    use std::sync::Arc;

    async fn setup() -> (SqliteUserRepository, FieldProtector) {
        let db = Database::in_memory().await.unwrap();
        let cipher = Arc::new(FieldCipher::new(&EncryptionKey::generate()));
        (
            SqliteUserRepository::new(db.pool().clone()),
            FieldProtector::new(cipher),
        )
    }

    fn user(protector: &FieldProtector, email: &str) -> User {
        User::new(
            protector.protect_email(email).unwrap(),
            protector.protect_display_name("Jane Roe").unwrap(),
            "$argon2id$stub".to_string(),
        )
    }

    #[tokio::test]
    async fn test_insert_and_find() {
        let (repo, protector) = setup().await;
        let user = user(&protector, "jane@example.com");
        repo.insert(&user).await.unwrap();

        let by_id = repo.find_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(by_id.email, user.email);
        assert_eq!(by_id.display_name, user.display_name);
        assert_eq!(by_id.password_hash, user.password_hash);

        let by_hash = repo
            .find_by_email_hash(user.email.hash().unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_hash.id, user.id);

        assert!(repo.find_by_id(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_email_hash_is_rejected() {
        let (repo, protector) = setup().await;
        repo.insert(&user(&protector, "jane@example.com")).await.unwrap();

        let err = repo
            .insert(&user(&protector, "JANE@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateEmail));
    }

    #[tokio::test]
    async fn test_update_replaces_email_columns() {
        let (repo, protector) = setup().await;
        let mut user = user(&protector, "jane@example.com");
        repo.insert(&user).await.unwrap();

        user.change_email(protector.protect_email("roe@example.org").unwrap());
        repo.update(&user).await.unwrap();

        let stored = repo.find_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(stored.email.redacted(), "r***@example.org");
        assert_eq!(stored.email.hash(), user.email.hash());

        let ghost = self::user(&protector, "ghost@example.com");
        assert!(matches!(
            repo.update(&ghost).await.unwrap_err(),
            Error::SubjectNotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_subject_view_returns_ciphertext() {
        let (repo, protector) = setup().await;
        let user = user(&protector, "jane@example.com");
        repo.insert(&user).await.unwrap();

        let subject = repo.find_encrypted_attributes(user.id).await.unwrap().unwrap();
        assert_eq!(subject, user.encrypted_attributes());
        assert!(
            repo.find_encrypted_attributes(Uuid::new_v4())
                .await
                .unwrap()
                .is_none()
        );
    }
}
