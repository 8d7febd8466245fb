//! SQLite-backed audit trail
//!
//! Insert and filtered search only. The table carries triggers that abort
//! any UPDATE or DELETE.

use async_trait::async_trait;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use uuid::Uuid;

use super::database::{from_db_timestamp, to_db_timestamp};
use crate::domain::audit::{AuditAction, AuditEntry, AuditQuery, AuditRepository, Page};
use crate::error::{Error, Result};

/// SQLite implementation of [`AuditRepository`]
#[derive(Debug, Clone)]
pub struct SqliteAuditRepository {
    pool: SqlitePool,
}

impl SqliteAuditRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_entry(row: sqlx::sqlite::SqliteRow) -> Result<AuditEntry> {
        let id: String = row.get("id");
        let actor_id: Option<String> = row.get("actor_id");
        let action: String = row.get("action");
        let created_at: String = row.get("created_at");

        Ok(AuditEntry {
            id: parse_uuid(&id)?,
            actor_id: actor_id.as_deref().map(parse_uuid).transpose()?,
            action: AuditAction::parse(&action)
                .ok_or_else(|| Error::Parse(format!("Unknown audit action: {}", action)))?,
            resource_type: row.get("resource_type"),
            resource_id: row.get("resource_id"),
            details: row.get("details"),
            ip_address: row.get("ip_address"),
            user_agent: row.get("user_agent"),
            created_at: from_db_timestamp(&created_at)?,
        })
    }
}

fn parse_uuid(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).map_err(|e| Error::Parse(format!("Invalid UUID: {}", e)))
}

/// Append the ANDed WHERE clause for every supplied filter
fn push_filters(builder: &mut QueryBuilder<'_, Sqlite>, query: &AuditQuery) {
    builder.push(" WHERE 1 = 1");
    if let Some(from) = &query.date_from {
        builder.push(" AND created_at >= ").push_bind(to_db_timestamp(from));
    }
    if let Some(to) = &query.date_to {
        builder.push(" AND created_at <= ").push_bind(to_db_timestamp(to));
    }
    if let Some(action) = query.action {
        builder.push(" AND action = ").push_bind(action.as_str());
    }
    if let Some(actor_id) = query.actor_id {
        builder.push(" AND actor_id = ").push_bind(actor_id.to_string());
    }
    if let Some(resource_type) = &query.resource_type {
        builder.push(" AND resource_type = ").push_bind(resource_type.clone());
    }
}

#[async_trait]
impl AuditRepository for SqliteAuditRepository {
    async fn add(&self, entry: &AuditEntry) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO audit_entries (id, actor_id, action, resource_type, resource_id, details, ip_address, user_agent, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(entry.id.to_string())
        .bind(entry.actor_id.map(|id| id.to_string()))
        .bind(entry.action.as_str())
        .bind(&entry.resource_type)
        .bind(&entry.resource_id)
        .bind(&entry.details)
        .bind(&entry.ip_address)
        .bind(&entry.user_agent)
        .bind(to_db_timestamp(&entry.created_at))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn search(&self, query: &AuditQuery) -> Result<Page<AuditEntry>> {
        let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM audit_entries");
        push_filters(&mut count, query);
        let (total,) = count.build_query_as::<(i64,)>().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::<Sqlite>::new(
            "SELECT id, actor_id, action, resource_type, resource_id, details, ip_address, user_agent, created_at FROM audit_entries",
        );
        push_filters(&mut select, query);
        select
            .push(" ORDER BY created_at DESC, rowid DESC LIMIT ")
            .push_bind(i64::from(query.page_size))
            .push(" OFFSET ")
            .push_bind(i64::try_from(query.offset()).unwrap_or(i64::MAX));

        let rows = select.build().fetch_all(&self.pool).await?;
        let items = rows
            .into_iter()
            .map(Self::row_to_entry)
            .collect::<Result<Vec<_>>>()?;

        Ok(Page {
            items,
            total_count: u64::try_from(total).unwrap_or(0),
            page: query.page,
            page_size: query.page_size,
        })
    }
}
