//! Audit repository trait

use async_trait::async_trait;

use super::entity::{AuditEntry, AuditQuery, Page};
use crate::error::Result;

/// Append-only store of audit entries
///
/// Entries are never updated or deleted.
#[async_trait]
pub trait AuditRepository: Send + Sync {
    /// Append one entry
    async fn add(&self, entry: &AuditEntry) -> Result<()>;

    /// Search entries newest-first; an empty result is not an error
    async fn search(&self, query: &AuditQuery) -> Result<Page<AuditEntry>>;
}
