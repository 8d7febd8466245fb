//! Audit trail service

use std::sync::Arc;

use super::entity::{AuditEntry, AuditQuery, DEFAULT_PAGE_SIZE, Page};
use super::repository::AuditRepository;
use crate::error::{Error, Result};

/// Upper bound on a single search page unless configured otherwise
pub const MAX_PAGE_SIZE: u32 = 100;

/// Records and searches audit entries
///
/// Writes run on their own tokio task, which is awaited. If the caller's
/// future is dropped mid-write, the write still completes.
#[derive(Clone)]
pub struct AuditTrail {
    repository: Arc<dyn AuditRepository>,
    default_page_size: u32,
    max_page_size: u32,
}

impl AuditTrail {
    pub fn new(repository: Arc<dyn AuditRepository>) -> Self {
        Self {
            repository,
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: MAX_PAGE_SIZE,
        }
    }

    /// Override page size limits (from configuration)
    pub fn with_page_limits(mut self, default_page_size: u32, max_page_size: u32) -> Self {
        self.default_page_size = default_page_size.max(1);
        self.max_page_size = max_page_size.max(self.default_page_size);
        self
    }

    /// Append an entry, surviving cancellation of the calling future
    pub async fn record(&self, entry: AuditEntry) -> Result<()> {
        let repository = Arc::clone(&self.repository);
        let action = entry.action;
        let entry_id = entry.id;

        let outcome = tokio::spawn(async move { repository.add(&entry).await })
            .await
            .map_err(|e| Error::AuditWriteFailed(format!("audit task aborted: {}", e)))?;

        match outcome {
            Ok(()) => {
                tracing::debug!(audit_id = %entry_id, action = %action, "Recorded audit entry");
                Ok(())
            }
            Err(e) => {
                tracing::error!(audit_id = %entry_id, action = %action, error = %e, "Failed to record audit entry");
                Err(Error::AuditWriteFailed(e.to_string()))
            }
        }
    }

    /// Search with page number and size normalized to the configured limits
    pub async fn search(&self, mut query: AuditQuery) -> Result<Page<AuditEntry>> {
        query.page = query.page.max(1);
        query.page_size = match query.page_size {
            0 => self.default_page_size,
            size => size.min(self.max_page_size),
        };
        if let (Some(from), Some(to)) = (query.date_from, query.date_to) {
            if from > to {
                return Err(Error::Validation(
                    "dateFrom must not be later than dateTo".to_string(),
                ));
            }
        }
        self.repository.search(&query).await
    }
}

impl std::fmt::Debug for AuditTrail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditTrail")
            .field("default_page_size", &self.default_page_size)
            .field("max_page_size", &self.max_page_size)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::audit::AuditAction;
    use crate::infrastructure::InMemoryAuditRepository;
    use async_trait::async_trait;
    use chrono::{Duration, Utc};

    struct FailingAuditRepository;

    #[async_trait]
    impl AuditRepository for FailingAuditRepository {
        async fn add(&self, _entry: &AuditEntry) -> Result<()> {
            Err(Error::Other("disk full".to_string()))
        }

        async fn search(&self, query: &AuditQuery) -> Result<Page<AuditEntry>> {
            Ok(Page::empty(query.page, query.page_size))
        }
    }

    /// Holds every write for a while before storing it
    struct SlowAuditRepository {
        inner: InMemoryAuditRepository,
        delay: std::time::Duration,
    }

    #[async_trait]
    impl AuditRepository for SlowAuditRepository {
        async fn add(&self, entry: &AuditEntry) -> Result<()> {
            tokio::time::sleep(self.delay).await;
            self.inner.add(entry).await
        }

        async fn search(&self, query: &AuditQuery) -> Result<Page<AuditEntry>> {
            self.inner.search(query).await
        }
    }

    fn entry(action: AuditAction) -> AuditEntry {
        AuditEntry::new(None, action, "user", Some("1".to_string()))
    }

    #[tokio::test]
    async fn test_record_then_search() {
        let trail = AuditTrail::new(Arc::new(InMemoryAuditRepository::new()));
        trail.record(entry(AuditAction::UserRegistered)).await.unwrap();
        trail.record(entry(AuditAction::UserLoggedIn)).await.unwrap();

        let page = trail.search(AuditQuery::default()).await.unwrap();
        assert_eq!(page.total_count, 2);
        assert_eq!(page.items[0].action, AuditAction::UserLoggedIn);
    }

    #[tokio::test]
    async fn test_failed_write_is_reported() {
        let trail = AuditTrail::new(Arc::new(FailingAuditRepository));
        let result = trail.record(entry(AuditAction::UserRegistered)).await;
        assert!(matches!(result, Err(Error::AuditWriteFailed(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_record_completes_after_caller_is_dropped() {
        let trail = AuditTrail::new(Arc::new(SlowAuditRepository {
            inner: InMemoryAuditRepository::new(),
            delay: std::time::Duration::from_millis(50),
        }));

        let cancelled = tokio::time::timeout(
            std::time::Duration::from_millis(5),
            trail.record(entry(AuditAction::ProtectedDataRevealed)),
        )
        .await;
        assert!(cancelled.is_err());

        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        let page = trail.search(AuditQuery::default()).await.unwrap();
        assert_eq!(page.total_count, 1);
        assert_eq!(page.items[0].action, AuditAction::ProtectedDataRevealed);
    }

    #[tokio::test]
    async fn test_search_clamps_page_size() {
        let trail = AuditTrail::new(Arc::new(InMemoryAuditRepository::new())).with_page_limits(5, 10);

        let page = trail
            .search(AuditQuery {
                page: 0,
                page_size: 500,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(page.page, 1);
        assert_eq!(page.page_size, 10);

        let page = trail
            .search(AuditQuery {
                page_size: 0,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(page.page_size, 5);
    }

    #[tokio::test]
    async fn test_search_rejects_inverted_date_range() {
        let trail = AuditTrail::new(Arc::new(InMemoryAuditRepository::new()));
        let now = Utc::now();
        let result = trail
            .search(AuditQuery {
                date_from: Some(now),
                date_to: Some(now - Duration::days(1)),
                ..Default::default()
            })
            .await;
        assert!(matches!(result, Err(Error::Validation(_))));
    }
}
