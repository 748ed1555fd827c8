use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::{
    db::{AccessGate, Filter, Store, StoreError},
    jobs::delete_by_group,
    models::{Namespace, attributes, collections},
};

#[derive(Debug, Error)]
pub enum LogError {
    #[error("Invalid cleanup threshold: {0}")]
    InvalidThreshold(i64),

    #[error("Log store error: {0}")]
    Store(#[from] StoreError),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// An append-only log with its own retention (audit trail, abuse counters).
///
/// Purgers only need one operation from it: drop everything in a tenant
/// namespace older than a threshold.
#[async_trait]
pub trait RetentionLog: Send + Sync {
    /// Log name for messages and errors, e.g. `audit`.
    fn name(&self) -> &'static str;

    /// Remove entries in `namespace` whose timestamp is strictly before
    /// `before` (unix seconds). `Ok(false)` means the cleanup ran but did not
    /// complete.
    async fn cleanup(&self, namespace: &Namespace, before: i64) -> Result<bool, LogError>;
}

/// A [`RetentionLog`] whose entries are records of one collection in the
/// tenant's own namespace, carrying a `timestamp` attribute.
pub struct StoreRetentionLog {
    name: &'static str,
    collection: &'static str,
    store: Arc<dyn Store>,
}

impl StoreRetentionLog {
    pub fn new(name: &'static str, collection: &'static str, store: Arc<dyn Store>) -> Self {
        Self {
            name,
            collection,
            store,
        }
    }

    pub fn audit(store: Arc<dyn Store>) -> Self {
        Self::new("audit", collections::AUDIT, store)
    }

    pub fn abuse(store: Arc<dyn Store>) -> Self {
        Self::new("abuse", collections::ABUSE, store)
    }
}

#[async_trait]
impl RetentionLog for StoreRetentionLog {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn cleanup(&self, namespace: &Namespace, before: i64) -> Result<bool, LogError> {
        if before <= 0 {
            return Err(LogError::InvalidThreshold(before));
        }

        // The log is its own store client, with its own gate.
        let gate = AccessGate::new();
        let report = delete_by_group(
            self.store.as_ref(),
            &gate,
            namespace,
            vec![
                Filter::collection(self.collection),
                Filter::less_than(attributes::TIMESTAMP, before),
            ],
            None,
        )
        .await?;

        if report.failed > 0 {
            tracing::warn!(
                log = self.name,
                namespace = %namespace,
                failed = report.failed,
                "Log cleanup left entries behind"
            );
        }
        Ok(report.failed == 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::{ListQuery, MemoryStore},
        models::Record,
    };

    fn entry(id: &str, timestamp: i64) -> Record {
        Record::new(id, collections::AUDIT).with_attribute(attributes::TIMESTAMP, timestamp)
    }

    #[tokio::test]
    async fn test_cleanup_removes_old_entries_only() {
        let store = Arc::new(MemoryStore::new());
        let ns = Namespace::tenant("p1");
        store.insert(&ns, entry("a1", 100));
        store.insert(&ns, entry("a2", 200));
        store.insert(&ns, entry("a3", 300));
        store.insert(&ns, Record::new("x1", collections::ABUSE).with_attribute(attributes::TIMESTAMP, 1));

        let log = StoreRetentionLog::audit(store.clone());
        assert_eq!(log.name(), "audit");
        assert!(log.cleanup(&ns, 300).await.unwrap());

        assert!(!store.contains(&ns, "a1"));
        assert!(!store.contains(&ns, "a2"));
        assert!(store.contains(&ns, "a3"));
        assert!(store.contains(&ns, "x1"));
        assert_eq!(
            store.count(&ns, &ListQuery::new(vec![Filter::collection(collections::AUDIT)])),
            1
        );
    }

    #[tokio::test]
    async fn test_cleanup_rejects_zero_threshold() {
        let log = StoreRetentionLog::abuse(Arc::new(MemoryStore::new()));
        let result = log.cleanup(&Namespace::tenant("p1"), 0).await;
        assert!(matches!(result, Err(LogError::InvalidThreshold(0))));
    }
}
