//! Shared fixtures and end-to-end cascade tests.

mod cascades;

use std::collections::HashSet;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::{
    db::{Access, ListQuery, MemoryStore, Store, StoreError, StoreResult},
    models::{Namespace, Record, attributes, collections},
    retention::{LogError, RetentionLog},
};

/// A [`MemoryStore`] with injected failures.
pub struct FlakyStore {
    inner: MemoryStore,
    failing_deletes: HashSet<String>,
    failing_lists: bool,
}

impl FlakyStore {
    pub fn new(inner: MemoryStore) -> Self {
        Self {
            inner,
            failing_deletes: HashSet::new(),
            failing_lists: false,
        }
    }

    /// Deleting any of these ids fails.
    pub fn failing_deletes<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.failing_deletes.extend(ids.into_iter().map(Into::into));
        self
    }

    /// Every list call fails.
    pub fn failing_lists(mut self) -> Self {
        self.failing_lists = true;
        self
    }

    pub fn inner(&self) -> &MemoryStore {
        &self.inner
    }
}

#[async_trait]
impl Store for FlakyStore {
    async fn get(
        &self,
        namespace: &Namespace,
        id: &str,
        access: Access<'_>,
    ) -> StoreResult<Option<Record>> {
        self.inner.get(namespace, id, access).await
    }

    async fn update(
        &self,
        namespace: &Namespace,
        record: Record,
        access: Access<'_>,
    ) -> StoreResult<Record> {
        self.inner.update(namespace, record, access).await
    }

    async fn delete(
        &self,
        namespace: &Namespace,
        id: &str,
        access: Access<'_>,
    ) -> StoreResult<bool> {
        if self.failing_deletes.contains(id) {
            return Err(StoreError::Internal(format!("injected delete failure for {}", id)));
        }
        self.inner.delete(namespace, id, access).await
    }

    async fn list(
        &self,
        namespace: &Namespace,
        query: &ListQuery,
        access: Access<'_>,
    ) -> StoreResult<Vec<Record>> {
        if self.failing_lists {
            return Err(StoreError::Internal("injected list failure".to_string()));
        }
        self.inner.list(namespace, query, access).await
    }

    async fn drop_namespace(&self, namespace: &Namespace) -> StoreResult<bool> {
        self.inner.drop_namespace(namespace).await
    }

    fn backend_name(&self) -> &'static str {
        "flaky"
    }
}

/// How a [`RecordingLog`] answers cleanups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogBehavior {
    Succeed,
    /// Report an incomplete cleanup for this tenant.
    Incomplete(&'static str),
    /// Fail with an error for this tenant.
    Error(&'static str),
}

/// A [`RetentionLog`] that records the tenants it was asked to clean.
pub struct RecordingLog {
    name: &'static str,
    behavior: LogBehavior,
    calls: Mutex<Vec<(String, i64)>>,
}

impl RecordingLog {
    pub fn new(name: &'static str, behavior: LogBehavior) -> Self {
        Self {
            name,
            behavior,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// `(tenant, before)` of every cleanup call, in order.
    pub fn calls(&self) -> Vec<(String, i64)> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl RetentionLog for RecordingLog {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn cleanup(&self, namespace: &Namespace, before: i64) -> Result<bool, LogError> {
        let Namespace::Tenant(tenant) = namespace else {
            return Err(LogError::Internal("console namespace has no log".to_string()));
        };
        self.calls.lock().push((tenant.clone(), before));
        match self.behavior {
            LogBehavior::Incomplete(bad) if bad == tenant.as_str() => Ok(false),
            LogBehavior::Error(bad) if bad == tenant.as_str() => {
                Err(LogError::Internal(format!("cleanup refused for {}", tenant)))
            }
            _ => Ok(true),
        }
    }
}

pub fn membership(id: &str, team: &str, user: &str, confirmed: bool) -> Record {
    Record::new(id, collections::MEMBERSHIPS)
        .with_attribute(attributes::TEAM_ID, team)
        .with_attribute(attributes::USER_ID, user)
        .with_attribute(attributes::CONFIRMED, confirmed)
}

/// `n` confirmed memberships of user `u1` in `team`, ids `m0000`, `m0001`, ...
pub fn seed_memberships(store: &MemoryStore, namespace: &Namespace, team: &str, n: usize) {
    for i in 0..n {
        store.insert(namespace, membership(&format!("m{:04}", i), team, "u1", true));
    }
}

/// `n` projects in the console namespace, ids `p0000`, `p0001`, ...
pub fn seed_projects(store: &MemoryStore, n: usize) {
    for i in 0..n {
        store.insert(
            &Namespace::Console,
            Record::new(format!("p{:04}", i), collections::PROJECTS),
        );
    }
}
