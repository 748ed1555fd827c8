use std::{
    collections::{BTreeMap, HashMap},
    ops::Bound,
};

use async_trait::async_trait;
use parking_lot::RwLock;

use super::{
    Store,
    access::Access,
    error::{StoreError, StoreResult},
    query::ListQuery,
};
use crate::models::{Namespace, Record};

type Collection = BTreeMap<String, Record>;

/// In-memory store.
///
/// Each namespace is a `BTreeMap` keyed by record id, so paging by id
/// ascending is a range scan.
#[derive(Debug, Default)]
pub struct MemoryStore {
    namespaces: RwLock<HashMap<Namespace, Collection>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a record without any permission check.
    pub fn insert(&self, namespace: &Namespace, record: Record) -> Option<Record> {
        self.namespaces
            .write()
            .entry(namespace.clone())
            .or_default()
            .insert(record.id.clone(), record)
    }

    /// Read a record without any permission check.
    pub fn peek(&self, namespace: &Namespace, id: &str) -> Option<Record> {
        self.namespaces
            .read()
            .get(namespace)
            .and_then(|records| records.get(id))
            .cloned()
    }

    pub fn contains(&self, namespace: &Namespace, id: &str) -> bool {
        self.namespaces
            .read()
            .get(namespace)
            .is_some_and(|records| records.contains_key(id))
    }

    /// Number of records in a namespace.
    pub fn len(&self, namespace: &Namespace) -> usize {
        self.namespaces
            .read()
            .get(namespace)
            .map_or(0, BTreeMap::len)
    }

    pub fn is_empty(&self, namespace: &Namespace) -> bool {
        self.len(namespace) == 0
    }

    pub fn has_namespace(&self, namespace: &Namespace) -> bool {
        self.namespaces.read().contains_key(namespace)
    }

    /// Count records in a namespace matching a query, ignoring its limit and cursor.
    pub fn count(&self, namespace: &Namespace, query: &ListQuery) -> usize {
        self.namespaces.read().get(namespace).map_or(0, |records| {
            records.values().filter(|r| query.matches(r)).count()
        })
    }

    pub(super) fn remove(&self, namespace: &Namespace, id: &str) -> Option<Record> {
        self.namespaces
            .write()
            .get_mut(namespace)
            .and_then(|records| records.remove(id))
    }

    pub(super) fn remove_namespace(&self, namespace: &Namespace) -> bool {
        self.namespaces.write().remove(namespace).is_some()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get(
        &self,
        namespace: &Namespace,
        id: &str,
        access: Access<'_>,
    ) -> StoreResult<Option<Record>> {
        Ok(self
            .peek(namespace, id)
            .filter(|record| access.can_read(&record.permissions)))
    }

    async fn update(
        &self,
        namespace: &Namespace,
        record: Record,
        access: Access<'_>,
    ) -> StoreResult<Record> {
        let mut namespaces = self.namespaces.write();
        let existing = namespaces
            .get_mut(namespace)
            .and_then(|records| records.get_mut(&record.id))
            .ok_or(StoreError::NotFound)?;

        if !access.can_write(&existing.permissions) {
            return Err(StoreError::Forbidden(format!(
                "update {} in {}",
                record.id, namespace
            )));
        }

        *existing = record.clone();
        Ok(record)
    }

    async fn delete(
        &self,
        namespace: &Namespace,
        id: &str,
        access: Access<'_>,
    ) -> StoreResult<bool> {
        let mut namespaces = self.namespaces.write();
        let Some(records) = namespaces.get_mut(namespace) else {
            return Ok(false);
        };
        let Some(existing) = records.get(id) else {
            return Ok(false);
        };

        if !access.can_write(&existing.permissions) {
            return Err(StoreError::Forbidden(format!("delete {} in {}", id, namespace)));
        }

        records.remove(id);
        Ok(true)
    }

    async fn list(
        &self,
        namespace: &Namespace,
        query: &ListQuery,
        access: Access<'_>,
    ) -> StoreResult<Vec<Record>> {
        let namespaces = self.namespaces.read();
        let Some(records) = namespaces.get(namespace) else {
            return Ok(Vec::new());
        };

        let lower = match &query.after {
            Some(after) => Bound::Excluded(after.as_str()),
            None => Bound::Unbounded,
        };

        Ok(records
            .range::<str, _>((lower, Bound::Unbounded))
            .map(|(_, record)| record)
            .filter(|record| query.matches(record) && access.can_read(&record.permissions))
            .take(query.limit)
            .cloned()
            .collect())
    }

    async fn drop_namespace(&self, namespace: &Namespace) -> StoreResult<bool> {
        Ok(self.remove_namespace(namespace))
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
