use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::{
    Store,
    access::Access,
    error::{StoreError, StoreResult},
    memory::MemoryStore,
    query::ListQuery,
};
use crate::models::{Namespace, Record};

/// File-backed store.
///
/// Layout: `{root}/{namespace key}/{record id}.json`. All records are loaded
/// into an in-memory index at open; writes go to disk first, then to the
/// index.
pub struct FileStore {
    root: PathBuf,
    index: MemoryStore,
}

impl FileStore {
    /// Open (and create if needed) a store rooted at `root`.
    pub async fn open(root: impl AsRef<Path>) -> StoreResult<Self> {
        let root = root.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&root).await?;

        let store = Self {
            root,
            index: MemoryStore::new(),
        };
        store.load_from_disk().await?;
        Ok(store)
    }

    async fn load_from_disk(&self) -> StoreResult<()> {
        let mut namespaces = tokio::fs::read_dir(&self.root).await?;
        let mut loaded = 0usize;

        while let Some(entry) = namespaces.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            let dir_name = entry.file_name().to_string_lossy().to_string();
            let Some(namespace) = Namespace::from_key(&dir_name) else {
                tracing::warn!(dir = %dir_name, "Skipping directory that is not a namespace");
                continue;
            };

            let mut records = tokio::fs::read_dir(entry.path()).await?;
            while let Some(file) = records.next_entry().await? {
                let path = file.path();
                if path.extension().is_none_or(|ext| ext != "json") {
                    continue;
                }
                match Self::load_record(&path).await {
                    Ok(record) => {
                        self.index.insert(&namespace, record);
                        loaded += 1;
                    }
                    Err(e) => {
                        tracing::warn!(path = ?path, error = %e, "Failed to load record file");
                    }
                }
            }
        }

        tracing::info!(root = ?self.root, records = loaded, "Loaded records from disk");
        Ok(())
    }

    async fn load_record(path: &Path) -> StoreResult<Record> {
        let contents = tokio::fs::read_to_string(path).await?;
        Ok(serde_json::from_str(&contents)?)
    }

    fn namespace_dir(&self, namespace: &Namespace) -> StoreResult<PathBuf> {
        let key = namespace.key();
        check_segment(&key)?;
        Ok(self.root.join(key))
    }

    fn record_path(&self, namespace: &Namespace, id: &str) -> StoreResult<PathBuf> {
        check_segment(id)?;
        Ok(self.namespace_dir(namespace)?.join(format!("{}.json", id)))
    }

    /// Insert or replace a record on disk and in the index, without permission checks.
    pub async fn insert(&self, namespace: &Namespace, record: Record) -> StoreResult<()> {
        let dir = self.namespace_dir(namespace)?;
        tokio::fs::create_dir_all(&dir).await?;
        self.write_record(namespace, &record).await?;
        self.index.insert(namespace, record);
        Ok(())
    }

    async fn write_record(&self, namespace: &Namespace, record: &Record) -> StoreResult<()> {
        let path = self.record_path(namespace, &record.id)?;
        let json = serde_json::to_string_pretty(record)?;
        tokio::fs::write(&path, json).await?;
        Ok(())
    }
}

/// Ids and namespace keys become path segments; reject anything that could
/// address a different file.
fn check_segment(segment: &str) -> StoreResult<()> {
    let bad = segment.is_empty()
        || segment == "."
        || segment == ".."
        || segment.contains(['/', '\\', '\0']);
    if bad {
        return Err(StoreError::InvalidKey(segment.to_string()));
    }
    Ok(())
}

#[async_trait]
impl Store for FileStore {
    async fn get(
        &self,
        namespace: &Namespace,
        id: &str,
        access: Access<'_>,
    ) -> StoreResult<Option<Record>> {
        self.index.get(namespace, id, access).await
    }

    async fn update(
        &self,
        namespace: &Namespace,
        record: Record,
        access: Access<'_>,
    ) -> StoreResult<Record> {
        let existing = self
            .index
            .peek(namespace, &record.id)
            .ok_or(StoreError::NotFound)?;
        if !access.can_write(&existing.permissions) {
            return Err(StoreError::Forbidden(format!(
                "update {} in {}",
                record.id, namespace
            )));
        }

        self.write_record(namespace, &record).await?;
        self.index.insert(namespace, record.clone());
        Ok(record)
    }

    async fn delete(
        &self,
        namespace: &Namespace,
        id: &str,
        access: Access<'_>,
    ) -> StoreResult<bool> {
        let Some(existing) = self.index.peek(namespace, id) else {
            return Ok(false);
        };
        if !access.can_write(&existing.permissions) {
            return Err(StoreError::Forbidden(format!("delete {} in {}", id, namespace)));
        }

        let path = self.record_path(namespace, id)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        self.index.remove(namespace, id);
        Ok(true)
    }

    async fn list(
        &self,
        namespace: &Namespace,
        query: &ListQuery,
        access: Access<'_>,
    ) -> StoreResult<Vec<Record>> {
        self.index.list(namespace, query, access).await
    }

    async fn drop_namespace(&self, namespace: &Namespace) -> StoreResult<bool> {
        let dir = self.namespace_dir(namespace)?;
        let existed = match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => true,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
            Err(e) => return Err(e.into()),
        };
        Ok(self.index.remove_namespace(namespace) || existed)
    }

    fn backend_name(&self) -> &'static str {
        "file"
    }
}
