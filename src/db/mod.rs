//! Record store contract and the bundled backends.
//!
//! The worker never talks to a database directly; it goes through [`Store`].
//! Two backends ship with the crate:
//!
//! - [`MemoryStore`]: in-process, used by tests and `database.type = "memory"`
//! - [`FileStore`]: one JSON file per record under a namespace directory,
//!   used by `database.type = "file"`

mod access;
pub mod error;
mod file;
mod memory;
mod query;

use std::sync::Arc;

pub use access::{Access, AccessGate, Elevated};
use async_trait::async_trait;
pub use error::{StoreError, StoreResult};
pub use file::FileStore;
pub use memory::MemoryStore;
pub use query::{Filter, ListQuery, PAGE_SIZE};

use crate::{config::DatabaseConfig, models::Namespace, models::Record};

/// Tenant-namespaced record access.
///
/// Implementations must be thread-safe. Per-record calls are authorized by
/// the supplied [`Access`].
#[async_trait]
pub trait Store: Send + Sync {
    /// Fetch a record. Records the caller may not read are reported absent.
    async fn get(
        &self,
        namespace: &Namespace,
        id: &str,
        access: Access<'_>,
    ) -> StoreResult<Option<Record>>;

    /// Replace an existing record.
    async fn update(
        &self,
        namespace: &Namespace,
        record: Record,
        access: Access<'_>,
    ) -> StoreResult<Record>;

    /// Delete a record. `Ok(false)` means it was already gone.
    async fn delete(&self, namespace: &Namespace, id: &str, access: Access<'_>)
    -> StoreResult<bool>;

    /// One page of records matching the query, id ascending.
    async fn list(
        &self,
        namespace: &Namespace,
        query: &ListQuery,
        access: Access<'_>,
    ) -> StoreResult<Vec<Record>>;

    /// Destroy a whole namespace. `Ok(false)` means it did not exist.
    async fn drop_namespace(&self, namespace: &Namespace) -> StoreResult<bool>;

    /// Backend name for logs.
    fn backend_name(&self) -> &'static str;
}

/// Create a store from configuration.
pub async fn create_store(config: &DatabaseConfig) -> StoreResult<Arc<dyn Store>> {
    let store: Arc<dyn Store> = match config {
        DatabaseConfig::Memory => {
            tracing::warn!("Using in-memory store; all records are lost on exit");
            Arc::new(MemoryStore::new())
        }
        DatabaseConfig::File { path } => {
            tracing::info!(path = %path.display(), "Using file store");
            Arc::new(FileStore::open(path).await?)
        }
    };
    Ok(store)
}
