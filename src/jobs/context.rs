use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use crate::{
    config::StorageConfig,
    db::{AccessGate, Store},
    retention::{RetentionLog, StoreRetentionLog},
    storage::{Device, LocalDevice, StorageError, StorageResult},
};

/// Long-lived collaborators shared by every job.
#[derive(Clone)]
pub struct Dependencies {
    pub store: Arc<dyn Store>,
    pub audit: Arc<dyn RetentionLog>,
    pub abuse: Arc<dyn RetentionLog>,
    pub storage: StorageConfig,
}

impl Dependencies {
    /// Audit and abuse logs default to collections in the same store.
    pub fn new(store: Arc<dyn Store>, storage: StorageConfig) -> Self {
        Self {
            audit: Arc::new(StoreRetentionLog::audit(store.clone())),
            abuse: Arc::new(StoreRetentionLog::abuse(store.clone())),
            store,
            storage,
        }
    }

    pub fn with_audit_log(mut self, audit: Arc<dyn RetentionLog>) -> Self {
        self.audit = audit;
        self
    }

    pub fn with_abuse_log(mut self, abuse: Arc<dyn RetentionLog>) -> Self {
        self.abuse = abuse;
        self
    }
}

/// Everything one job runs with. Built fresh for each job, so its access
/// gate (and any window on it) never outlives the job.
pub struct JobContext {
    deps: Dependencies,
    gate: AccessGate,
}

impl JobContext {
    pub fn new(deps: Dependencies) -> Self {
        Self {
            deps,
            gate: AccessGate::new(),
        }
    }

    pub fn store(&self) -> &dyn Store {
        self.deps.store.as_ref()
    }

    pub fn gate(&self) -> &AccessGate {
        &self.gate
    }

    pub fn audit_log(&self) -> &dyn RetentionLog {
        self.deps.audit.as_ref()
    }

    pub fn abuse_log(&self) -> &dyn RetentionLog {
        self.deps.abuse.as_ref()
    }

    /// The tenant's upload tree.
    pub fn uploads(&self, tenant: &str) -> StorageResult<LocalDevice> {
        tenant_device(&self.deps.storage.uploads, tenant)
    }

    /// The tenant's cache tree.
    pub fn cache(&self, tenant: &str) -> StorageResult<LocalDevice> {
        tenant_device(&self.deps.storage.cache, tenant)
    }

    /// The tenant's function code bundles.
    pub fn functions(&self, tenant: &str) -> StorageResult<LocalDevice> {
        tenant_device(&self.deps.storage.functions, tenant)
    }

    /// All certificate directories, one per domain.
    pub fn certificates(&self) -> LocalDevice {
        LocalDevice::new(&self.deps.storage.certificates)
    }
}

/// `{base}/app-{tenant}`. Tenant ids that do not name a direct child of
/// `base` are refused.
fn tenant_device(base: &Path, tenant: &str) -> StorageResult<LocalDevice> {
    let base = LocalDevice::new(base);
    let dir = PathBuf::from(format!("app-{}", tenant));
    let root = base.resolve(&dir)?;
    let parent = base.resolve(Path::new(""))?;
    if root.parent() != Some(parent.as_path()) {
        return Err(StorageError::OutsideRoot {
            root: parent,
            path: dir,
        });
    }
    Ok(LocalDevice::new(root))
}
