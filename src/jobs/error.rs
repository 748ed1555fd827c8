use thiserror::Error;

use crate::{db::StoreError, models::PurgeKind, storage::StorageError};

/// Failures that abort a job. Everything tolerated (a single record failing
/// inside a group delete, a missing file) is logged and counted instead.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("{kind} purge requires a non-zero timestamp")]
    MissingTimestamp { kind: PurgeKind },

    #[error("Deleting {collection} {id} requires a tenant id")]
    MissingTenant { collection: String, id: String },

    #[error("Failed to delete {collection} {id} of user {user_id}: {source}")]
    CredentialDelete {
        user_id: String,
        collection: &'static str,
        id: String,
        #[source]
        source: StoreError,
    },

    #[error("{log} log cleanup failed for tenant {tenant}: {reason}")]
    LogPurge {
        log: &'static str,
        tenant: String,
        reason: String,
    },

    #[error("Invalid job: {0}")]
    InvalidJob(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl JobError {
    pub(super) fn log_purge(log: &'static str, tenant: &str, reason: impl ToString) -> Self {
        Self::LogPurge {
            log,
            tenant: tenant.to_string(),
            reason: reason.to_string(),
        }
    }
}

pub type JobResult<T> = Result<T, JobError>;
