use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    error::{QueueError, QueueResult},
    traits::{Ack, JobQueue, QueuedJob},
};
use crate::models::Job;

const FAILED_SUFFIX: &str = "failed";

#[derive(Debug, Default)]
struct Index {
    pending: HashMap<Uuid, QueuedJob>,
    in_flight: HashMap<Uuid, QueuedJob>,
    latest: Option<DateTime<Utc>>,
}

/// Spool-directory job queue.
///
/// Each pending job is a `{id}.json` file; an in-memory index orders them by
/// enqueue time. Acknowledged jobs are deleted, failed ones are rewritten
/// with their error and renamed to `{id}.json.failed`.
pub struct FileJobQueue {
    path: PathBuf,
    index: RwLock<Index>,
}

impl FileJobQueue {
    /// Open (and create if needed) a spool directory, loading pending jobs.
    pub async fn new(path: impl AsRef<Path>) -> QueueResult<Self> {
        let path = path.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&path).await?;

        let queue = Self {
            path,
            index: RwLock::new(Index::default()),
        };
        queue.load_from_disk().await?;
        Ok(queue)
    }

    async fn load_from_disk(&self) -> QueueResult<()> {
        let mut entries = tokio::fs::read_dir(&self.path).await?;
        let mut index = self.index.write().await;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                match Self::load_job_file(&path).await {
                    Ok(job) => {
                        index.latest = index.latest.max(Some(job.enqueued_at));
                        index.pending.insert(job.id, job);
                    }
                    Err(e) => {
                        tracing::warn!(path = ?path, error = %e, "Failed to load queued job file");
                    }
                }
            }
        }

        tracing::info!(
            path = ?self.path,
            pending = index.pending.len(),
            "Loaded queued jobs from disk"
        );

        Ok(())
    }

    async fn load_job_file(path: &Path) -> QueueResult<QueuedJob> {
        let contents = tokio::fs::read_to_string(path).await?;
        serde_json::from_str(&contents).map_err(|e| QueueError::Deserialization(e.to_string()))
    }

    fn job_path(&self, id: Uuid) -> PathBuf {
        self.path.join(format!("{}.json", id))
    }

    fn failed_path(&self, id: Uuid) -> PathBuf {
        self.path.join(format!("{}.json.{}", id, FAILED_SUFFIX))
    }

    async fn write_job(&self, job: &QueuedJob) -> QueueResult<()> {
        let json = serde_json::to_string_pretty(job)
            .map_err(|e| QueueError::Serialization(e.to_string()))?;
        tokio::fs::write(self.job_path(job.id), json).await?;
        Ok(())
    }

    async fn delete_job_file(&self, id: Uuid) -> QueueResult<bool> {
        match tokio::fs::remove_file(self.job_path(id)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Number of jobs claimed but not yet acknowledged.
    pub async fn in_flight(&self) -> usize {
        self.index.read().await.in_flight.len()
    }
}

#[async_trait]
impl JobQueue for FileJobQueue {
    async fn push(&self, job: Job) -> QueueResult<QueuedJob> {
        let mut index = self.index.write().await;

        // Strictly increasing enqueue times keep pop order FIFO.
        let mut queued = QueuedJob::new(job);
        if let Some(latest) = index.latest
            && queued.enqueued_at <= latest
        {
            queued.enqueued_at = latest + Duration::nanoseconds(1);
        }

        // Write to disk first
        self.write_job(&queued).await?;

        index.latest = Some(queued.enqueued_at);
        index.pending.insert(queued.id, queued.clone());

        tracing::debug!(job_id = %queued.id, job_type = %queued.job.kind(), "Job enqueued");
        Ok(queued)
    }

    async fn pop(&self) -> QueueResult<Option<QueuedJob>> {
        let mut index = self.index.write().await;

        let oldest = index
            .pending
            .values()
            .min_by_key(|j| (j.enqueued_at, j.id))
            .map(|j| j.id);

        let Some(id) = oldest else {
            return Ok(None);
        };
        let Some(job) = index.pending.remove(&id) else {
            return Ok(None);
        };
        index.in_flight.insert(id, job.clone());
        Ok(Some(job))
    }

    async fn ack(&self, id: Uuid, ack: Ack) -> QueueResult<()> {
        let mut job = self
            .index
            .write()
            .await
            .in_flight
            .remove(&id)
            .ok_or(QueueError::NotInFlight(id))?;

        match ack {
            Ack::Done => {
                self.delete_job_file(id).await?;
            }
            Ack::Failed(error) => {
                job.error = Some(error);
                self.write_job(&job).await?;
                tokio::fs::rename(self.job_path(id), self.failed_path(id)).await?;
                tracing::warn!(
                    job_id = %id,
                    path = ?self.failed_path(id),
                    "Failed job set aside"
                );
            }
        }
        Ok(())
    }

    async fn len(&self) -> QueueResult<u64> {
        Ok(self.index.read().await.pending.len() as u64)
    }
}
