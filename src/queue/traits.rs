use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::QueueResult;
use crate::models::Job;

/// A job waiting in (or claimed from) the queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuedJob {
    pub id: Uuid,
    pub job: Job,
    pub enqueued_at: DateTime<Utc>,
    /// Why the job failed, once it has.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl QueuedJob {
    pub fn new(job: Job) -> Self {
        Self {
            id: Uuid::new_v4(),
            job,
            enqueued_at: Utc::now(),
            error: None,
        }
    }
}

/// How a claimed job ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ack {
    /// Completed or skipped; forget it.
    Done,
    /// Failed; keep it aside for an operator. Never redelivered.
    Failed(String),
}

/// Source of delete jobs.
///
/// Delivery is at-least-once: a job claimed with [`JobQueue::pop`] but never
/// acknowledged (the worker died) is delivered again after a restart.
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Append a job.
    async fn push(&self, job: Job) -> QueueResult<QueuedJob>;

    /// Claim the oldest pending job. Returns None if the queue is empty.
    async fn pop(&self) -> QueueResult<Option<QueuedJob>>;

    /// Settle a claimed job.
    async fn ack(&self, id: Uuid, ack: Ack) -> QueueResult<()>;

    /// Number of pending (unclaimed) jobs.
    async fn len(&self) -> QueueResult<u64>;

    async fn is_empty(&self) -> QueueResult<bool> {
        Ok(self.len().await? == 0)
    }
}
