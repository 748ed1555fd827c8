//! The deletes queue: where delete jobs wait until a worker claims them.
//!
//! Jobs are delivered at least once. The worker acknowledges each claimed
//! job after it ran: completed and skipped jobs are dropped, failed jobs are
//! set aside with their error and never retried automatically.

mod error;
mod file;
mod traits;
mod worker;

use std::sync::Arc;

pub use error::{QueueError, QueueResult};
pub use file::FileJobQueue;
pub use traits::{Ack, JobQueue, QueuedJob};
pub use worker::{WorkerRunResult, run_pending, start_deletes_worker};

use crate::config::QueueConfig;

/// Open the configured queue.
pub async fn create_queue(config: &QueueConfig) -> QueueResult<Arc<dyn JobQueue>> {
    tracing::info!(path = %config.path.display(), "Using file job queue");
    Ok(Arc::new(FileJobQueue::new(&config.path).await?))
}
