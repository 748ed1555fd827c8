//! Deletes worker: drain the queue, run each job, settle it.

use std::{sync::Arc, time::Duration};

use tracing::Instrument;

use super::{
    error::QueueResult,
    traits::{Ack, JobQueue},
};
use crate::jobs::{self, Dependencies, Outcome};

/// Results from one drain of the queue.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WorkerRunResult {
    pub completed: u64,
    pub skipped: u64,
    pub failed: u64,
}

impl WorkerRunResult {
    pub fn total(&self) -> u64 {
        self.completed + self.skipped + self.failed
    }
}

/// Runs the deletes worker until the task is cancelled.
///
/// Drains every pending job, then sleeps for `poll_interval` before looking
/// again. Queue errors are logged and retried on the next tick.
pub async fn start_deletes_worker(
    queue: Arc<dyn JobQueue>,
    deps: Dependencies,
    poll_interval: Duration,
) {
    tracing::info!(
        poll_interval_ms = poll_interval.as_millis() as u64,
        store = deps.store.backend_name(),
        "Starting deletes worker"
    );

    loop {
        match run_pending(queue.as_ref(), &deps).await {
            Ok(result) if result.total() > 0 => {
                tracing::info!(
                    completed = result.completed,
                    skipped = result.skipped,
                    failed = result.failed,
                    "Deletes batch complete"
                );
            }
            Ok(_) => {}
            Err(e) => {
                tracing::error!(error = %e, "Error draining deletes queue");
            }
        }

        tokio::time::sleep(poll_interval).await;
    }
}

/// Claim and run jobs one at a time until the queue is empty.
pub async fn run_pending(queue: &dyn JobQueue, deps: &Dependencies) -> QueueResult<WorkerRunResult> {
    let mut result = WorkerRunResult::default();

    while let Some(queued) = queue.pop().await? {
        let span = tracing::info_span!("job", job_id = %queued.id, job_type = %queued.job.kind());
        let ack = match jobs::process(deps, &queued.job).instrument(span).await {
            Ok(Outcome::Completed(_)) => {
                result.completed += 1;
                Ack::Done
            }
            Ok(Outcome::Skipped { .. }) => {
                result.skipped += 1;
                Ack::Done
            }
            Err(e) => {
                result.failed += 1;
                Ack::Failed(e.to_string())
            }
        };
        queue.ack(queued.id, ack).await?;
    }

    Ok(result)
}
