//! Retention scheduler: periodically enqueue purge jobs.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::{
    config::RetentionConfig,
    models::Job,
    queue::{JobQueue, QueueResult, QueuedJob},
};

/// Starts the retention scheduler as a background task.
///
/// Enqueues a round of purge jobs immediately, then once per interval. It
/// runs until the task is cancelled.
pub async fn start_retention_worker(queue: Arc<dyn JobQueue>, config: RetentionConfig) {
    if !config.enabled {
        tracing::info!("Retention scheduler disabled by configuration");
        return;
    }

    if !config.has_any_retention() {
        tracing::info!("Retention scheduler enabled but no retention periods configured");
        return;
    }

    tracing::info!(
        interval_hours = config.interval_hours,
        executions_days = config.periods.executions_days,
        audit_days = config.periods.audit_days,
        abuse_days = config.periods.abuse_days,
        realtime_secs = config.periods.realtime_secs,
        "Starting retention scheduler"
    );

    let interval = config.interval();

    loop {
        match enqueue_purges(queue.as_ref(), &config, Utc::now()).await {
            Ok(jobs) => {
                tracing::info!(jobs = jobs.len(), "Retention purges enqueued");
            }
            Err(e) => {
                tracing::error!(error = %e, "Error enqueueing retention purges");
            }
        }

        tokio::time::sleep(interval).await;
    }
}

/// Push one purge job per enabled kind with its threshold as of `now`.
pub async fn enqueue_purges(
    queue: &dyn JobQueue,
    config: &RetentionConfig,
    now: DateTime<Utc>,
) -> QueueResult<Vec<QueuedJob>> {
    let mut queued = Vec::new();
    for (kind, threshold) in config.thresholds(now) {
        let job = queue.push(Job::purge(kind, threshold)).await?;
        tracing::debug!(job_id = %job.id, kind = %kind, threshold, "Enqueued purge");
        queued.push(job);
    }
    Ok(queued)
}
