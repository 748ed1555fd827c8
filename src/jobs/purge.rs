//! Time-threshold purges of aged records.

use super::{
    context::JobContext,
    error::{JobError, JobResult},
    group_delete::delete_by_group,
    report::JobReport,
    tenants::for_each_tenant,
};
use crate::{
    db::Filter,
    models::{Namespace, PurgeJob, PurgeKind, attributes, collections},
    retention::RetentionLog,
};

pub(super) async fn purge(ctx: &JobContext, job: &PurgeJob) -> JobResult<JobReport> {
    match job.kind {
        PurgeKind::Executions => purge_executions(ctx, job.timestamp).await,
        PurgeKind::Audit => purge_log(ctx, ctx.audit_log(), job).await,
        PurgeKind::Abuse => purge_log(ctx, ctx.abuse_log(), job).await,
        PurgeKind::Realtime => purge_realtime(ctx, job.timestamp).await,
    }
}

/// Execution records created before `before`, in every tenant.
async fn purge_executions(ctx: &JobContext, before: i64) -> JobResult<JobReport> {
    for_each_tenant(ctx, |tenant| async move {
        let group = delete_by_group(
            ctx.store(),
            ctx.gate(),
            &Namespace::tenant(tenant),
            vec![
                Filter::collection(collections::EXECUTIONS),
                Filter::less_than(attributes::CREATED_AT, before),
            ],
            None,
        )
        .await?;
        Ok(group.into())
    })
    .await
}

/// Audit or abuse entries older than the threshold, in every tenant.
///
/// A zero threshold is refused before any tenant is visited, and the first
/// tenant whose cleanup fails stops the walk.
async fn purge_log(
    ctx: &JobContext,
    log: &dyn RetentionLog,
    job: &PurgeJob,
) -> JobResult<JobReport> {
    if job.timestamp == 0 {
        return Err(JobError::MissingTimestamp { kind: job.kind });
    }
    let before = job.timestamp;
    let name = log.name();

    for_each_tenant(ctx, |tenant| async move {
        let namespace = Namespace::tenant(tenant.as_str());
        match log.cleanup(&namespace, before).await {
            Ok(true) => {
                tracing::debug!(log = name, tenant = %tenant, before, "Log cleanup complete");
                Ok(JobReport::default())
            }
            Ok(false) => {
                tracing::error!(log = name, tenant = %tenant, before, "Log cleanup failed");
                Err(JobError::log_purge(name, &tenant, "cleanup did not complete"))
            }
            Err(e) => {
                tracing::error!(log = name, tenant = %tenant, before, error = %e, "Log cleanup failed");
                Err(JobError::log_purge(name, &tenant, e))
            }
        }
    })
    .await
}

/// Realtime connection records last seen before `before`, console only.
async fn purge_realtime(ctx: &JobContext, before: i64) -> JobResult<JobReport> {
    let group = delete_by_group(
        ctx.store(),
        ctx.gate(),
        &Namespace::Console,
        vec![
            Filter::collection(collections::REALTIME_CONNECTIONS),
            Filter::less_than(attributes::TIMESTAMP, before),
        ],
        None,
    )
    .await?;
    Ok(group.into())
}
