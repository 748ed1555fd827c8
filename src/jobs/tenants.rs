use std::future::Future;

use super::{
    context::JobContext,
    error::JobResult,
    report::JobReport,
};
use crate::{
    db::{Filter, ListQuery},
    models::{Namespace, collections},
};

/// Run `visit` once for every tenant, in tenant id order.
///
/// Walks the project list in the console namespace with the same paging as
/// [`delete_by_group`](super::delete_by_group), without deleting anything.
/// Each page fetch runs in its own short elevated window that is closed
/// before any callback runs, so callbacks are free to open their own.
///
/// The first callback error stops the walk and is returned.
pub async fn for_each_tenant<F, Fut>(ctx: &JobContext, mut visit: F) -> JobResult<JobReport>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = JobResult<JobReport>>,
{
    let mut query = ListQuery::new(vec![Filter::collection(collections::PROJECTS)]);
    let mut report = JobReport::default();
    let mut chunk = 0u64;

    loop {
        let page = {
            let elevated = ctx.gate().elevate()?;
            ctx.store()
                .list(&Namespace::Console, &query, elevated.access())
                .await?
        };
        if page.is_empty() {
            break;
        }
        chunk += 1;

        tracing::info!(chunk, found = page.len(), "Processing chunk of tenants");

        for project in &page {
            let visited = visit(project.id.clone()).await?;
            report.merge(visited);
            report.tenants += 1;
        }

        if page.len() < query.limit {
            break;
        }
        query.after = page.last().map(|project| project.id.clone());
    }

    tracing::debug!(tenants = report.tenants, chunks = chunk, "Tenant walk complete");
    Ok(report)
}
