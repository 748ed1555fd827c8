use std::path::Path;

use super::{context::JobContext, error::JobResult, report::JobReport};
use crate::{
    models::{Namespace, Record},
    storage::Device,
};

/// A project is a tenant: drop its namespace, then its upload and cache trees.
pub(super) async fn delete_project(ctx: &JobContext, project: &Record) -> JobResult<JobReport> {
    let mut report = JobReport::default();
    let namespace = Namespace::tenant(&project.id);

    let dropped = ctx.store().drop_namespace(&namespace).await?;
    tracing::info!(
        project_id = %project.id,
        namespace = %namespace,
        dropped,
        "Dropped project namespace"
    );

    for (tree, device) in [
        ("uploads", ctx.uploads(&project.id)?),
        ("cache", ctx.cache(&project.id)?),
    ] {
        if device.delete(Path::new(""), true).await? {
            report.files_deleted += 1;
            tracing::info!(
                project_id = %project.id,
                tree,
                path = %device.root().display(),
                "Deleted project storage"
            );
        } else {
            tracing::debug!(
                project_id = %project.id,
                tree,
                path = %device.root().display(),
                "No project storage to delete"
            );
        }
    }

    Ok(report)
}
