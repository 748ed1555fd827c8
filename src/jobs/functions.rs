use std::path::Path;

use async_trait::async_trait;

use super::{
    context::JobContext,
    error::JobResult,
    group_delete::{OnDeleted, delete_by_group},
    report::JobReport,
};
use crate::{
    db::{Access, Filter},
    models::{Namespace, Record, attributes, collections},
    storage::{Device, LocalDevice},
};

/// Remove a function's tags with their code bundles, then its executions.
pub(super) async fn delete_function(
    ctx: &JobContext,
    tenant: &str,
    function: &Record,
) -> JobResult<JobReport> {
    let namespace = Namespace::tenant(tenant);
    let mut report = JobReport::default();

    let mut bundles = CodeBundles::new(ctx.functions(tenant)?);
    let tags = delete_by_group(
        ctx.store(),
        ctx.gate(),
        &namespace,
        vec![
            Filter::collection(collections::TAGS),
            Filter::equal(attributes::FUNCTION_ID, function.id.as_str()),
        ],
        Some(&mut bundles),
    )
    .await?;
    report.absorb(&tags);
    report.files_deleted += bundles.deleted;
    report.files_failed += bundles.failed;

    let executions = delete_by_group(
        ctx.store(),
        ctx.gate(),
        &namespace,
        vec![
            Filter::collection(collections::EXECUTIONS),
            Filter::equal(attributes::FUNCTION_ID, function.id.as_str()),
        ],
        None,
    )
    .await?;
    report.absorb(&executions);

    tracing::info!(
        function_id = %function.id,
        namespace = %namespace,
        tags = tags.deleted,
        bundles_deleted = bundles.deleted,
        bundles_failed = bundles.failed,
        executions = executions.deleted,
        "Deleted function"
    );

    Ok(report)
}

/// Deletes the code bundle a removed tag points at.
struct CodeBundles {
    device: LocalDevice,
    deleted: u64,
    failed: u64,
}

impl CodeBundles {
    fn new(device: LocalDevice) -> Self {
        Self {
            device,
            deleted: 0,
            failed: 0,
        }
    }
}

#[async_trait]
impl OnDeleted for CodeBundles {
    async fn on_deleted(&mut self, tag: &Record, _access: Access<'_>) {
        let Some(path) = tag.str_attribute(attributes::PATH).filter(|p| !p.is_empty()) else {
            tracing::debug!(tag_id = %tag.id, "Tag has no code bundle");
            return;
        };

        // Tags store the bundle's full path on the device.
        let path = Path::new(path);
        let relative = path.strip_prefix(self.device.root()).unwrap_or(path);

        match self.device.delete(relative, false).await {
            Ok(true) => {
                self.deleted += 1;
                tracing::info!(tag_id = %tag.id, path = %path.display(), "Deleted code bundle");
            }
            Ok(false) => {
                self.failed += 1;
                tracing::error!(
                    tag_id = %tag.id,
                    path = %path.display(),
                    "Failed to delete code bundle: not found"
                );
            }
            Err(e) => {
                self.failed += 1;
                tracing::error!(
                    tag_id = %tag.id,
                    path = %path.display(),
                    error = %e,
                    "Failed to delete code bundle"
                );
            }
        }
    }
}
