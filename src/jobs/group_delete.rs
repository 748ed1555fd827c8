//! Grouped bulk delete: remove every record matching a filter set, one page
//! at a time.

use std::time::Instant;

use async_trait::async_trait;

use super::report::GroupDeleteReport;
use crate::{
    db::{Access, AccessGate, Filter, ListQuery, Store, StoreResult},
    models::{Namespace, Record},
};

/// Side effect run for each record a group delete removed.
///
/// Runs inside the delete's elevated window; `access` is that window.
/// Failures inside a hook are the hook's to log; they never stop the group.
#[async_trait]
pub trait OnDeleted: Send {
    async fn on_deleted(&mut self, record: &Record, access: Access<'_>);
}

/// Delete every record in `namespace` matching all `filters`.
///
/// Pages of [`PAGE_SIZE`](crate::db::PAGE_SIZE) records are fetched in id
/// order. Each page resumes strictly after the last id of the previous one,
/// so records that refuse to die are not fetched twice. The walk ends on the
/// first page shorter than a full page.
///
/// An elevated window is held on `gate` for the whole call and released on
/// every exit path. A record whose delete fails is logged and counted in
/// [`GroupDeleteReport::failed`]; only a failed page fetch aborts the call.
pub async fn delete_by_group(
    store: &dyn Store,
    gate: &AccessGate,
    namespace: &Namespace,
    filters: Vec<Filter>,
    mut on_deleted: Option<&mut dyn OnDeleted>,
) -> StoreResult<GroupDeleteReport> {
    let started = Instant::now();
    let elevated = gate.elevate()?;
    let access = elevated.access();

    let mut query = ListQuery::new(filters);
    let description = query.describe();
    let mut report = GroupDeleteReport::default();

    loop {
        let page = store.list(namespace, &query, access).await?;
        if page.is_empty() {
            break;
        }
        report.pages += 1;

        tracing::info!(
            namespace = %namespace,
            filters = %description,
            chunk = report.pages,
            found = page.len(),
            "Deleting chunk of records"
        );

        for record in &page {
            match store.delete(namespace, &record.id, access).await {
                Ok(true) => {
                    report.deleted += 1;
                    tracing::debug!(
                        namespace = %namespace,
                        id = %record.id,
                        collection = %record.collection,
                        "Deleted record"
                    );
                    if let Some(hook) = on_deleted.as_deref_mut() {
                        hook.on_deleted(record, access).await;
                    }
                }
                Ok(false) => {
                    tracing::debug!(
                        namespace = %namespace,
                        id = %record.id,
                        "Record already gone"
                    );
                }
                Err(e) => {
                    report.failed += 1;
                    tracing::error!(
                        namespace = %namespace,
                        id = %record.id,
                        collection = %record.collection,
                        error = %e,
                        "Failed to delete record"
                    );
                }
            }
        }

        if page.len() < query.limit {
            break;
        }
        query.after = page.last().map(|record| record.id.clone());
    }

    report.elapsed = started.elapsed();
    tracing::info!(
        namespace = %namespace,
        filters = %description,
        pages = report.pages,
        deleted = report.deleted,
        failed = report.failed,
        elapsed_ms = report.elapsed.as_millis() as u64,
        "Group delete complete"
    );

    Ok(report)
}
