//! Delete jobs: the cascades run when a resource is deleted, and the
//! time-threshold purges of aged records.
//!
//! Every job runs through [`dispatch`], which picks exactly one handler:
//!
//! - `document` jobs by the deleted resource's collection: projects drop the
//!   tenant, users lose credentials and memberships, functions lose tags,
//!   code bundles and executions, collections lose their documents, teams
//!   lose their memberships
//! - `executions`, `audit`, `abuse`, `realtime` purge records older than the
//!   job's timestamp
//! - `certificates` removes a domain's certificate directory
//!
//! Unknown job types and unknown collections complete as
//! [`Outcome::Skipped`] with a warning.
//!
//! Handlers are built from two paged walks, [`delete_by_group`] and
//! [`for_each_tenant`], both with pages of [`PAGE_SIZE`](crate::db::PAGE_SIZE).
//! Steps are committed one at a time; a failed job leaves its earlier steps
//! done and is safe to run again.

mod certificates;
mod context;
mod documents;
mod error;
mod functions;
mod group_delete;
mod projects;
mod purge;
mod report;
mod tenants;
mod users;

use std::time::Instant;

pub use context::{Dependencies, JobContext};
pub use error::{JobError, JobResult};
pub use group_delete::{OnDeleted, delete_by_group};
pub use report::{GroupDeleteReport, JobReport, Outcome};
pub use tenants::for_each_tenant;

use crate::models::{DocumentDelete, Job, Record, collections};

/// Resource collections with a cascade.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceKind {
    Project,
    User,
    Function,
    Collection,
    Team,
    /// Anything else; nothing depends on it.
    Other(String),
}

impl ResourceKind {
    pub fn of(record: &Record) -> Self {
        match record.collection.as_str() {
            collections::PROJECTS => Self::Project,
            collections::USERS => Self::User,
            collections::FUNCTIONS => Self::Function,
            collections::COLLECTIONS => Self::Collection,
            collections::TEAMS => Self::Team,
            other => Self::Other(other.to_string()),
        }
    }
}

/// Run one job in a fresh context.
pub async fn process(deps: &Dependencies, job: &Job) -> JobResult<Outcome> {
    let ctx = JobContext::new(deps.clone());
    let started = Instant::now();
    let result = dispatch(&ctx, job).await;
    let elapsed_ms = started.elapsed().as_millis() as u64;

    match &result {
        Ok(Outcome::Completed(report)) => tracing::info!(
            job_type = job.kind(),
            records_deleted = report.records_deleted,
            records_failed = report.records_failed,
            files_deleted = report.files_deleted,
            files_failed = report.files_failed,
            tenants = report.tenants,
            elapsed_ms,
            "Job complete"
        ),
        Ok(Outcome::Skipped { reason }) => {
            tracing::info!(job_type = job.kind(), reason = %reason, "Job skipped")
        }
        Err(e) => tracing::error!(job_type = job.kind(), error = %e, elapsed_ms, "Job failed"),
    }
    result
}

/// Parse a job from its JSON form and run it.
pub async fn process_json(deps: &Dependencies, input: &str) -> JobResult<Outcome> {
    let job = Job::from_json(input).map_err(|e| JobError::InvalidJob(e.to_string()))?;
    process(deps, &job).await
}

/// Route a job to its handler.
pub async fn dispatch(ctx: &JobContext, job: &Job) -> JobResult<Outcome> {
    let report = match job {
        Job::Document(delete) => return delete_resource(ctx, delete).await,
        Job::Purge(purge) => purge::purge(ctx, purge).await?,
        Job::Certificates(purge) => certificates::delete_certificates(ctx, purge).await?,
        Job::Unknown { kind } => {
            tracing::warn!(job_type = %kind, "Unknown job type, skipping");
            return Ok(Outcome::Skipped {
                reason: format!("unknown job type: {}", kind),
            });
        }
    };
    Ok(Outcome::Completed(report))
}

async fn delete_resource(ctx: &JobContext, delete: &DocumentDelete) -> JobResult<Outcome> {
    let document = &delete.document;
    let tenant = || {
        delete.tenant_id.as_deref().ok_or_else(|| JobError::MissingTenant {
            collection: document.collection.clone(),
            id: document.id.clone(),
        })
    };

    let report = match ResourceKind::of(document) {
        ResourceKind::Project => projects::delete_project(ctx, document).await?,
        ResourceKind::User => users::delete_user(ctx, tenant()?, document).await?,
        ResourceKind::Function => functions::delete_function(ctx, tenant()?, document).await?,
        ResourceKind::Collection => documents::delete_collection(ctx, tenant()?, document).await?,
        ResourceKind::Team => documents::delete_team(ctx, tenant()?, document).await?,
        ResourceKind::Other(collection) => {
            tracing::warn!(
                collection = %collection,
                id = %document.id,
                "No cascade for collection, skipping"
            );
            return Ok(Outcome::Skipped {
                reason: format!("unknown collection: {}", collection),
            });
        }
    };
    Ok(Outcome::Completed(report))
}
