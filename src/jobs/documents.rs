use super::{
    context::JobContext,
    error::JobResult,
    group_delete::delete_by_group,
    report::JobReport,
};
use crate::{
    db::Filter,
    models::{Namespace, Record, attributes, collections},
};

/// Remove every document of a deleted collection. Documents carry their
/// collection's id as their tag.
pub(super) async fn delete_collection(
    ctx: &JobContext,
    tenant: &str,
    collection: &Record,
) -> JobResult<JobReport> {
    let namespace = Namespace::tenant(tenant);
    let documents = delete_by_group(
        ctx.store(),
        ctx.gate(),
        &namespace,
        vec![Filter::collection(collection.id.as_str())],
        None,
    )
    .await?;

    tracing::info!(
        collection_id = %collection.id,
        namespace = %namespace,
        documents = documents.deleted,
        "Deleted collection documents"
    );
    Ok(documents.into())
}

/// Remove every membership of a deleted team.
pub(super) async fn delete_team(
    ctx: &JobContext,
    tenant: &str,
    team: &Record,
) -> JobResult<JobReport> {
    let namespace = Namespace::tenant(tenant);
    let memberships = delete_by_group(
        ctx.store(),
        ctx.gate(),
        &namespace,
        vec![
            Filter::collection(collections::MEMBERSHIPS),
            Filter::equal(attributes::TEAM_ID, team.id.as_str()),
        ],
        None,
    )
    .await?;

    tracing::info!(
        team_id = %team.id,
        namespace = %namespace,
        memberships = memberships.deleted,
        "Deleted team memberships"
    );
    Ok(memberships.into())
}
