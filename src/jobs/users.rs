use async_trait::async_trait;

use super::{
    context::JobContext,
    error::{JobError, JobResult},
    group_delete::{OnDeleted, delete_by_group},
    report::JobReport,
};
use crate::{
    db::{Access, Filter, Store},
    models::{Namespace, Record, attributes, collections},
};

/// Remove a user's credentials, then their memberships.
///
/// Tokens and sessions go first and strictly: the first one that fails to
/// delete aborts the job before any membership is touched. Memberships are a
/// tolerant group delete; each confirmed one decrements its team's counter.
pub(super) async fn delete_user(
    ctx: &JobContext,
    tenant: &str,
    user: &Record,
) -> JobResult<JobReport> {
    let namespace = Namespace::tenant(tenant);
    let mut report = delete_credentials(ctx, &namespace, user).await?;

    let mut counters = TeamCounters::new(ctx.store(), namespace.clone());
    let memberships = delete_by_group(
        ctx.store(),
        ctx.gate(),
        &namespace,
        vec![
            Filter::collection(collections::MEMBERSHIPS),
            Filter::equal(attributes::USER_ID, user.id.as_str()),
        ],
        Some(&mut counters),
    )
    .await?;
    report.absorb(&memberships);

    tracing::info!(
        user_id = %user.id,
        namespace = %namespace,
        memberships = memberships.deleted,
        teams_updated = counters.decremented,
        teams_missing = counters.missing,
        "Deleted user"
    );

    Ok(report)
}

async fn delete_credentials(
    ctx: &JobContext,
    namespace: &Namespace,
    user: &Record,
) -> JobResult<JobReport> {
    let mut report = JobReport::default();
    let elevated = ctx.gate().elevate()?;

    for (collection, attribute) in [
        (collections::TOKENS, attributes::TOKENS),
        (collections::SESSIONS, attributes::SESSIONS),
    ] {
        for id in user.child_ids(attribute) {
            match ctx.store().delete(namespace, &id, elevated.access()).await {
                Ok(removed) => {
                    if removed {
                        report.records_deleted += 1;
                    }
                    tracing::debug!(user_id = %user.id, collection, id = %id, removed, "Deleted credential");
                }
                Err(source) => {
                    tracing::error!(
                        user_id = %user.id,
                        collection,
                        id = %id,
                        error = %source,
                        "Failed to delete credential, aborting"
                    );
                    return Err(JobError::CredentialDelete {
                        user_id: user.id.clone(),
                        collection,
                        id,
                        source,
                    });
                }
            }
        }
    }

    Ok(report)
}

/// Decrements `memberCount` on the team of each confirmed membership removed.
struct TeamCounters<'a> {
    store: &'a dyn Store,
    namespace: Namespace,
    decremented: u64,
    missing: u64,
}

impl<'a> TeamCounters<'a> {
    fn new(store: &'a dyn Store, namespace: Namespace) -> Self {
        Self {
            store,
            namespace,
            decremented: 0,
            missing: 0,
        }
    }
}

#[async_trait]
impl OnDeleted for TeamCounters<'_> {
    async fn on_deleted(&mut self, membership: &Record, access: Access<'_>) {
        if !membership.flag(attributes::CONFIRMED) {
            return;
        }
        let Some(team_id) = membership.str_attribute(attributes::TEAM_ID) else {
            tracing::warn!(membership_id = %membership.id, "Confirmed membership has no team");
            return;
        };

        let mut team = match self.store.get(&self.namespace, team_id, access).await {
            Ok(Some(team)) => team,
            Ok(None) => {
                self.missing += 1;
                tracing::debug!(team_id, "Team already gone, skipping member count");
                return;
            }
            Err(e) => {
                tracing::error!(team_id, error = %e, "Failed to load team");
                return;
            }
        };

        let count = match team.attribute(attributes::MEMBER_COUNT) {
            None => 0,
            Some(_) => match team.int_attribute(attributes::MEMBER_COUNT) {
                Some(count) => count,
                None => {
                    tracing::warn!(team_id, "Team member count is not an integer, leaving it");
                    return;
                }
            },
        };
        team.set_attribute(attributes::MEMBER_COUNT, count.saturating_sub(1).max(0));

        match self.store.update(&self.namespace, team, access).await {
            Ok(_) => self.decremented += 1,
            Err(e) => {
                tracing::error!(team_id, error = %e, "Failed to update team member count");
            }
        }
    }
}
