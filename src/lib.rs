//! Cascading deletion worker for a multi-tenant document store.
//!
//! A delete job names either a removed resource (project, user, function,
//! collection, team), a retention threshold, or a certificate domain. The
//! worker removes everything that depended on it:
//!
//! - **Group deletes** page through a filtered record set and delete each
//!   record under a scoped elevated-access window ([`jobs::delete_by_group`]).
//! - **Tenant fan-out** walks every project in the console namespace and runs
//!   a per-tenant purge ([`jobs::for_each_tenant`]).
//! - **File cleanup** removes tenant storage trees, function code bundles and
//!   certificate directories without ever leaving their storage roots.
//!
//! The store, block storage and log-retention backends are traits
//! ([`db::Store`], [`storage::Device`], [`retention::RetentionLog`]) so the
//! worker can run against the in-memory store, the JSON file store, or any
//! other adapter.

pub mod config;
pub mod db;
pub mod jobs;
pub mod models;
#[cfg(feature = "cli")]
pub mod observability;
pub mod queue;
pub mod retention;
pub mod storage;

#[cfg(test)]
mod tests;
