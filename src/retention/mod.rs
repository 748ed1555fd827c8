//! Data retention: the log adapters purges go through, and the scheduler
//! that enqueues purge jobs.
//!
//! The scheduler does no deleting itself. Every `interval_hours` it computes
//! a threshold for each purge kind with a non-zero period and pushes one
//! purge job per kind onto the deletes queue; the deletes worker runs them
//! like any other job.

mod log;
mod worker;

pub use log::{LogError, RetentionLog, StoreRetentionLog};
pub use worker::{enqueue_purges, start_retention_worker};
