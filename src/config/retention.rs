//! Retention schedule configuration.
//!
//! When enabled, the maintenance loop enqueues one purge job per log kind
//! every `interval_hours`, each with the threshold `now - period`.
//!
//! # Example
//!
//! ```toml
//! [retention]
//! enabled = true
//! interval_hours = 24
//!
//! [retention.periods]
//! executions_days = 14
//! audit_days = 90
//! abuse_days = 1
//! realtime_secs = 60
//! ```

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::models::PurgeKind;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetentionConfig {
    /// Whether the maintenance loop enqueues purges.
    /// Default: false (must be explicitly enabled)
    #[serde(default)]
    pub enabled: bool,

    /// How often to enqueue a round of purges (in hours).
    /// Default: 24 (once per day)
    #[serde(default = "default_interval_hours")]
    pub interval_hours: u64,

    #[serde(default)]
    pub periods: RetentionPeriods,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_hours: default_interval_hours(),
            periods: RetentionPeriods::default(),
        }
    }
}

fn default_interval_hours() -> u64 {
    24
}

/// How long each kind of record is kept. Zero disables that purge.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetentionPeriods {
    /// Days to keep function execution records.
    /// Default: 14 days
    #[serde(default = "default_executions_days")]
    pub executions_days: u32,

    /// Days to keep audit log entries.
    /// Default: 90 days
    #[serde(default = "default_audit_days")]
    pub audit_days: u32,

    /// Days to keep abuse (rate limit) log entries.
    /// Default: 1 day
    #[serde(default = "default_abuse_days")]
    pub abuse_days: u32,

    /// Seconds a realtime connection record may go without a heartbeat.
    /// Default: 60 seconds
    #[serde(default = "default_realtime_secs")]
    pub realtime_secs: u64,
}

impl Default for RetentionPeriods {
    fn default() -> Self {
        Self {
            executions_days: default_executions_days(),
            audit_days: default_audit_days(),
            abuse_days: default_abuse_days(),
            realtime_secs: default_realtime_secs(),
        }
    }
}

fn default_executions_days() -> u32 {
    14
}

fn default_audit_days() -> u32 {
    90
}

fn default_abuse_days() -> u32 {
    1
}

fn default_realtime_secs() -> u64 {
    60
}

impl RetentionPeriods {
    /// Retention period for a purge kind, or `None` when it is disabled.
    pub fn period(&self, kind: PurgeKind) -> Option<Duration> {
        let period = match kind {
            PurgeKind::Executions => Duration::try_days(i64::from(self.executions_days))?,
            PurgeKind::Audit => Duration::try_days(i64::from(self.audit_days))?,
            PurgeKind::Abuse => Duration::try_days(i64::from(self.abuse_days))?,
            PurgeKind::Realtime => Duration::try_seconds(i64::try_from(self.realtime_secs).ok()?)?,
        };
        (period > Duration::zero()).then_some(period)
    }
}

impl RetentionConfig {
    /// Check if any purge kind has a non-zero period.
    pub fn has_any_retention(&self) -> bool {
        PurgeKind::ALL
            .into_iter()
            .any(|kind| self.periods.period(kind).is_some())
    }

    /// Get the scheduling interval as a Duration.
    pub fn interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.interval_hours * 3600)
    }

    /// Purge thresholds (unix seconds) for every enabled kind as of `now`.
    pub fn thresholds(&self, now: DateTime<Utc>) -> Vec<(PurgeKind, i64)> {
        PurgeKind::ALL
            .into_iter()
            .filter_map(|kind| {
                let period = self.periods.period(kind)?;
                let threshold = now.checked_sub_signed(period)?.timestamp();
                (threshold > 0).then_some((kind, threshold))
            })
            .collect()
    }
}
