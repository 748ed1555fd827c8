use std::{path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Local job spool.
///
/// ```toml
/// [queue]
/// path = "/var/lib/sweeper/queue"
/// poll_interval_ms = 1000
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct QueueConfig {
    /// Spool directory holding one JSON file per pending job.
    #[serde(default = "default_path")]
    pub path: PathBuf,

    /// How long an idle worker waits before checking the spool again.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            path: default_path(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

fn default_path() -> PathBuf {
    PathBuf::from("queue")
}

fn default_poll_interval_ms() -> u64 {
    1000
}

impl QueueConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.path.as_os_str().is_empty() {
            return Err(ConfigError::Validation("queue.path cannot be empty".into()));
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::Validation(
                "queue.poll_interval_ms must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}
