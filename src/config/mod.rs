//! Configuration for the deletes worker.
//!
//! The worker is configured via a TOML file, with support for environment
//! variable interpolation using `${VAR_NAME}` syntax.
//!
//! # Example
//!
//! ```toml
//! [database]
//! type = "file"
//! path = "${SWEEPER_DATA}/records"
//!
//! [storage]
//! uploads = "/storage/uploads"
//! cache = "/storage/cache"
//!
//! [queue]
//! path = "/var/lib/sweeper/queue"
//!
//! [observability.logging]
//! level = "debug"
//! format = "json"
//! ```

mod database;
mod observability;
mod queue;
mod retention;
mod storage;

use std::path::Path;

pub use database::*;
pub use observability::*;
pub use queue::*;
pub use retention::*;
use serde::{Deserialize, Serialize};
pub use storage::*;

/// Root configuration. Every section is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SweeperConfig {
    /// Record store backend.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Block storage roots.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Local job spool.
    #[serde(default)]
    pub queue: QueueConfig,

    /// Scheduled retention purges.
    #[serde(default)]
    pub retention: RetentionConfig,

    /// Logging.
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl SweeperConfig {
    /// Load configuration from a TOML file.
    ///
    /// Environment variables in the format `${VAR_NAME}` are expanded.
    /// Missing variables cause an error.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::Io(e, path.as_ref().to_path_buf()))?;

        Self::from_str(&contents)
    }

    /// Parse configuration from a TOML string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(contents: &str) -> Result<Self, ConfigError> {
        let expanded = expand_env_vars(contents)?;
        let config: SweeperConfig = toml::from_str(&expanded).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration for consistency and completeness.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.database.validate()?;
        self.storage.validate()?;
        self.queue.validate()?;

        if self.retention.enabled {
            if self.retention.interval_hours == 0 {
                return Err(ConfigError::Validation(
                    "retention.interval_hours must be greater than zero".into(),
                ));
            }
            if !self.retention.has_any_retention() {
                tracing::warn!("Retention is enabled but every period is zero; nothing will be purged");
            }
        }

        if !self.database.is_persistent() {
            tracing::warn!(
                "database.type = \"memory\": records are not shared with any other process"
            );
        }

        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {1}: {0}")]
    Io(std::io::Error, std::path::PathBuf),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),

    #[error("Configuration validation error: {0}")]
    Validation(String),
}

/// Expand `${VAR}` references, leaving anything after a `#` on a line alone.
fn expand_env_vars(input: &str) -> Result<String, ConfigError> {
    let re = regex::Regex::new(r"\$\{([^}]+)\}")
        .map_err(|e| ConfigError::Validation(e.to_string()))?;
    let mut result = String::with_capacity(input.len());

    for line in input.lines() {
        let comment_pos = line.find('#');
        let mut last_end = 0;

        for cap in re.captures_iter(line) {
            let Some(whole) = cap.get(0) else {
                continue;
            };

            if let Some(pos) = comment_pos
                && whole.start() >= pos
            {
                continue;
            }

            result.push_str(&line[last_end..whole.start()]);

            let var_name = &cap[1];
            let value = std::env::var(var_name)
                .map_err(|_| ConfigError::EnvVarNotFound(var_name.to_string()))?;
            result.push_str(&value);

            last_end = whole.end();
        }

        result.push_str(&line[last_end..]);
        result.push('\n');
    }

    // Remove trailing newline if input didn't have one
    if !input.ends_with('\n') && result.ends_with('\n') {
        result.pop();
    }

    Ok(result)
}
