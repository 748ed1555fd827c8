use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Record store configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
#[serde(deny_unknown_fields)]
pub enum DatabaseConfig {
    /// In-process store. Everything is lost on exit; local testing only.
    #[default]
    Memory,

    /// One JSON file per record under `path/{namespace}/`.
    File {
        /// Root directory of the store. Created if missing.
        path: PathBuf,
    },
}

impl DatabaseConfig {
    pub fn is_persistent(&self) -> bool {
        !matches!(self, DatabaseConfig::Memory)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            DatabaseConfig::Memory => Ok(()),
            DatabaseConfig::File { path } => {
                if path.as_os_str().is_empty() {
                    return Err(ConfigError::Validation(
                        "database.path cannot be empty".into(),
                    ));
                }
                Ok(())
            }
        }
    }
}
