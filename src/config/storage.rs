//! Block storage roots.
//!
//! # Example
//!
//! ```toml
//! [storage]
//! uploads = "/storage/uploads"
//! cache = "/storage/cache"
//! functions = "/storage/functions"
//! certificates = "/storage/certificates"
//! ```
//!
//! Tenant trees live at `{root}/app-{tenant}`; certificates at
//! `{certificates}/{domain}`.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::ConfigError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Root of the per-tenant upload trees.
    #[serde(default = "default_uploads")]
    pub uploads: PathBuf,

    /// Root of the per-tenant cache trees.
    #[serde(default = "default_cache")]
    pub cache: PathBuf,

    /// Root of the per-tenant function code bundles.
    #[serde(default = "default_functions")]
    pub functions: PathBuf,

    /// Root of the per-domain certificate directories.
    #[serde(default = "default_certificates")]
    pub certificates: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            uploads: default_uploads(),
            cache: default_cache(),
            functions: default_functions(),
            certificates: default_certificates(),
        }
    }
}

fn default_uploads() -> PathBuf {
    PathBuf::from("/storage/uploads")
}

fn default_cache() -> PathBuf {
    PathBuf::from("/storage/cache")
}

fn default_functions() -> PathBuf {
    PathBuf::from("/storage/functions")
}

fn default_certificates() -> PathBuf {
    PathBuf::from("/storage/certificates")
}

impl StorageConfig {
    /// All roots under one base directory, as `{base}/uploads` etc.
    pub fn under(base: impl Into<PathBuf>) -> Self {
        let base = base.into();
        Self {
            uploads: base.join("uploads"),
            cache: base.join("cache"),
            functions: base.join("functions"),
            certificates: base.join("certificates"),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, root) in [
            ("uploads", &self.uploads),
            ("cache", &self.cache),
            ("functions", &self.functions),
            ("certificates", &self.certificates),
        ] {
            if root.as_os_str().is_empty() {
                return Err(ConfigError::Validation(format!(
                    "storage.{} cannot be empty",
                    name
                )));
            }
            // Tenant trees are deleted recursively; never let a root be `/`.
            if root.parent().is_none() {
                return Err(ConfigError::Validation(format!(
                    "storage.{} cannot be the filesystem root",
                    name
                )));
            }
        }
        Ok(())
    }
}
