use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use tracing::{debug, instrument};

use super::{Device, StorageResult};

/// Local filesystem device.
#[derive(Debug, Clone)]
pub struct LocalDevice {
    root: PathBuf,
}

impl LocalDevice {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl Device for LocalDevice {
    fn root(&self) -> &Path {
        &self.root
    }

    #[instrument(skip(self), fields(root = %self.root.display()))]
    async fn delete(&self, path: &Path, recursive: bool) -> StorageResult<bool> {
        let path = self.resolve(path)?;
        let metadata = match tokio::fs::symlink_metadata(&path).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "Nothing to delete");
                return Ok(false);
            }
            Err(e) => return Err(e.into()),
        };

        let result = if !metadata.is_dir() {
            tokio::fs::remove_file(&path).await
        } else if recursive {
            tokio::fs::remove_dir_all(&path).await
        } else {
            tokio::fs::remove_dir(&path).await
        };

        match result {
            Ok(()) => {
                debug!(path = %path.display(), "Deleted");
                Ok(true)
            }
            // Removed by someone else in between.
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, path: &Path) -> StorageResult<bool> {
        let path = self.resolve(path)?;
        Ok(tokio::fs::try_exists(&path).await?)
    }

    async fn is_dir(&self, path: &Path) -> StorageResult<bool> {
        let path = self.resolve(path)?;
        match tokio::fs::metadata(&path).await {
            Ok(metadata) => Ok(metadata.is_dir()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn real_path(&self, path: &Path) -> StorageResult<Option<PathBuf>> {
        let path = self.resolve(path)?;
        match tokio::fs::canonicalize(&path).await {
            Ok(real) => Ok(Some(real)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn files(&self, dir: &Path) -> StorageResult<Vec<PathBuf>> {
        let mut entries = tokio::fs::read_dir(self.resolve(dir)?).await?;
        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_file() {
                files.push(dir.join(entry.file_name()));
            }
        }
        files.sort();
        Ok(files)
    }

    fn backend_name(&self) -> &'static str {
        "local"
    }
}
