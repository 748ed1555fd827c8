//! Block storage used by the cascades: tenant upload, cache and function code
//! trees, and per-domain certificate directories.
//!
//! A [`Device`] is rooted at one directory. Paths handed to it are relative
//! to that root (absolute paths are accepted if they stay inside it), and
//! anything that lexically escapes the root is rejected with
//! [`StorageError::OutsideRoot`] before the filesystem is touched.

mod local;

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
pub use local::LocalDevice;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Path {} escapes storage root {}", path.display(), root.display())]
    OutsideRoot { root: PathBuf, path: PathBuf },

    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// A file tree rooted at one directory.
#[async_trait]
pub trait Device: Send + Sync {
    /// The directory every path is resolved against.
    fn root(&self) -> &Path;

    /// Resolve `path` against the root without touching the filesystem.
    fn resolve(&self, path: &Path) -> StorageResult<PathBuf> {
        let root = normalize(self.root());
        let joined = normalize(&root.join(path));
        if joined.starts_with(&root) && !escapes(&root.join(path)) {
            Ok(joined)
        } else {
            Err(StorageError::OutsideRoot {
                root,
                path: path.to_path_buf(),
            })
        }
    }

    /// Delete a file, or a directory (with its contents when `recursive`).
    /// `Ok(false)` means nothing was there.
    async fn delete(&self, path: &Path, recursive: bool) -> StorageResult<bool>;

    async fn exists(&self, path: &Path) -> StorageResult<bool>;

    async fn is_dir(&self, path: &Path) -> StorageResult<bool>;

    /// Canonical location of `path` with symlinks resolved, or `None` when it
    /// does not exist.
    async fn real_path(&self, path: &Path) -> StorageResult<Option<PathBuf>>;

    /// Regular files directly inside a directory, as `dir`-prefixed paths
    /// relative to the root.
    async fn files(&self, dir: &Path) -> StorageResult<Vec<PathBuf>>;

    /// Backend name for logs.
    fn backend_name(&self) -> &'static str;
}

/// Lexically collapse `.` and `..` components.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Whether a `..` would climb above the start of the path. `normalize` clamps
/// at the filesystem root, so this catches `/../..` style inputs it hides.
fn escapes(path: &Path) -> bool {
    let mut depth = 0usize;
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir | Component::CurDir => {}
            Component::ParentDir => match depth.checked_sub(1) {
                Some(d) => depth = d,
                None => return true,
            },
            Component::Normal(_) => depth += 1,
        }
    }
    false
}
