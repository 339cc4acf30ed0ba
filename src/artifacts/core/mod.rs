//! Shared path utilities
//!
//! Repository paths are ordered by their raw bytes, the way git orders index
//! entries and tree listings. `Path`'s own ordering compares components, which
//! disagrees with git whenever a name contains a byte smaller than `/`
//! (`a.txt` sorts before `a/b` in git, after it in `Path`).

use std::cmp::Ordering;
use std::path::{Path, PathBuf};

/// Compare two repository paths by their byte representation.
pub fn byte_order(left: &Path, right: &Path) -> Ordering {
    left.as_os_str()
        .as_encoded_bytes()
        .cmp(right.as_os_str().as_encoded_bytes())
}

/// Repository-relative path rendered with `/` separators.
pub fn slash_path(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Owned path that sorts in byte order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathKey(PathBuf);

impl PathKey {
    pub fn as_path(&self) -> &Path {
        &self.0
    }

    pub fn into_path_buf(self) -> PathBuf {
        self.0
    }
}

impl From<&Path> for PathKey {
    fn from(path: &Path) -> Self {
        PathKey(path.to_path_buf())
    }
}

impl From<PathBuf> for PathKey {
    fn from(path: PathBuf) -> Self {
        PathKey(path)
    }
}

impl Ord for PathKey {
    fn cmp(&self, other: &Self) -> Ordering {
        byte_order(&self.0, &other.0)
    }
}

impl PartialOrd for PathKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
