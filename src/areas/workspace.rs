//! Working directory primitives
//!
//! Thin wrappers over the filesystem, rooted at the directory checkout
//! writes to. Paths passed in are relative to that root. The helpers never
//! follow symlinks: a symlink in the working tree is observed and replaced as
//! a link.

use crate::artifacts::index::entry_mode::EntryMode;
use crate::artifacts::index::index_entry::EntryMetadata;
use bytes::Bytes;
use std::fs::Metadata;
use std::io::{self, Write};
use std::os::unix::ffi::OsStrExt;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

const GIT_DIR_NAME: &str = ".git";

#[derive(Debug, Clone)]
pub struct Workspace {
    path: Box<Path>,
}

impl Workspace {
    pub fn new(path: Box<Path>) -> Self {
        Workspace { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn abs_path(&self, file_path: &Path) -> PathBuf {
        self.path.join(file_path)
    }

    /// `lstat` a path; a missing entry (or a parent that is not a directory)
    /// yields `None`.
    pub fn lstat(&self, file_path: &Path) -> io::Result<Option<Metadata>> {
        match std::fs::symlink_metadata(self.abs_path(file_path)) {
            Ok(metadata) => Ok(Some(metadata)),
            Err(e) if matches!(e.kind(), io::ErrorKind::NotFound | io::ErrorKind::NotADirectory) => {
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    pub fn stat_entry(&self, file_path: &Path) -> anyhow::Result<Option<EntryMetadata>> {
        match self.lstat(file_path)? {
            Some(metadata) => {
                let abs_path = self.abs_path(file_path);
                Ok(Some((abs_path.as_path(), metadata).try_into()?))
            }
            None => Ok(None),
        }
    }

    /// Bytes a blob of the given mode would hash over: file content, or the
    /// link target for symlinks.
    pub fn read_content(&self, file_path: &Path, mode: EntryMode) -> io::Result<Bytes> {
        let abs_path = self.abs_path(file_path);

        if mode.is_symlink() {
            let target = std::fs::read_link(abs_path)?;
            Ok(Bytes::copy_from_slice(target.as_os_str().as_bytes()))
        } else {
            std::fs::read(abs_path).map(Bytes::from)
        }
    }

    /// Write blob content in place, truncating any existing regular file.
    pub fn write_file(&self, file_path: &Path, data: &[u8]) -> io::Result<()> {
        let mut file = std::fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(self.abs_path(file_path))?;

        file.write_all(data)
    }

    pub fn create_symlink(&self, file_path: &Path, target: &[u8]) -> io::Result<()> {
        let target = std::ffi::OsStr::from_bytes(target);
        std::os::unix::fs::symlink(target, self.abs_path(file_path))
    }

    pub fn set_mode(&self, file_path: &Path, mode: EntryMode) -> io::Result<()> {
        use std::os::unix::fs::PermissionsExt;

        let bits = if mode.is_executable() { 0o755 } else { 0o644 };
        std::fs::set_permissions(
            self.abs_path(file_path),
            std::fs::Permissions::from_mode(bits),
        )
    }

    pub fn make_directory(&self, dir_path: &Path) -> io::Result<()> {
        std::fs::create_dir(self.abs_path(dir_path))
    }

    pub fn remove_file(&self, file_path: &Path) -> io::Result<()> {
        std::fs::remove_file(self.abs_path(file_path))
    }

    pub fn remove_directory_all(&self, dir_path: &Path) -> io::Result<()> {
        std::fs::remove_dir_all(self.abs_path(dir_path))
    }

    pub fn remove_empty_directory(&self, dir_path: &Path) -> io::Result<()> {
        std::fs::remove_dir(self.abs_path(dir_path))
    }

    pub fn is_empty_directory(&self, dir_path: &Path) -> io::Result<bool> {
        Ok(std::fs::read_dir(self.abs_path(dir_path))?.next().is_none())
    }

    pub fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        std::fs::rename(self.abs_path(from), self.abs_path(to))
    }

    /// Names directly inside a directory of the working tree.
    pub fn list_dir(&self, dir_path: &Path) -> io::Result<Vec<std::ffi::OsString>> {
        std::fs::read_dir(self.abs_path(dir_path))?
            .map(|entry| entry.map(|entry| entry.file_name()))
            .collect()
    }

    /// Files and symlinks at or beneath `file_path`, relative to the root.
    pub fn list_files(&self, file_path: &Path) -> anyhow::Result<Vec<PathBuf>> {
        let file_path = file_path
            .components()
            .filter(|component| !matches!(component, Component::CurDir))
            .collect::<PathBuf>();
        let abs_path = self.abs_path(&file_path);
        if self.lstat(&file_path)?.is_none() {
            anyhow::bail!("pathspec '{}' did not match any files", file_path.display());
        }

        let mut files = Vec::new();
        let walker = WalkDir::new(&abs_path)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| entry.file_name() != GIT_DIR_NAME);

        for entry in walker {
            let entry = entry?;
            if !entry.file_type().is_dir() {
                files.push(entry.path().strip_prefix(&self.path)?.to_path_buf());
            }
        }

        Ok(files)
    }

    /// Walk the working tree in name order, skipping `.git`.
    ///
    /// Every entry is reported with its `lstat` result. Directories are
    /// entered only when `descend` approves them; others are reported as a
    /// single entry.
    pub fn walk<F>(&self, mut descend: F) -> anyhow::Result<Vec<(PathBuf, Metadata)>>
    where
        F: FnMut(&Path) -> bool,
    {
        if !self.path.is_dir() {
            return Ok(Vec::new());
        }

        let mut entries = Vec::new();
        let mut walker = WalkDir::new(&self.path)
            .min_depth(1)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter();

        while let Some(entry) = walker.next() {
            let entry = entry?;
            let relative_path = entry.path().strip_prefix(&self.path)?.to_path_buf();
            let is_dir = entry.file_type().is_dir();

            if entry.file_name() == GIT_DIR_NAME {
                if is_dir {
                    walker.skip_current_dir();
                }
                continue;
            }

            if is_dir && !descend(&relative_path) {
                walker.skip_current_dir();
            }

            entries.push((relative_path, entry.metadata()?));
        }

        Ok(entries)
    }
}
