//! Git index (staging area)
//!
//! The index records, per path, the blob last staged and the stat data seen
//! when it was staged. Unresolved merges keep up to three extra records per
//! path (stages 1 to 3) instead of a resolved stage 0 record.
//!
//! ## Index File Format
//!
//! - Header: signature, version and entry count
//! - Entries: sorted by path bytes, then stage
//! - Checksum: SHA-1 of everything before it
//!
//! ## Data Structures
//!
//! - `entries`: records keyed by `(path, stage)`
//! - `children`: directory to tracked descendants, for directory/file replacement

use crate::artifacts::core::PathKey;
use crate::artifacts::index::index_entry::{IndexEntry, STAGE_RESOLVED, Stage};
use crate::artifacts::index::index_file::{HashedFile, IndexHeader};
use crate::artifacts::objects::object::{Packable, Unpackable};
use std::collections::{BTreeMap, BTreeSet};
use std::ops::DerefMut;
use std::os::unix::prelude::MetadataExt;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct Index {
    /// Path to the index file (typically `.git/index`)
    path: Box<Path>,
    entries: BTreeMap<(PathKey, Stage), IndexEntry>,
    children: BTreeMap<Box<Path>, BTreeSet<PathKey>>,
    /// Modification time of the index file when last read or written
    timestamp: Option<(i64, i64)>,
    changed: bool,
}

impl Index {
    pub fn new(path: Box<Path>) -> Self {
        Index {
            path,
            entries: BTreeMap::new(),
            children: BTreeMap::new(),
            timestamp: None,
            changed: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists_on_disk(&self) -> bool {
        self.path.exists()
    }

    pub fn is_changed(&self) -> bool {
        self.changed
    }

    /// Resolved (stage 0) record for a path.
    pub fn entry_by_path(&self, path: &Path) -> Option<&IndexEntry> {
        self.entry_by_path_and_stage(path, STAGE_RESOLVED)
    }

    pub fn entry_by_path_and_stage(&self, path: &Path, stage: Stage) -> Option<&IndexEntry> {
        self.entries.get(&(PathKey::from(path), stage))
    }

    /// Unresolved (stage 1 to 3) records for a path.
    pub fn conflict_entries(&self, path: &Path) -> Vec<&IndexEntry> {
        let key = PathKey::from(path);
        self.entries
            .range((key.clone(), STAGE_RESOLVED + 1)..=(key, Stage::MAX))
            .map(|(_, entry)| entry)
            .collect()
    }

    pub fn has_conflicts(&self) -> bool {
        self.entries.values().any(|entry| entry.stage() != STAGE_RESOLVED)
    }

    /// Paths holding unresolved records, in byte order.
    pub fn conflicted_paths(&self) -> Vec<PathBuf> {
        self.entries
            .iter()
            .filter(|(_, entry)| entry.stage() != STAGE_RESOLVED)
            .map(|((key, _), _)| key.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(PathKey::into_path_buf)
            .collect()
    }

    /// Every record, sorted by path bytes then stage.
    pub fn entries(&self) -> impl Iterator<Item = &IndexEntry> {
        self.entries.values()
    }

    pub fn resolved_entries(&self) -> impl Iterator<Item = &IndexEntry> {
        self.entries
            .values()
            .filter(|entry| entry.stage() == STAGE_RESOLVED)
    }

    /// True when the path is a tracked file or a directory holding tracked files.
    pub fn is_directly_tracked(&self, path: &Path) -> bool {
        self.children.contains_key(path)
            || self
                .entries
                .range((PathKey::from(path), 0)..=(PathKey::from(path), Stage::MAX))
                .next()
                .is_some()
    }

    /// Whether the stat cache of `entry` can be trusted.
    ///
    /// An entry written in the same instant as the index file (or later) may
    /// have been modified again without its stat data changing.
    pub fn is_racily_clean(&self, entry: &IndexEntry) -> bool {
        match self.timestamp {
            Some(index_mtime) => entry.metadata.mtime_pair() >= index_mtime,
            None => true,
        }
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.children.clear();
        self.timestamp = None;
        self.changed = false;
    }

    /// Load the index from disk, replacing the in-memory state.
    ///
    /// A missing index file yields an empty index; the file is not created.
    ///
    /// # Locking
    ///
    /// Acquires a shared lock on the index file during reading.
    pub fn rehydrate(&mut self) -> anyhow::Result<()> {
        self.clear();

        if !self.path().exists() {
            return Ok(());
        }

        let mut index_file = std::fs::OpenOptions::new().read(true).open(self.path())?;
        let mut lock = file_guard::lock(&mut index_file, file_guard::Lock::Shared, 0, 1)?;

        let metadata = lock.deref_mut().metadata()?;
        self.timestamp = Some((metadata.mtime(), metadata.mtime_nsec()));

        if metadata.len() == 0 {
            return Ok(());
        }

        let mut reader = HashedFile::new(lock);
        let header = reader.read_header()?;
        for _ in 0..header.entries {
            let bytes = reader.read_entry()?;
            self.store_entry(IndexEntry::deserialize(std::io::Cursor::new(bytes))?)?;
        }

        reader.verify()
    }

    /// Drop records a new resolved entry replaces: files standing where its
    /// parent directories go, anything tracked beneath it, and its own
    /// unresolved stages.
    fn discard_conflicts(&mut self, entry: &IndexEntry) -> anyhow::Result<()> {
        for parent in entry.parent_dirs()? {
            self.remove_entry(parent);
        }
        self.remove_children(&entry.name);
        self.remove_entry(&entry.name);

        Ok(())
    }

    fn store_entry(&mut self, entry: IndexEntry) -> anyhow::Result<()> {
        let key = PathKey::from(entry.name.as_path());

        for parent in entry.parent_dirs()? {
            self.children
                .entry(parent.to_path_buf().into_boxed_path())
                .or_default()
                .insert(key.clone());
        }

        self.entries.insert((key, entry.stage()), entry);

        Ok(())
    }

    fn remove_children(&mut self, path_name: &Path) {
        if let Some(children) = self.children.remove(path_name) {
            for child in children {
                self.remove_entry(child.as_path());
            }
        }
    }

    /// Remove every stage recorded for a path.
    fn remove_entry(&mut self, path_name: &Path) {
        let key = PathKey::from(path_name);
        let stages = self
            .entries
            .range((key.clone(), 0)..=(key.clone(), Stage::MAX))
            .map(|((_, stage), _)| *stage)
            .collect::<Vec<_>>();

        if stages.is_empty() {
            return;
        }

        for stage in stages {
            self.entries.remove(&(key.clone(), stage));
        }

        for parent in path_name.ancestors().skip(1) {
            if parent.as_os_str().is_empty() {
                break;
            }
            if let Some(children) = self.children.get_mut(parent) {
                children.remove(&key);
                if children.is_empty() {
                    self.children.remove(parent);
                }
            }
        }
    }

    /// Stage a resolved entry, clearing anything it displaces.
    pub fn add(&mut self, entry: IndexEntry) -> anyhow::Result<()> {
        let entry = entry.with_stage(STAGE_RESOLVED);
        self.discard_conflicts(&entry)?;
        self.store_entry(entry)?;

        self.changed = true;

        Ok(())
    }

    /// Record one side of an unresolved merge. Any resolved record for the
    /// same path is dropped.
    pub fn add_conflict(&mut self, entry: IndexEntry, stage: Stage) -> anyhow::Result<()> {
        if stage == STAGE_RESOLVED {
            return self.add(entry);
        }

        self.entries
            .remove(&(PathKey::from(entry.name.as_path()), STAGE_RESOLVED));
        self.store_entry(entry.with_stage(stage))?;

        self.changed = true;

        Ok(())
    }

    /// Remove a path (every stage) and everything tracked beneath it.
    pub fn remove(&mut self, path: &Path) -> anyhow::Result<()> {
        self.remove_entry(path);
        self.remove_children(path);

        self.changed = true;

        Ok(())
    }

    /// Persist the index, replacing the on-disk file.
    ///
    /// # Locking
    ///
    /// Acquires an exclusive lock on the index file during writing.
    pub fn write_updates(&mut self) -> anyhow::Result<()> {
        let mut index_file = std::fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(self.path())?;
        let lock = file_guard::lock(&mut index_file, file_guard::Lock::Exclusive, 0, 1)?;

        let mut writer = HashedFile::new(lock);
        let header = IndexHeader {
            entries: self.entries.len() as u32,
        };
        writer.write(&header.encode())?;
        for entry in self.entries.values() {
            writer.write(&entry.serialize()?)?;
        }
        writer.finish()?;

        let metadata = index_file.metadata()?;
        self.timestamp = Some((metadata.mtime(), metadata.mtime_nsec()));
        self.changed = false;

        Ok(())
    }
}
