//! Three-way checkout planning
//!
//! Every path known to the baseline tree, the target tree, the index or the
//! working tree is classified into one `Action`. The planner records what
//! the target asks for (`kind`) and what local state stands in the way
//! (`reason`); whether that obstacle blocks the change is decided later by
//! the strategy resolver.
//!
//! Paths are visited in byte order, which puts a directory before its
//! contents. Removals are later executed in reverse.

use crate::artifacts::checkout::action::{Action, ActionKind, Reason};
use crate::artifacts::checkout::context::CheckoutContext;
use crate::artifacts::checkout::options::{CheckoutStrategy, DiffFile};
use crate::artifacts::checkout::workdir::{WorkdirEntry, WorkdirSnapshot};
use crate::artifacts::core::PathKey;
use crate::artifacts::database::database_entry::DatabaseEntry;
use crate::artifacts::index::entry_mode::EntryMode;
use crate::artifacts::index::index_entry::IndexEntry;
use crate::errors::{IoResultExt, Result};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use tracing::debug;

pub type TreeListing = BTreeMap<PathKey, DatabaseEntry>;

pub struct Planner<'c, 'r> {
    context: &'c CheckoutContext<'r>,
    baseline: &'c TreeListing,
    target: &'c TreeListing,
    workdir: &'c WorkdirSnapshot,
}

impl<'c, 'r> Planner<'c, 'r> {
    pub fn new(
        context: &'c CheckoutContext<'r>,
        baseline: &'c TreeListing,
        target: &'c TreeListing,
        workdir: &'c WorkdirSnapshot,
    ) -> Self {
        Planner {
            context,
            baseline,
            target,
            workdir,
        }
    }

    pub fn plan(&self) -> Result<Vec<Action>> {
        let mut candidates = self.candidate_paths();
        let renames = self.case_renames(&candidates);
        for old_path in renames.values() {
            candidates.remove(&PathKey::from(old_path.as_path()));
        }

        let mut actions = Vec::new();
        for key in &candidates {
            let path = key.as_path();
            let action = match renames.get(key) {
                Some(old_path) => Some(self.plan_case_rename(old_path, path)?),
                None => self.plan_path(path)?,
            };

            if let Some(action) = action {
                debug!(path = %path.display(), kind = ?action.kind, reason = ?action.reason, "planned");
                actions.push(action);
            }
        }

        Ok(actions)
    }

    /// In-scope paths from every view. Working tree directories only count
    /// when they were not walked (untracked or ignored as a whole) or when a
    /// tree records a file at their path.
    fn candidate_paths(&self) -> BTreeSet<PathKey> {
        let index = self.context.index();
        let blobs = |listing: &'c TreeListing| {
            listing
                .iter()
                .filter(|(_, entry)| !entry.is_tree())
                .map(|(key, _)| key.clone())
        };

        let mut candidates = blobs(self.baseline)
            .chain(blobs(self.target))
            .chain(index.entries().map(|entry| PathKey::from(entry.name.as_path())))
            .collect::<BTreeSet<_>>();

        for (path, entry) in self.workdir.iter() {
            if !entry.is_dir() || !entry.descended || candidates.contains(&PathKey::from(path)) {
                candidates.insert(PathKey::from(path));
            }
        }

        candidates.retain(|key| self.context.pathspec().matches(key.as_path()));
        candidates
    }

    /// Pair baseline-only and target-only paths that differ only by case when
    /// the output filesystem would treat them as one entry.
    fn case_renames(&self, candidates: &BTreeSet<PathKey>) -> HashMap<PathKey, PathBuf> {
        let mut renames = HashMap::new();
        if self.context.is_case_sensitive() {
            return renames;
        }

        let index = self.context.index();
        let mut removed = HashMap::new();
        for key in self.baseline.keys() {
            let path = key.as_path();
            if candidates.contains(key)
                && self.baseline_blob(path).is_some()
                && self.target_blob(path).is_none()
                && self.workdir.get(path).is_some()
                && index.conflict_entries(path).is_empty()
            {
                removed.insert(path.to_string_lossy().to_lowercase(), path);
            }
        }

        for (key, _) in self.target.iter().filter(|(_, entry)| !entry.is_tree()) {
            let path = key.as_path();
            if !candidates.contains(key) || self.baseline_blob(path).is_some() {
                continue;
            }

            if let Some(old_path) = removed.remove(&path.to_string_lossy().to_lowercase()) {
                renames.insert(key.clone(), old_path.to_path_buf());
            }
        }

        renames
    }

    fn plan_case_rename(&self, old_path: &Path, new_path: &Path) -> Result<Action> {
        let baseline = self.baseline_blob(old_path);
        let workdir = self.workdir.get(old_path);
        let index_entry = self.context.index().entry_by_path(old_path);

        let clean = match (baseline, workdir) {
            (Some(baseline), Some(workdir)) => {
                index_matches(index_entry, Some(baseline))
                    && self.workdir_matches(old_path, baseline, workdir)?
            }
            _ => false,
        };

        let reason = if clean { Reason::None } else { Reason::Dirty };
        let mut action = Action::new(
            new_path.to_path_buf(),
            ActionKind::RenameCase {
                from: old_path.to_path_buf(),
            },
            reason,
        );
        action.baseline = baseline.map(|entry| diff_file(old_path, entry));
        action.target = self.target_blob(new_path).map(|entry| diff_file(new_path, entry));
        action.workdir = workdir.map(|entry| workdir_file(old_path, entry));

        Ok(action)
    }

    fn plan_path(&self, path: &Path) -> Result<Option<Action>> {
        let baseline = self.baseline_blob(path);
        let target = self.target_blob(path);
        let workdir = self.workdir.get(path);
        let index = self.context.index();
        let index_entry = index.entry_by_path(path);

        let classification = if !index.conflict_entries(path).is_empty() {
            Some(match (target, workdir) {
                (Some(_), Some(_)) => (ActionKind::Update, Reason::UnmergedBaseline),
                (Some(_), None) => (ActionKind::Create, Reason::UnmergedBaseline),
                (None, _) => (ActionKind::Delete, Reason::UnmergedBaseline),
            })
        } else {
            match target {
                Some(target) => self.classify_target(path, baseline, target, index_entry, workdir)?,
                None => self.classify_removal(path, baseline, index_entry, workdir)?,
            }
        };

        Ok(classification.map(|(kind, reason)| {
            let mut action = Action::new(path.to_path_buf(), kind, reason);
            action.baseline = baseline.map(|entry| diff_file(path, entry));
            action.target = target.map(|entry| diff_file(path, entry));
            action.workdir = workdir.map(|entry| workdir_file(path, entry));
            action
        }))
    }

    /// The target records a file at `path`.
    fn classify_target(
        &self,
        path: &Path,
        baseline: Option<&DatabaseEntry>,
        target: &DatabaseEntry,
        index_entry: Option<&IndexEntry>,
        workdir: Option<&WorkdirEntry>,
    ) -> Result<Option<(ActionKind, Reason)>> {
        let unchanged = baseline.is_some_and(|baseline| baseline == target);

        let Some(workdir) = workdir else {
            return Ok(Some(match baseline {
                None if index_entry.is_none() => (ActionKind::Create, Reason::None),
                None => (ActionKind::Create, Reason::Dirty),
                Some(_) if unchanged => (ActionKind::Skip, Reason::Dirty),
                Some(_) => (ActionKind::Update, Reason::Dirty),
            }));
        };

        if workdir.is_dir() {
            let reason = if self.context.ignore().is_ignored(path, true) {
                Reason::Ignored
            } else if self.directory_is_disposable(path, workdir.descended)? {
                Reason::None
            } else {
                Reason::TypeChange
            };
            return Ok(Some((ActionKind::Update, reason)));
        }

        if self.workdir_matches(path, target, workdir)? {
            return Ok(if index_matches(index_entry, Some(target)) {
                None
            } else if index_entry.is_none() || index_matches(index_entry, baseline) {
                Some((ActionKind::Update, Reason::None))
            } else if unchanged {
                Some((ActionKind::Skip, Reason::Dirty))
            } else {
                Some((ActionKind::Update, Reason::Dirty))
            });
        }

        if let Some(baseline) = baseline
            && index_matches(index_entry, Some(baseline))
            && self.workdir_matches(path, baseline, workdir)?
        {
            return Ok(Some((ActionKind::Update, Reason::None)));
        }

        if unchanged {
            return Ok(Some((ActionKind::Skip, Reason::Dirty)));
        }

        let reason = if baseline.is_none() && index_entry.is_none() {
            if self.context.ignore().is_ignored(path, false) {
                Reason::Ignored
            } else {
                Reason::Untracked
            }
        } else if workdir.mode().is_symlink() != target.mode.is_symlink() {
            Reason::TypeChange
        } else {
            Reason::Dirty
        };

        Ok(Some((ActionKind::Update, reason)))
    }

    /// The target has no file at `path`; it may have a directory there.
    fn classify_removal(
        &self,
        path: &Path,
        baseline: Option<&DatabaseEntry>,
        index_entry: Option<&IndexEntry>,
        workdir: Option<&WorkdirEntry>,
    ) -> Result<Option<(ActionKind, Reason)>> {
        let target_dir = self
            .target
            .get(&PathKey::from(path))
            .is_some_and(DatabaseEntry::is_tree);

        match (baseline, workdir) {
            (Some(baseline), None) => Ok(match index_entry {
                None => None,
                Some(_) if index_matches(index_entry, Some(baseline)) => {
                    Some((ActionKind::Delete, Reason::None))
                }
                Some(_) => Some((ActionKind::Skip, Reason::Dirty)),
            }),
            (Some(_), Some(workdir)) if workdir.is_dir() => {
                Ok(Some((ActionKind::Skip, Reason::TypeChange)))
            }
            (Some(baseline), Some(workdir)) => {
                if index_matches(index_entry, Some(baseline))
                    && self.workdir_matches(path, baseline, workdir)?
                {
                    Ok(Some((ActionKind::Delete, Reason::None)))
                } else if target_dir {
                    Ok(Some((ActionKind::Delete, Reason::Dirty)))
                } else {
                    Ok(Some((ActionKind::Skip, Reason::Dirty)))
                }
            }
            (None, Some(workdir)) => {
                if index_entry.is_some() {
                    return Ok((target_dir && !workdir.is_dir())
                        .then_some((ActionKind::Delete, Reason::Dirty)));
                }

                let ignored = self.context.ignore().is_ignored(path, workdir.is_dir());
                if workdir.is_dir()
                    && !ignored
                    && self
                        .context
                        .workspace()
                        .is_empty_directory(path)
                        .io_context("read directory", path)?
                {
                    return Ok(None);
                }

                let reason = if ignored {
                    Reason::Ignored
                } else {
                    Reason::Untracked
                };
                if target_dir && !workdir.is_dir() {
                    Ok(Some((ActionKind::Delete, reason)))
                } else {
                    Ok(Some((ActionKind::Skip, reason)))
                }
            }
            (None, None) => Ok(None),
        }
    }

    /// Whether a working tree directory standing where the target wants a
    /// file can go without losing anything the strategy protects.
    fn directory_is_disposable(&self, dir: &Path, descended: bool) -> Result<bool> {
        if !descended {
            return self.untracked_is_disposable(dir, true);
        }

        let index = self.context.index();
        for (path, entry) in self.workdir.descendants(dir) {
            if entry.is_dir() && entry.descended {
                continue;
            }

            let index_entry = index.entry_by_path(path);
            let disposable = match self.baseline_blob(path) {
                Some(baseline) => {
                    index_matches(index_entry, Some(baseline))
                        && self.workdir_matches(path, baseline, entry)?
                }
                None if index_entry.is_some() => false,
                None => self.untracked_is_disposable(path, entry.is_dir())?,
            };

            if !disposable {
                return Ok(false);
            }
        }

        Ok(true)
    }

    fn untracked_is_disposable(&self, path: &Path, is_dir: bool) -> Result<bool> {
        if self.context.ignore().is_ignored(path, is_dir) {
            return Ok(!self.context.has(CheckoutStrategy::DONT_OVERWRITE_IGNORED));
        }

        if is_dir
            && self
                .context
                .workspace()
                .is_empty_directory(path)
                .io_context("read directory", path)?
        {
            return Ok(true);
        }

        Ok(self.context.has(CheckoutStrategy::REMOVE_UNTRACKED))
    }

    /// Whether the working tree holds exactly `entry` at `path`.
    ///
    /// The index stat cache answers when it describes `entry` and is not
    /// racily clean; otherwise the file is read and compared with the
    /// filtered blob.
    fn workdir_matches(
        &self,
        path: &Path,
        entry: &DatabaseEntry,
        workdir: &WorkdirEntry,
    ) -> Result<bool> {
        if !same_kind(workdir.mode(), entry.mode) {
            return Ok(false);
        }

        let index = self.context.index();
        if let Some(index_entry) = index.entry_by_path(path)
            && index_entry.oid == entry.oid
            && index_entry.mode() == entry.mode
            && index_entry.stat_match(&workdir.metadata)
            && index_entry.times_match(&workdir.metadata)
            && !index.is_racily_clean(index_entry)
        {
            return Ok(true);
        }

        let actual = self
            .context
            .workspace()
            .read_content(path, entry.mode)
            .io_context("read", path)?;
        let expected = self.context.checkout_content(path, entry)?;

        Ok(actual == expected)
    }

    fn baseline_blob(&self, path: &Path) -> Option<&'c DatabaseEntry> {
        self.baseline
            .get(&PathKey::from(path))
            .filter(|entry| !entry.is_tree())
    }

    fn target_blob(&self, path: &Path) -> Option<&'c DatabaseEntry> {
        self.target
            .get(&PathKey::from(path))
            .filter(|entry| !entry.is_tree())
    }
}

fn index_matches(index_entry: Option<&IndexEntry>, entry: Option<&DatabaseEntry>) -> bool {
    match (index_entry, entry) {
        (None, None) => true,
        (Some(index_entry), Some(entry)) => {
            index_entry.oid == entry.oid && index_entry.mode() == entry.mode
        }
        _ => false,
    }
}

/// Same file type and, for regular files, same executable bit.
fn same_kind(workdir: EntryMode, entry: EntryMode) -> bool {
    match (workdir, entry) {
        (EntryMode::File(left), EntryMode::File(right)) => left == right,
        (EntryMode::Symlink, EntryMode::Symlink) => true,
        _ => false,
    }
}

fn diff_file(path: &Path, entry: &DatabaseEntry) -> DiffFile {
    DiffFile {
        path: path.to_path_buf(),
        oid: Some(entry.oid.clone()),
        mode: entry.mode,
    }
}

fn workdir_file(path: &Path, entry: &WorkdirEntry) -> DiffFile {
    DiffFile {
        path: path.to_path_buf(),
        oid: None,
        mode: entry.mode(),
    }
}
