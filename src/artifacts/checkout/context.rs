//! Per-checkout state
//!
//! Everything one checkout consults repeatedly lives here: the strategy, the
//! path scope, the ignore and attribute rules (read once, when the context is
//! built), the case sensitivity of the output directory and the performance
//! counters. Filesystem calls that count towards `PerfData` go through the
//! context so the numbers stay honest.

use crate::areas::database::Database;
use crate::areas::index::Index;
use crate::areas::repository::{GIT_DIR_NAME, Repository};
use crate::areas::workspace::Workspace;
use crate::artifacts::attributes::{AttributeRules, FilterCache};
use crate::artifacts::checkout::options::{CheckoutOptions, CheckoutStrategy, PerfData};
use crate::artifacts::checkout::pathspec::Pathspec;
use crate::artifacts::database::database_entry::DatabaseEntry;
use crate::artifacts::ignore::{IgnoreOracle, IgnoreRules};
use crate::artifacts::index::entry_mode::EntryMode;
use crate::artifacts::index::index_entry::EntryMetadata;
use crate::errors::{IoResultExt, Result};
use bytes::Bytes;
use std::cell::Cell;
use std::fs::Metadata;
use std::path::Path;

pub struct CheckoutContext<'r> {
    strategy: CheckoutStrategy,
    pathspec: Pathspec,
    workspace: Workspace,
    database: &'r Database,
    index: &'r Index,
    ignore: IgnoreRules,
    filters: FilterCache,
    case_sensitive: bool,
    alternate_root: bool,
    stat_calls: Cell<usize>,
    mkdir_calls: Cell<usize>,
    rmdir_calls: Cell<usize>,
    chmod_calls: Cell<usize>,
    locked_skips: Cell<usize>,
}

impl<'r> CheckoutContext<'r> {
    /// `index` is the staging index the plan compares against; it is not
    /// necessarily the repository's own.
    pub fn new(
        repository: &'r Repository,
        index: &'r Index,
        options: &CheckoutOptions<'_>,
        workspace: Workspace,
        pathspec: Pathspec,
        alternate_root: bool,
    ) -> Result<Self> {
        let ignore = IgnoreRules::load(
            repository.git_dir(),
            workspace.path(),
            repository.ignore_rules(),
        )?;
        let filters = FilterCache::new(AttributeRules::load(
            repository.git_dir(),
            workspace.path(),
        )?)?;
        let case_sensitive = options
            .case_sensitive
            .unwrap_or_else(|| detect_case_sensitivity(workspace.path()));

        Ok(CheckoutContext {
            strategy: options.strategy,
            pathspec,
            workspace,
            database: repository.database(),
            index,
            ignore,
            filters,
            case_sensitive,
            alternate_root,
            stat_calls: Cell::new(0),
            mkdir_calls: Cell::new(0),
            rmdir_calls: Cell::new(0),
            chmod_calls: Cell::new(0),
            locked_skips: Cell::new(0),
        })
    }

    pub fn strategy(&self) -> CheckoutStrategy {
        self.strategy
    }

    pub fn has(&self, flag: CheckoutStrategy) -> bool {
        self.strategy.contains(flag)
    }

    pub fn pathspec(&self) -> &Pathspec {
        &self.pathspec
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn database(&self) -> &Database {
        self.database
    }

    pub fn index(&self) -> &Index {
        self.index
    }

    pub fn ignore(&self) -> &dyn IgnoreOracle {
        &self.ignore
    }

    pub fn is_case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    pub fn is_alternate_root(&self) -> bool {
        self.alternate_root
    }

    pub fn perfdata(&self) -> PerfData {
        PerfData {
            stat_calls: self.stat_calls.get(),
            mkdir_calls: self.mkdir_calls.get(),
            rmdir_calls: self.rmdir_calls.get(),
            chmod_calls: self.chmod_calls.get(),
            locked_skips: self.locked_skips.get(),
        }
    }

    pub fn record_stats(&self, count: usize) {
        bump(&self.stat_calls, count);
    }

    pub fn record_mkdir(&self) {
        bump(&self.mkdir_calls, 1);
    }

    pub fn record_locked_skip(&self) {
        bump(&self.locked_skips, 1);
    }

    pub fn lstat(&self, path: &Path) -> Result<Option<Metadata>> {
        bump(&self.stat_calls, 1);
        self.workspace.lstat(path).io_context("stat", path)
    }

    pub fn stat_entry(&self, path: &Path) -> Result<Option<EntryMetadata>> {
        bump(&self.stat_calls, 1);
        Ok(self.workspace.stat_entry(path)?)
    }

    pub fn make_directory(&self, path: &Path) -> std::io::Result<()> {
        bump(&self.mkdir_calls, 1);
        self.workspace.make_directory(path)
    }

    pub fn remove_directory_all(&self, path: &Path) -> std::io::Result<()> {
        bump(&self.rmdir_calls, 1);
        self.workspace.remove_directory_all(path)
    }

    pub fn remove_empty_directory(&self, path: &Path) -> std::io::Result<()> {
        bump(&self.rmdir_calls, 1);
        self.workspace.remove_empty_directory(path)
    }

    pub fn set_mode(&self, path: &Path, mode: EntryMode) -> Result<()> {
        bump(&self.chmod_calls, 1);
        self.workspace.set_mode(path, mode).io_context("chmod", path)
    }

    /// Bytes a target entry should have on disk: filtered file content, or
    /// the raw link target for symlinks.
    pub fn checkout_content(&self, path: &Path, entry: &DatabaseEntry) -> Result<Bytes> {
        let content = self.database.load_blob_data(&entry.oid)?;

        if entry.mode.is_symlink() {
            Ok(content)
        } else {
            Ok(self.filters.smudge(path, &entry.oid, content))
        }
    }
}

fn bump(counter: &Cell<usize>, count: usize) {
    counter.set(counter.get() + count);
}

/// Look for a case-swapped twin of a known entry; finding one means the
/// filesystem folds case. Defaults to case-sensitive when nothing can be
/// checked.
fn detect_case_sensitivity(root: &Path) -> bool {
    let (parent_dir, name) = if root.join(GIT_DIR_NAME).exists() {
        (root.to_path_buf(), GIT_DIR_NAME.to_string())
    } else {
        match (root.parent(), root.file_name().and_then(|name| name.to_str())) {
            (Some(parent), Some(name)) => (parent.to_path_buf(), name.to_string()),
            _ => return true,
        }
    };

    let swapped = name
        .chars()
        .map(|c| {
            if c.is_lowercase() {
                c.to_ascii_uppercase()
            } else {
                c.to_ascii_lowercase()
            }
        })
        .collect::<String>();

    if swapped == name {
        return true;
    }

    !parent_dir.join(swapped).exists()
}
