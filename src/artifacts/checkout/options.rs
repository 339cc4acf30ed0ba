//! Checkout configuration
//!
//! `CheckoutOptions` is built with chained setters:
//!
//! ```ignore
//! let options = CheckoutOptions::new()
//!     .strategy(CheckoutStrategy::SAFE | CheckoutStrategy::REMOVE_UNTRACKED)
//!     .paths(["src/"])
//!     .notify_flags(NotifyFlags::CONFLICT)
//!     .notify_callback(|kind, path, _files| {
//!         eprintln!("{kind:?} {}", path.display());
//!         0
//!     });
//! ```

use crate::artifacts::index::entry_mode::EntryMode;
use crate::artifacts::objects::object_id::ObjectId;
use bitflags::bitflags;
use std::path::{Path, PathBuf};

bitflags! {
    /// How checkout treats local state that differs from the target.
    ///
    /// Flags compose freely; without `FORCE` the safe rules apply.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct CheckoutStrategy: u32 {
        /// Apply changes that cannot lose local modifications
        const SAFE = 1 << 0;
        /// Make the working tree match the target, discarding local changes
        const FORCE = 1 << 1;
        /// Recreate tracked files missing from the working tree
        const RECREATE_MISSING = 1 << 2;
        const REMOVE_UNTRACKED = 1 << 5;
        const REMOVE_IGNORED = 1 << 6;
        /// Only update files that already exist
        const UPDATE_ONLY = 1 << 7;
        /// Leave the in-memory index untouched
        const DONT_UPDATE_INDEX = 1 << 8;
        /// Use the repository handle's index instead of re-reading it from disk
        const NO_REFRESH = 1 << 9;
        /// Treat paths as literal names rather than glob patterns
        const DISABLE_PATHSPEC_MATCH = 1 << 13;
        /// Skip directories that cannot be removed instead of failing
        const SKIP_LOCKED_DIRECTORIES = 1 << 18;
        const DONT_OVERWRITE_IGNORED = 1 << 19;
        /// Update the in-memory index without persisting it
        const DONT_WRITE_INDEX = 1 << 23;
        const DRY_RUN = 1 << 24;
    }
}

impl Default for CheckoutStrategy {
    fn default() -> Self {
        CheckoutStrategy::SAFE
    }
}

pub const STRATEGY_NAMES: phf::Map<&'static str, CheckoutStrategy> = phf::phf_map! {
    "safe" => CheckoutStrategy::SAFE,
    "force" => CheckoutStrategy::FORCE,
    "recreate-missing" => CheckoutStrategy::RECREATE_MISSING,
    "remove-untracked" => CheckoutStrategy::REMOVE_UNTRACKED,
    "remove-ignored" => CheckoutStrategy::REMOVE_IGNORED,
    "update-only" => CheckoutStrategy::UPDATE_ONLY,
    "dont-update-index" => CheckoutStrategy::DONT_UPDATE_INDEX,
    "no-refresh" => CheckoutStrategy::NO_REFRESH,
    "disable-pathspec-match" => CheckoutStrategy::DISABLE_PATHSPEC_MATCH,
    "skip-locked-directories" => CheckoutStrategy::SKIP_LOCKED_DIRECTORIES,
    "dont-overwrite-ignored" => CheckoutStrategy::DONT_OVERWRITE_IGNORED,
    "dont-write-index" => CheckoutStrategy::DONT_WRITE_INDEX,
    "dry-run" => CheckoutStrategy::DRY_RUN,
};

impl CheckoutStrategy {
    /// Looks up the kebab-case names accepted by `--strategy`.
    pub fn from_cli_name(name: &str) -> Option<Self> {
        STRATEGY_NAMES.get(name).copied()
    }

    /// No working tree or index writes happen under this strategy.
    pub fn is_dry_run(&self) -> bool {
        self.contains(CheckoutStrategy::DRY_RUN)
    }
}

bitflags! {
    /// Classifications reported through the notify callback.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct NotifyFlags: u32 {
        const CONFLICT = 1 << 0;
        const DIRTY = 1 << 1;
        const UPDATED = 1 << 2;
        const UNTRACKED = 1 << 3;
        const IGNORED = 1 << 4;
        const ALL = 0xFFFF;
    }
}

impl Default for NotifyFlags {
    fn default() -> Self {
        NotifyFlags::empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotifyKind {
    Conflict,
    Dirty,
    Updated,
    Untracked,
    Ignored,
}

impl NotifyKind {
    pub fn as_flag(&self) -> NotifyFlags {
        match self {
            NotifyKind::Conflict => NotifyFlags::CONFLICT,
            NotifyKind::Dirty => NotifyFlags::DIRTY,
            NotifyKind::Updated => NotifyFlags::UPDATED,
            NotifyKind::Untracked => NotifyFlags::UNTRACKED,
            NotifyKind::Ignored => NotifyFlags::IGNORED,
        }
    }
}

/// One side of a path as seen by the notify callback.
///
/// Working tree files carry no id: their content is never hashed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffFile {
    pub path: PathBuf,
    pub oid: Option<ObjectId>,
    pub mode: EntryMode,
}

#[derive(Debug, Clone, Copy)]
pub struct NotifyFiles<'f> {
    pub baseline: Option<&'f DiffFile>,
    pub target: Option<&'f DiffFile>,
    pub workdir: Option<&'f DiffFile>,
}

/// Counters gathered during one checkout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PerfData {
    pub stat_calls: usize,
    pub mkdir_calls: usize,
    pub rmdir_calls: usize,
    pub chmod_calls: usize,
    pub locked_skips: usize,
}

/// `(path, completed_steps, total_steps)`; the first call carries no path.
pub type ProgressCallback<'a> = Box<dyn FnMut(Option<&Path>, usize, usize) + 'a>;

/// Returning non-zero cancels the checkout with that value.
pub type NotifyCallback<'a> = Box<dyn FnMut(NotifyKind, &Path, NotifyFiles<'_>) -> i32 + 'a>;

pub type PerfDataCallback<'a> = Box<dyn FnMut(&PerfData) + 'a>;

#[derive(Default)]
pub struct CheckoutOptions<'a> {
    pub(crate) strategy: CheckoutStrategy,
    pub(crate) notify_flags: NotifyFlags,
    pub(crate) paths: Vec<String>,
    pub(crate) target_directory: Option<PathBuf>,
    pub(crate) allow_target_directory: bool,
    pub(crate) progress_callback: Option<ProgressCallback<'a>>,
    pub(crate) notify_callback: Option<NotifyCallback<'a>>,
    pub(crate) perfdata_callback: Option<PerfDataCallback<'a>>,
    /// Overrides probing the output directory for case folding
    pub(crate) case_sensitive: Option<bool>,
}

impl<'a> CheckoutOptions<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn strategy(mut self, strategy: CheckoutStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn notify_flags(mut self, flags: NotifyFlags) -> Self {
        self.notify_flags = flags;
        self
    }

    /// Restrict the checkout to paths matching any of these patterns.
    pub fn paths<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.paths.extend(paths.into_iter().map(Into::into));
        self
    }

    /// Materialize into `path` instead of the repository's working tree.
    pub fn target_directory(mut self, path: impl Into<PathBuf>) -> Self {
        self.target_directory = Some(path.into());
        self
    }

    pub fn allow_target_directory(mut self, allow: bool) -> Self {
        self.allow_target_directory = allow;
        self
    }

    pub fn progress_callback<F>(mut self, callback: F) -> Self
    where
        F: FnMut(Option<&Path>, usize, usize) + 'a,
    {
        self.progress_callback = Some(Box::new(callback));
        self
    }

    pub fn notify_callback<F>(mut self, callback: F) -> Self
    where
        F: FnMut(NotifyKind, &Path, NotifyFiles<'_>) -> i32 + 'a,
    {
        self.notify_callback = Some(Box::new(callback));
        self
    }

    pub fn perfdata_callback<F>(mut self, callback: F) -> Self
    where
        F: FnMut(&PerfData) + 'a,
    {
        self.perfdata_callback = Some(Box::new(callback));
        self
    }

    #[cfg(test)]
    pub(crate) fn assume_case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = Some(case_sensitive);
        self
    }

    pub fn get_strategy(&self) -> CheckoutStrategy {
        self.strategy
    }
}

impl std::fmt::Debug for CheckoutOptions<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckoutOptions")
            .field("strategy", &self.strategy)
            .field("notify_flags", &self.notify_flags)
            .field("paths", &self.paths)
            .field("target_directory", &self.target_directory)
            .field("allow_target_directory", &self.allow_target_directory)
            .field("progress_callback", &self.progress_callback.is_some())
            .field("notify_callback", &self.notify_callback.is_some())
            .field("perfdata_callback", &self.perfdata_callback.is_some())
            .finish()
    }
}
