//! Applying a checkout plan to the working tree
//!
//! The plan is executed in two passes:
//!
//! 1. Removals, deepest path first. Directories left empty by a removal are
//!    pruned up to (but excluding) the output root.
//! 2. Creations, updates and case renames, shallowest path first. Missing
//!    parent directories are created and whatever occupies the destination is
//!    removed before the new content is written.
//!
//! Nothing here decides *whether* a path may change; the plan handed in has
//! already been resolved against the strategy and checked for conflicts.

use crate::artifacts::checkout::action::{Action, ActionKind, Reason};
use crate::artifacts::checkout::context::CheckoutContext;
use crate::artifacts::checkout::options::{CheckoutStrategy, ProgressCallback};
use crate::artifacts::database::database_entry::DatabaseEntry;
use crate::errors::{CheckoutError, IoResultExt, Result};
use fake::rand;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// What actually happened on disk.
#[derive(Debug, Default)]
pub struct MigrationOutcome {
    /// Actions carried out, in execution order
    pub applied: Vec<Action>,
    /// Skips for paths whose directory could not be removed
    pub locked: Vec<Action>,
}

/// A run that stopped partway. `outcome` holds the steps finished before
/// `error`; they are on disk and still need recording.
#[derive(Debug)]
pub struct MigrationFailure {
    pub outcome: MigrationOutcome,
    pub error: CheckoutError,
}

pub struct Migration<'c, 'r> {
    context: &'c CheckoutContext<'r>,
    actions: &'c [Action],
    outcome: MigrationOutcome,
    completed: usize,
    total: usize,
}

impl<'c, 'r> Migration<'c, 'r> {
    pub fn new(context: &'c CheckoutContext<'r>, actions: &'c [Action]) -> Self {
        let total = actions.iter().filter(|action| action.is_applied()).count();

        Migration {
            context,
            actions,
            outcome: MigrationOutcome::default(),
            completed: 0,
            total,
        }
    }

    pub fn apply(
        mut self,
        mut progress: Option<&mut ProgressCallback<'_>>,
    ) -> std::result::Result<MigrationOutcome, MigrationFailure> {
        match self.run(&mut progress) {
            Ok(()) => Ok(self.outcome),
            Err(error) => Err(MigrationFailure {
                outcome: self.outcome,
                error,
            }),
        }
    }

    fn run(&mut self, progress: &mut Option<&mut ProgressCallback<'_>>) -> Result<()> {
        if let Some(progress) = progress.as_deref_mut() {
            progress(None, 0, self.total);
        }

        let actions = self.actions;
        info!(total = self.total, "removing paths");
        for action in actions.iter().rev() {
            if action.kind == ActionKind::Delete {
                let removed = self.remove(&action.path)?;
                self.finish_step(action, removed, progress);
            }
        }

        info!("writing paths");
        for action in actions {
            let written = match &action.kind {
                ActionKind::Create | ActionKind::Update => self.write(action)?,
                ActionKind::RenameCase { from } => {
                    self.drop_case_twin(from)?;
                    self.write(action)?
                }
                _ => continue,
            };
            self.finish_step(action, written, progress);
        }

        Ok(())
    }

    fn finish_step(
        &mut self,
        action: &Action,
        applied: bool,
        progress: &mut Option<&mut ProgressCallback<'_>>,
    ) {
        debug!(path = %action.path.display(), kind = ?action.kind, applied, "checkout step");

        if applied {
            self.outcome.applied.push(action.clone());
        } else {
            let mut skipped = action.clone();
            skipped.kind = ActionKind::Skip;
            skipped.reason = Reason::Locked;
            self.outcome.locked.push(skipped);
        }

        self.completed += 1;
        if let Some(progress) = progress.as_deref_mut() {
            progress(Some(&action.path), self.completed, self.total);
        }
    }

    /// Delete whatever sits at `path` and prune emptied parents. A path that
    /// is already gone only needs its index record dropped.
    fn remove(&self, path: &Path) -> Result<bool> {
        let Some(metadata) = self.context.lstat(path)? else {
            return Ok(true);
        };

        if !self.remove_existing(path, metadata.is_dir())? {
            return Ok(false);
        }

        self.prune_empty_parents(path);
        Ok(true)
    }

    /// Returns `false` when a locked directory was skipped.
    fn remove_existing(&self, path: &Path, is_dir: bool) -> Result<bool> {
        let result = if is_dir {
            self.context.remove_directory_all(path)
        } else {
            self.context.workspace().remove_file(path)
        };

        match result {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(true),
            Err(e) if is_locked(&e) && self.context.has(CheckoutStrategy::SKIP_LOCKED_DIRECTORIES) => {
                warn!(path = %path.display(), error = %e, "skipping locked path");
                self.context.record_locked_skip();
                Ok(false)
            }
            Err(e) => Err(CheckoutError::io("remove", path, e)),
        }
    }

    fn prune_empty_parents(&self, path: &Path) {
        for parent in path
            .ancestors()
            .skip(1)
            .take_while(|parent| !parent.as_os_str().is_empty())
        {
            if self.context.remove_empty_directory(parent).is_err() {
                break;
            }
        }
    }

    fn write(&self, action: &Action) -> Result<bool> {
        let path = action.path.as_path();
        let entry = action.target_entry().ok_or_else(|| {
            anyhow::anyhow!("no target entry recorded for {}", path.display())
        })?;

        self.ensure_parent_dirs(path)?;

        if let Some(metadata) = self.context.lstat(path)?
            && !self.remove_existing(path, metadata.is_dir())?
        {
            return Ok(false);
        }

        self.write_entry(path, &entry)?;
        Ok(true)
    }

    fn ensure_parent_dirs(&self, path: &Path) -> Result<()> {
        let root = self.context.workspace().path();
        if !root.exists() {
            self.context.record_mkdir();
            std::fs::create_dir_all(root).io_context("create directory", root)?;
        }

        let mut parents = path
            .ancestors()
            .skip(1)
            .filter(|parent| !parent.as_os_str().is_empty())
            .collect::<Vec<_>>();
        parents.reverse();

        for parent in parents {
            match self.context.lstat(parent)? {
                Some(metadata) if metadata.is_dir() => {}
                Some(_) => {
                    return Err(CheckoutError::io(
                        "create directory",
                        parent,
                        io::Error::from(io::ErrorKind::NotADirectory),
                    ));
                }
                None => self
                    .context
                    .make_directory(parent)
                    .io_context("create directory", parent)?,
            }
        }

        Ok(())
    }

    fn write_entry(&self, path: &Path, entry: &DatabaseEntry) -> Result<()> {
        let content = self.context.checkout_content(path, entry)?;
        let workspace = self.context.workspace();

        if entry.mode.is_symlink() {
            return workspace
                .create_symlink(path, &content)
                .io_context("create symlink", path);
        }

        workspace.write_file(path, &content).io_context("write", path)?;
        if entry.mode.is_executable() {
            self.context.set_mode(path, entry.mode)?;
        }

        Ok(())
    }

    /// Move the old spelling out of the way through a temporary sibling, so
    /// the new spelling is written fresh even where both name one entry.
    fn drop_case_twin(&self, from: &Path) -> Result<()> {
        if self.context.lstat(from)?.is_none() {
            return Ok(());
        }

        // fixed length: the old name may already sit at the filesystem limit
        let temp = from.with_file_name(format!(".bit-rename-{:016x}", rand::random::<u64>()));

        let workspace = self.context.workspace();
        workspace.rename(from, &temp).io_context("rename", from)?;
        workspace.remove_file(&temp).io_context("remove", &temp)
    }
}

fn is_locked(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::PermissionDenied | io::ErrorKind::ResourceBusy
    )
}
