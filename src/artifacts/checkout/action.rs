use crate::artifacts::checkout::options::{DiffFile, NotifyFiles, NotifyKind};
use crate::artifacts::database::database_entry::DatabaseEntry;
use std::path::PathBuf;

/// What checkout does to a path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ActionKind {
    Create,
    Update,
    Delete,
    /// Replace `from`, which differs only in letter case, with this path
    RenameCase { from: PathBuf },
    Skip,
    Conflict,
}

/// Local state standing in the way of (or explaining) an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Reason {
    None,
    Dirty,
    Untracked,
    Ignored,
    TypeChange,
    /// The path's directory could not be removed and was skipped
    Locked,
    UnmergedBaseline,
}

/// One planned step. There is at most one per path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action {
    pub path: PathBuf,
    pub kind: ActionKind,
    pub reason: Reason,
    pub baseline: Option<DiffFile>,
    pub target: Option<DiffFile>,
    pub workdir: Option<DiffFile>,
}

impl Action {
    pub fn new(path: PathBuf, kind: ActionKind, reason: Reason) -> Self {
        Action {
            path,
            kind,
            reason,
            baseline: None,
            target: None,
            workdir: None,
        }
    }

    /// Whether executing this action changes the working tree or index.
    pub fn is_applied(&self) -> bool {
        matches!(
            self.kind,
            ActionKind::Create | ActionKind::Update | ActionKind::Delete | ActionKind::RenameCase { .. }
        )
    }

    pub fn is_conflict(&self) -> bool {
        self.kind == ActionKind::Conflict
    }

    /// Entry to write, for actions that write one.
    pub fn target_entry(&self) -> Option<DatabaseEntry> {
        let target = self.target.as_ref()?;
        Some(DatabaseEntry::new(target.oid.clone()?, target.mode))
    }

    pub fn notify_kind(&self) -> Option<NotifyKind> {
        match (&self.kind, self.reason) {
            (ActionKind::Conflict, _) => Some(NotifyKind::Conflict),
            (ActionKind::Skip, Reason::Dirty) => Some(NotifyKind::Dirty),
            (_, Reason::Untracked) => Some(NotifyKind::Untracked),
            (_, Reason::Ignored) => Some(NotifyKind::Ignored),
            (ActionKind::Skip, _) => None,
            _ => Some(NotifyKind::Updated),
        }
    }

    pub fn notify_files(&self) -> NotifyFiles<'_> {
        NotifyFiles {
            baseline: self.baseline.as_ref(),
            target: self.target.as_ref(),
            workdir: self.workdir.as_ref(),
        }
    }
}
