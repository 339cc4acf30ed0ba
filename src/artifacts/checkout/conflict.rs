use crate::artifacts::checkout::action::{Action, ActionKind, Reason};
use crate::artifacts::checkout::options::CheckoutStrategy;
use crate::errors::ConflictedPath;

/// Apply the strategy to a planned action, turning blocked changes into
/// conflicts and optional removals into deletions.
pub fn resolve(mut action: Action, strategy: CheckoutStrategy) -> Action {
    let force = strategy.contains(CheckoutStrategy::FORCE);
    let has_target = action.target.is_some();
    let workdir_missing = action.workdir.is_none();
    let workdir_is_dir = action
        .workdir
        .as_ref()
        .is_some_and(|file| file.mode.is_tree());

    let kind = match (&action.kind, action.reason) {
        (kind, Reason::None | Reason::UnmergedBaseline) => kind.clone(),
        (ActionKind::Skip, Reason::Untracked) => {
            if strategy.contains(CheckoutStrategy::REMOVE_UNTRACKED) {
                ActionKind::Delete
            } else {
                ActionKind::Skip
            }
        }
        (ActionKind::Skip, Reason::Ignored) => {
            if strategy.contains(CheckoutStrategy::REMOVE_IGNORED) {
                ActionKind::Delete
            } else {
                ActionKind::Skip
            }
        }
        (ActionKind::Skip, Reason::Dirty) => {
            if force {
                if has_target {
                    ActionKind::Update
                } else {
                    ActionKind::Delete
                }
            } else if strategy.contains(CheckoutStrategy::RECREATE_MISSING)
                && has_target
                && workdir_missing
            {
                ActionKind::Update
            } else {
                ActionKind::Skip
            }
        }
        (ActionKind::Skip, _) => ActionKind::Skip,
        (kind, Reason::Ignored) => {
            let overwrite = force
                || !strategy.contains(CheckoutStrategy::DONT_OVERWRITE_IGNORED)
                || (*kind == ActionKind::Delete
                    && strategy.contains(CheckoutStrategy::REMOVE_IGNORED));
            if overwrite {
                kind.clone()
            } else {
                if workdir_is_dir {
                    action.reason = Reason::TypeChange;
                }
                ActionKind::Conflict
            }
        }
        (kind, Reason::Untracked) => {
            if force
                || (*kind == ActionKind::Delete
                    && strategy.contains(CheckoutStrategy::REMOVE_UNTRACKED))
            {
                kind.clone()
            } else {
                ActionKind::Conflict
            }
        }
        (kind, _) => {
            if force {
                kind.clone()
            } else {
                ActionKind::Conflict
            }
        }
    };

    action.kind = match kind {
        ActionKind::Create if strategy.contains(CheckoutStrategy::UPDATE_ONLY) => ActionKind::Skip,
        ActionKind::Update if strategy.contains(CheckoutStrategy::UPDATE_ONLY) && workdir_missing => {
            ActionKind::Skip
        }
        kind => kind,
    };

    action
}

/// Conflicting paths in plan order.
pub fn conflicts(actions: &[Action]) -> Vec<ConflictedPath> {
    actions
        .iter()
        .filter(|action| action.is_conflict())
        .map(|action| ConflictedPath {
            path: action.path.clone(),
            reason: action.reason,
            conflict_type: ConflictType::of(action),
        })
        .collect()
}

#[derive(Debug)]
pub struct ConflictMessage {
    pub header: &'static str,
    pub footer: &'static str,
}

impl From<&ConflictType> for ConflictMessage {
    fn from(value: &ConflictType) -> Self {
        match value {
            ConflictType::StaleFile => Self {
                header: "Your local changes to the following files would be overwritten by checkout:",
                footer: "Please commit your changes or stash them before you switch branches.",
            },
            ConflictType::StaleDirectory => Self {
                header: "Updating the following directories would lose untracked files in them:",
                footer: "\n",
            },
            ConflictType::UntrackedOverwritten => Self {
                header: "The following untracked working tree files would be overwritten by checkout:",
                footer: "Please move or remove them before you switch branches.",
            },
            ConflictType::UntrackedRemoved => Self {
                header: "The following untracked working tree files would be removed by checkout:",
                footer: "Please move or remove them before you switch branches.",
            },
        }
    }
}

/// Groups conflicts for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ConflictType {
    StaleFile,
    StaleDirectory,
    UntrackedOverwritten,
    UntrackedRemoved,
}

impl ConflictType {
    pub fn of(action: &Action) -> ConflictType {
        let workdir_is_dir = action
            .workdir
            .as_ref()
            .is_some_and(|file| file.mode.is_tree());

        match action.reason {
            Reason::Untracked | Reason::Ignored if action.target.is_some() => {
                ConflictType::UntrackedOverwritten
            }
            Reason::Untracked | Reason::Ignored => ConflictType::UntrackedRemoved,
            Reason::TypeChange if workdir_is_dir => ConflictType::StaleDirectory,
            _ => ConflictType::StaleFile,
        }
    }
}
