use crate::areas::index::Index;
use crate::areas::workspace::Workspace;
use crate::artifacts::checkout::action::{Action, ActionKind};
use crate::artifacts::index::index_entry::IndexEntry;
use crate::errors::{CheckoutError, Result};
use std::io;
use tracing::debug;

/// Bring the index in line with the actions that reached the working tree.
///
/// Removals go first so that a path replaced by a directory (or the other
/// way around) never has both shapes staged at once. Written paths are
/// re-staged with fresh stat data and the mode of the target entry.
pub fn update_index(index: &mut Index, workspace: &Workspace, applied: &[Action]) -> Result<()> {
    for action in applied {
        match &action.kind {
            ActionKind::Delete => index.remove(&action.path)?,
            ActionKind::RenameCase { from } => index.remove(from)?,
            _ => {}
        }
    }

    for action in applied {
        if !matches!(
            action.kind,
            ActionKind::Create | ActionKind::Update | ActionKind::RenameCase { .. }
        ) {
            continue;
        }

        let entry = action.target_entry().ok_or_else(|| {
            anyhow::anyhow!("no target entry recorded for {}", action.path.display())
        })?;
        let mut metadata = workspace.stat_entry(&action.path)?.ok_or_else(|| {
            CheckoutError::io(
                "stat",
                &action.path,
                io::Error::from(io::ErrorKind::NotFound),
            )
        })?;
        metadata.mode = entry.mode;

        debug!(path = %action.path.display(), oid = %entry.oid, "staging checked out entry");
        index.add(IndexEntry::new(action.path.clone(), entry.oid, metadata))?;
    }

    Ok(())
}
