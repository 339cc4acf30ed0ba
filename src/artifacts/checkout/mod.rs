//! Checkout operations and conflict handling
//!
//! A checkout makes the working tree and index match a target tree while
//! protecting local state, in three steps:
//!
//! - `planner` compares the baseline tree, the index, the target tree and
//!   the working tree and classifies every path into an `Action`
//! - `conflict` applies the strategy, turning blocked changes into conflicts
//! - `migration` writes the surviving actions to disk and `index_update`
//!   records them in the index
//!
//! Every conflict is found before anything is written.

pub mod action;
pub mod conflict;
pub mod context;
pub mod index_update;
pub mod migration;
pub mod notify;
pub mod options;
pub mod pathspec;
pub mod planner;
pub mod workdir;

use crate::artifacts::checkout::action::{Action, ActionKind};
use crate::artifacts::checkout::options::PerfData;
use std::path::PathBuf;

/// Summary of one checkout.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckoutReport {
    pub created: Vec<PathBuf>,
    pub updated: Vec<PathBuf>,
    pub deleted: Vec<PathBuf>,
    /// `(from, to)` pairs differing only in case
    pub renamed: Vec<(PathBuf, PathBuf)>,
    pub skipped: Vec<PathBuf>,
    /// Paths left in place because their directory could not be removed
    pub locked: Vec<PathBuf>,
    pub notified: usize,
    pub perfdata: PerfData,
    pub dry_run: bool,
}

impl CheckoutReport {
    /// Build a report from the actions that were (or, for a dry run, would
    /// have been) carried out.
    pub fn new<'a>(
        applied: impl IntoIterator<Item = &'a Action>,
        skipped: impl IntoIterator<Item = &'a Action>,
        dry_run: bool,
    ) -> Self {
        let mut report = CheckoutReport {
            dry_run,
            ..CheckoutReport::default()
        };

        for action in applied {
            let path = action.path.clone();
            match &action.kind {
                ActionKind::Create => report.created.push(path),
                ActionKind::Update => report.updated.push(path),
                ActionKind::Delete => report.deleted.push(path),
                ActionKind::RenameCase { from } => report.renamed.push((from.clone(), path)),
                ActionKind::Skip | ActionKind::Conflict => {}
            }
        }

        report.skipped = skipped
            .into_iter()
            .filter(|action| action.kind == ActionKind::Skip)
            .map(|action| action.path.clone())
            .collect();

        report
    }

    /// Number of paths written, removed or renamed.
    pub fn changed_count(&self) -> usize {
        self.created.len() + self.updated.len() + self.deleted.len() + self.renamed.len()
    }
}
