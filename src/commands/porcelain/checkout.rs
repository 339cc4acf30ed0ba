use crate::areas::index::Index;
use crate::areas::repository::Repository;
use crate::areas::workspace::Workspace;
use crate::artifacts::branch::branch_name::SymRefName;
use crate::artifacts::branch::revision::Revision;
use crate::artifacts::checkout::CheckoutReport;
use crate::artifacts::checkout::conflict;
use crate::artifacts::checkout::context::CheckoutContext;
use crate::artifacts::checkout::index_update::update_index;
use crate::artifacts::checkout::migration::{Migration, MigrationFailure, MigrationOutcome};
use crate::artifacts::checkout::notify::notify_all;
use crate::artifacts::checkout::options::{CheckoutOptions, CheckoutStrategy};
use crate::artifacts::checkout::pathspec::Pathspec;
use crate::artifacts::checkout::planner::{Planner, TreeListing};
use crate::artifacts::checkout::workdir::{WorkdirSnapshot, ancestor_dirs};
use crate::artifacts::objects::object::ObjectBox;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use crate::errors::{CheckoutError, Result};
use tracing::{info, warn};

const DETACHMENT_NOTICE: &str = r#"
You are in 'detached HEAD' state. You can look around, make experimental
changes and commit them, and you can discard any commits you make in this
state without impacting any branches by performing another checkout.

If you want to create a new branch to retain commits you create, you may
do so (now or later) by using the branch command. Example:

    bit-checkout branch <new-branch-name>
"#;

impl Repository {
    /// Check out the tree a revision names. HEAD is left where it is.
    pub fn checkout(&mut self, target: &str, options: CheckoutOptions<'_>) -> Result<CheckoutReport> {
        let target_oid = self.resolve_revision(target)?;
        self.checkout_tree(&target_oid, options)
    }

    /// Make the working tree and index match the tree of HEAD.
    pub fn checkout_head(&mut self, options: CheckoutOptions<'_>) -> Result<CheckoutReport> {
        let head_oid = self
            .refs()
            .read_head()?
            .ok_or_else(|| anyhow::anyhow!("HEAD does not point to a commit yet"))?;

        self.checkout_tree(&head_oid, options)
    }

    /// Check out a commit or tree.
    ///
    /// All conflicts are detected (and notified) before the first write;
    /// when any remain under the chosen strategy, the call fails with
    /// `CheckoutError::Conflict` and nothing is changed.
    pub fn checkout_tree(
        &mut self,
        treeish: &ObjectId,
        mut options: CheckoutOptions<'_>,
    ) -> Result<CheckoutReport> {
        let strategy = options.strategy;
        let alternate_root = options.target_directory.is_some();

        let output = match (&options.target_directory, self.workspace()) {
            (Some(path), _) if !options.allow_target_directory => {
                return Err(CheckoutError::AlternateRootNotAllowed { path: path.clone() });
            }
            (Some(path), _) => Workspace::new(path.clone().into_boxed_path()),
            (None, Some(workspace)) => workspace.clone(),
            (None, None) => return Err(CheckoutError::NoWorkdir),
        };

        let target_tree = self.peel_to_tree(treeish)?;

        if !strategy.contains(CheckoutStrategy::NO_REFRESH) {
            self.index_mut().rehydrate()?;
        }

        // an alternate root has nothing staged for it
        let detached_index = Index::new(output.path().join(".bit-unused-index").into_boxed_path());
        let index = if alternate_root {
            &detached_index
        } else {
            self.index()
        };

        let baseline = self.baseline_listing(alternate_root)?;
        let target = self.database().flatten_tree(&target_tree)?;
        let pathspec = Pathspec::new(
            &options.paths,
            strategy.contains(CheckoutStrategy::DISABLE_PATHSPEC_MATCH),
        );

        let unmerged = index
            .conflicted_paths()
            .into_iter()
            .filter(|path| pathspec.matches(path))
            .collect::<Vec<_>>();
        if !unmerged.is_empty() && !strategy.contains(CheckoutStrategy::FORCE) {
            return Err(CheckoutError::UnmergedEntries { paths: unmerged });
        }

        let context = CheckoutContext::new(self, index, &options, output.clone(), pathspec, alternate_root)?;

        let tracked_dirs = ancestor_dirs(
            baseline
                .keys()
                .chain(target.keys())
                .map(|key| key.as_path())
                .chain(index.entries().map(|entry| entry.name.as_path())),
        );
        let snapshot = WorkdirSnapshot::scan(&context, &tracked_dirs)?;

        let actions = Planner::new(&context, &baseline, &target, &snapshot)
            .plan()?
            .into_iter()
            .map(|action| conflict::resolve(action, strategy))
            .collect::<Vec<_>>();

        let notified = notify_all(&actions, options.notify_flags, options.notify_callback.as_mut())?;

        let conflicts = conflict::conflicts(&actions);
        if !conflicts.is_empty() {
            info!(count = conflicts.len(), "checkout blocked by conflicts");
            return Err(CheckoutError::Conflict { conflicts });
        }

        let dry_run = strategy.is_dry_run();
        let (outcome, failure) = if dry_run {
            let outcome = MigrationOutcome {
                applied: actions.iter().filter(|action| action.is_applied()).cloned().collect(),
                locked: Vec::new(),
            };
            (outcome, None)
        } else {
            match Migration::new(&context, &actions).apply(options.progress_callback.as_mut()) {
                Ok(outcome) => (outcome, None),
                Err(MigrationFailure { outcome, error }) => (outcome, Some(error)),
            }
        };

        let perfdata = context.perfdata();
        drop(context);

        let updates_index = !dry_run
            && !alternate_root
            && !strategy.contains(CheckoutStrategy::DONT_UPDATE_INDEX);
        if updates_index {
            update_index(self.index_mut(), &output, &outcome.applied)?;
        }

        // paths already on disk stay recorded in memory; the file is left as it was
        if let Some(error) = failure {
            warn!(applied = outcome.applied.len(), %error, "checkout stopped partway");
            return Err(error);
        }

        if updates_index && !strategy.contains(CheckoutStrategy::DONT_WRITE_INDEX) {
            self.index_mut().write_updates()?;
        }

        if let Some(callback) = options.perfdata_callback.as_mut() {
            callback(&perfdata);
        }

        let mut report = CheckoutReport::new(
            &outcome.applied,
            actions.iter().chain(&outcome.locked),
            dry_run,
        );
        report.locked = outcome.locked.into_iter().map(|action| action.path).collect();
        report.notified = notified;
        report.perfdata = perfdata;

        info!(
            changed = report.changed_count(),
            skipped = report.skipped.len(),
            dry_run,
            "checkout finished"
        );

        Ok(report)
    }

    /// Check out `target` and move HEAD to it: onto the branch when `target`
    /// names one, detached at the commit otherwise.
    ///
    /// Dry runs, alternate roots and targets naming a bare tree leave HEAD
    /// alone.
    pub fn switch(&mut self, target: &str, options: CheckoutOptions<'_>) -> Result<CheckoutReport> {
        let moves_head = options.target_directory.is_none() && !options.strategy.is_dry_run();
        let current_ref = self.refs().current_ref()?;
        let current_oid = self.refs().read_head()?;

        let target_oid = self.resolve_revision(target)?;
        let report = self.checkout_tree(&target_oid, options)?;

        if !moves_head || self.database().get_object_type(&target_oid)? != ObjectType::Commit {
            return Ok(report);
        }

        match self.refs().branch_ref(target) {
            Some(branch) => self.refs().set_head_to_branch(&branch)?,
            None => self.refs().set_head_detached(&target_oid)?,
        }
        let new_ref = self.refs().current_ref()?;

        if let Some(current_oid) = &current_oid {
            self.print_previous_head(&current_ref, current_oid, &target_oid)?;
        }
        self.print_detachment_notice(&current_ref, &new_ref, target);
        self.print_new_head(&current_ref, &new_ref, &target_oid, target)?;

        Ok(report)
    }

    fn resolve_revision(&self, target: &str) -> Result<ObjectId> {
        let revision = Revision::try_parse(target)?;

        Ok(revision
            .resolve(self)?
            .ok_or_else(|| anyhow::anyhow!("revision {target} could not be resolved"))?)
    }

    fn peel_to_tree(&self, oid: &ObjectId) -> Result<ObjectId> {
        match self.database().parse_object(oid)? {
            ObjectBox::Commit(commit) => Ok(commit.tree_oid().clone()),
            ObjectBox::Tree(_) => Ok(oid.clone()),
            ObjectBox::Blob(_) => Err(CheckoutError::NotTreeish {
                oid: oid.clone(),
                kind: ObjectType::Blob,
            }),
        }
    }

    /// The snapshot the working tree is assumed to derive from: the tree of
    /// HEAD, or nothing when no index has been written yet, HEAD is unborn
    /// or the output goes elsewhere.
    fn baseline_listing(&self, alternate_root: bool) -> Result<TreeListing> {
        if alternate_root || !self.index().exists_on_disk() {
            return Ok(TreeListing::new());
        }

        match self.refs().read_head()? {
            Some(head_oid) => {
                let tree_oid = self.peel_to_tree(&head_oid)?;
                Ok(self.database().flatten_tree(&tree_oid)?)
            }
            None => Ok(TreeListing::new()),
        }
    }

    fn print_previous_head(
        &self,
        current_ref: &SymRefName,
        current_oid: &ObjectId,
        target_oid: &ObjectId,
    ) -> anyhow::Result<()> {
        if current_ref.is_detached_head() && current_oid != target_oid {
            self.print_head_position("Previous HEAD position was", current_oid)?;
        }

        Ok(())
    }

    fn print_detachment_notice(&self, current_ref: &SymRefName, new_ref: &SymRefName, target: &str) {
        if !current_ref.is_detached_head() && new_ref.is_detached_head() {
            eprintln!("Note: checking out '{}'.\n{}", target, DETACHMENT_NOTICE);
        }
    }

    fn print_new_head(
        &self,
        current_ref: &SymRefName,
        new_ref: &SymRefName,
        target_oid: &ObjectId,
        target: &str,
    ) -> anyhow::Result<()> {
        if new_ref.is_detached_head() {
            self.print_head_position("HEAD is now at", target_oid)?;
        } else if new_ref == current_ref {
            eprintln!("Already on '{}'", target);
        } else {
            eprintln!("Switched to branch '{}'", target);
        }

        Ok(())
    }

    fn print_head_position(&self, message: &str, oid: &ObjectId) -> anyhow::Result<()> {
        let commit = self
            .database()
            .parse_object_as_commit(oid)?
            .ok_or_else(|| anyhow::anyhow!("object is not a commit"))?;
        let short_oid = oid.to_short_oid();

        eprintln!("{} {} {}", message, short_oid, commit.short_message());
        Ok(())
    }
}
