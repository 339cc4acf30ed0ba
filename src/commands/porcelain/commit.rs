use crate::areas::repository::Repository;
use crate::artifacts::objects::object_id::ObjectId;

impl Repository {
    /// Commit the index on top of HEAD and advance the current branch (or
    /// the detached HEAD).
    pub fn commit(&mut self, message: &str) -> anyhow::Result<ObjectId> {
        let tree_id = self.write_tree()?;
        let parent = self.refs().read_head()?;
        let is_root = match parent {
            Some(_) => "",
            None => "(root-commit) ",
        };

        let commit_id = self.write_commit(
            parent.into_iter().collect(),
            tree_id,
            message.trim().to_string(),
        )?;

        let current_ref = self.refs().current_ref()?;
        if current_ref.is_detached_head() {
            self.refs().set_head_detached(&commit_id)?;
        } else {
            self.refs().update_ref(&current_ref, &commit_id)?;
        }

        // a written index makes HEAD the baseline of the next checkout
        self.index_mut().write_updates()?;

        eprintln!(
            "[{}{}] {}",
            is_root,
            commit_id.to_short_oid(),
            message.trim().lines().next().unwrap_or_default()
        );

        Ok(commit_id)
    }
}
