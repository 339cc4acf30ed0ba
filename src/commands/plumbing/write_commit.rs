use crate::areas::repository::Repository;
use crate::artifacts::database::database_entry::DatabaseEntry;
use crate::artifacts::objects::commit::{Author, Commit};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::tree::Tree;

impl Repository {
    /// Store a commit of `tree_id` without touching any ref.
    pub fn write_commit(
        &self,
        parents: Vec<ObjectId>,
        tree_id: ObjectId,
        message: String,
    ) -> anyhow::Result<ObjectId> {
        let author = Author::load_from_env();
        let commit = Commit::new(parents, tree_id, author, message);

        self.database().store(&commit)
    }

    /// Store the resolved index entries as trees, returning the root id.
    ///
    /// Fails while the index holds unresolved stages.
    pub fn write_tree(&self) -> anyhow::Result<ObjectId> {
        if self.index().has_conflicts() {
            anyhow::bail!("cannot write a tree from an index with unresolved stages");
        }

        let tree = Tree::build(self.index().resolved_entries().map(|entry| {
            (
                entry.name.as_path(),
                DatabaseEntry::new(entry.oid.clone(), entry.mode()),
            )
        }))?;

        self.database().store_tree(&tree)
    }
}
