use crate::areas::repository::Repository;
use crate::artifacts::branch::branch_name::BranchName;
use crate::artifacts::branch::revision::Revision;
use crate::artifacts::objects::object_id::ObjectId;

impl Repository {
    /// Create a branch at `source_revision`, or at HEAD when none is given.
    pub fn branch(
        &mut self,
        branch_name: &str,
        source_revision: Option<&str>,
    ) -> anyhow::Result<ObjectId> {
        let branch_name = BranchName::try_parse(branch_name.to_string())?;
        let sym_ref = branch_name.to_sym_ref_name();

        if self.refs().branch_ref(branch_name.as_ref()).is_some() {
            anyhow::bail!("a branch named '{}' already exists", branch_name);
        }

        let source_oid = match source_revision {
            Some(source_revision) => Revision::try_parse(source_revision)?.resolve(self)?,
            None => self.refs().read_head()?,
        }
        .ok_or_else(|| anyhow::anyhow!("no current HEAD to branch from"))?;

        self.refs().update_ref(&sym_ref, &source_oid)?;

        Ok(source_oid)
    }
}
