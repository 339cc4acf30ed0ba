use crate::areas::repository::Repository;
use crate::artifacts::branch::branch_name::BranchName;
use crate::artifacts::branch::{ANCESTOR_REGEX, PARENT_REGEX, REF_ALIASES};
use crate::artifacts::objects::OBJECT_ID_LENGTH;
use crate::artifacts::objects::object::ObjectBox;
use crate::artifacts::objects::object_id::ObjectId;
use anyhow::Context;
use std::path::{Component, PathBuf};

/// A revision expression naming a checkout target.
///
/// Supports:
/// - Branch/ref names: `main`, `feature/new-feature`, `HEAD`
/// - Aliases: `@` (resolves to `HEAD`)
/// - Full or abbreviated object ids (tried when no ref has that name)
/// - Parent notation: `<revision>^`
/// - Ancestor notation: `<revision>~<n>`
/// - Subtree notation: `<revision>:<path>`, naming a tree inside a commit
#[derive(Debug, Clone)]
pub enum Revision {
    Ref(BranchName),
    Ancestor(Box<Revision>, usize),
    Parent(Box<Revision>),
    Path(Box<Revision>, PathBuf),
}

impl Revision {
    /// Resolve to an object id (a commit, or a tree for `<rev>:<path>`).
    pub fn resolve(&self, repository: &Repository) -> anyhow::Result<Option<ObjectId>> {
        match self {
            Revision::Ref(branch_name) => {
                let name_str = branch_name.as_ref();

                if let Some(oid) = repository.refs().read_ref(name_str)? {
                    return Ok(Some(oid));
                }

                if Self::looks_like_oid(name_str) {
                    Self::resolve_oid(name_str, repository).map(Some)
                } else {
                    Err(anyhow::anyhow!("revision {} not found", name_str))
                }
            }
            Revision::Parent(base_revision) => {
                Self::resolve_commit_parent(base_revision.resolve(repository)?, repository)
            }
            Revision::Ancestor(base_revision, generations) => {
                let mut oid = base_revision.resolve(repository)?;
                for _ in 0..*generations {
                    oid = Self::resolve_commit_parent(oid, repository)?;
                }

                Ok(oid)
            }
            Revision::Path(base_revision, path) => match base_revision.resolve(repository)? {
                Some(oid) => Self::resolve_subtree(oid, path, repository).map(Some),
                None => Ok(None),
            },
        }
    }

    fn resolve_commit_parent(
        oid: Option<ObjectId>,
        repository: &Repository,
    ) -> anyhow::Result<Option<ObjectId>> {
        match oid {
            Some(oid) => {
                let commit = repository
                    .database()
                    .parse_object_as_commit(&oid)?
                    .ok_or_else(|| anyhow::anyhow!("object {} is not a commit", oid))?;

                Ok(commit.parent().cloned())
            }
            None => Ok(None),
        }
    }

    fn resolve_subtree(
        oid: ObjectId,
        path: &std::path::Path,
        repository: &Repository,
    ) -> anyhow::Result<ObjectId> {
        let mut current = match repository.database().parse_object(&oid)? {
            ObjectBox::Commit(commit) => commit.tree_oid().clone(),
            ObjectBox::Tree(_) => oid,
            ObjectBox::Blob(_) => anyhow::bail!("object {} is a blob, not a tree-ish", oid),
        };

        for component in path.components() {
            let Component::Normal(name) = component else {
                continue;
            };
            let name = name.to_string_lossy();

            let tree = repository
                .database()
                .parse_object_as_tree(&current)?
                .with_context(|| format!("path '{}' does not name a tree", path.display()))?;
            current = tree
                .entries()
                .find(|(entry_name, _)| **entry_name == name)
                .map(|(_, entry)| entry.oid.clone())
                .with_context(|| format!("path '{}' does not exist", path.display()))?;
        }

        Ok(current)
    }

    fn resolve_oid(oid_str: &str, repository: &Repository) -> anyhow::Result<ObjectId> {
        if oid_str.len() == OBJECT_ID_LENGTH {
            let oid = ObjectId::try_parse(oid_str.to_string())?;
            if !repository.database().exists(&oid) {
                anyhow::bail!("object {} not found", oid);
            }
            return Ok(oid);
        }

        let matches = repository.database().find_objects_by_prefix(oid_str)?;

        match matches.as_slice() {
            [] => anyhow::bail!(
                "ambiguous argument '{}': unknown revision or path not in the working tree",
                oid_str
            ),
            [oid] => Ok(oid.clone()),
            candidates => {
                let mut error_msg = format!(
                    "short SHA1 {} is ambiguous\nhint: The candidates are:",
                    oid_str
                );
                for oid in candidates {
                    let object_type = repository
                        .database()
                        .get_object_type(oid)
                        .map(|t| t.as_str())
                        .unwrap_or("unknown");
                    error_msg.push_str(&format!("\nhint:   {} {}", oid.to_short_oid(), object_type));
                }
                anyhow::bail!(error_msg)
            }
        }
    }

    pub fn try_parse(revision: &str) -> anyhow::Result<Revision> {
        if let Some((base, path)) = revision.split_once(':') {
            let base = if base.is_empty() { "HEAD" } else { base };
            return Ok(Revision::Path(
                Box::new(Self::try_parse(base)?),
                PathBuf::from(path),
            ));
        }

        let parent_regex = regex::Regex::new(PARENT_REGEX)
            .with_context(|| format!("invalid parent regex: {PARENT_REGEX}"))?;
        let ancestor_regex = regex::Regex::new(ANCESTOR_REGEX)
            .with_context(|| format!("invalid ancestor regex: {ANCESTOR_REGEX}"))?;

        if let Some(caps) = parent_regex.captures(revision) {
            Ok(Revision::Parent(Box::new(Self::try_parse(&caps[1])?)))
        } else if let Some(caps) = ancestor_regex.captures(revision) {
            let generations: usize = caps[2]
                .parse()
                .with_context(|| format!("failed to parse generations in revision: {revision}"))?;

            Ok(Revision::Ancestor(
                Box::new(Self::try_parse(&caps[1])?),
                generations,
            ))
        } else {
            let resolved_name = *REF_ALIASES.get(revision).unwrap_or(&revision);
            let branch_name = BranchName::try_parse(resolved_name.to_string())?;
            Ok(Revision::Ref(branch_name))
        }
    }

    fn looks_like_oid(s: &str) -> bool {
        s.len() >= 4 && s.len() <= OBJECT_ID_LENGTH && s.chars().all(|c| c.is_ascii_hexdigit())
    }
}
