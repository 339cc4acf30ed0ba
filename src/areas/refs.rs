//! Git references (branches and HEAD)
//!
//! References are text files under the git directory holding either a
//! 40-character object id or `ref: <name>` for a symbolic reference.

use crate::artifacts::branch::branch_name::{BranchName, SymRefName};
use crate::artifacts::objects::object_id::ObjectId;
use anyhow::Context;
use derive_new::new;
use file_guard::Lock;
use std::io::Write;
use std::ops::DerefMut;
use std::path::Path;

#[derive(Debug, new)]
pub struct Refs {
    /// Path to the git directory
    path: Box<Path>,
}

const SYMREF_REGEX: &str = r"^ref: (.+)$";

pub const HEAD_REF_NAME: &str = "HEAD";

#[derive(Debug, Clone)]
enum SymRefOrOid {
    SymRef { sym_ref_name: SymRefName },
    Oid(ObjectId),
}

impl SymRefOrOid {
    fn read_symref_or_oid(path: &Path) -> anyhow::Result<Option<SymRefOrOid>> {
        if !path.is_file() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path)?;
        let content = content.trim();

        if content.is_empty() {
            return Ok(None);
        }

        let symref_regex = regex::Regex::new(SYMREF_REGEX)
            .with_context(|| format!("invalid symref regex: {SYMREF_REGEX}"))?;

        match symref_regex.captures(content) {
            Some(symref_match) => Ok(Some(SymRefOrOid::SymRef {
                sym_ref_name: SymRefName::new(symref_match[1].to_string()),
            })),
            None => Ok(Some(SymRefOrOid::Oid(ObjectId::try_parse(
                content.to_string(),
            )?))),
        }
    }
}

impl Refs {
    /// Follow HEAD through symbolic refs and return the last name in the chain.
    ///
    /// `HEAD` itself is returned when it is detached.
    pub fn current_ref(&self) -> anyhow::Result<SymRefName> {
        let mut current = SymRefName::new(HEAD_REF_NAME.to_string());

        loop {
            match SymRefOrOid::read_symref_or_oid(&self.path.join(current.as_ref_path()))? {
                Some(SymRefOrOid::SymRef { sym_ref_name }) => current = sym_ref_name,
                Some(SymRefOrOid::Oid(_)) | None => return Ok(current),
            }
        }
    }

    /// Commit HEAD resolves to, or `None` on an unborn branch.
    pub fn read_head(&self) -> anyhow::Result<Option<ObjectId>> {
        self.read_symref(&self.head_path())
    }

    fn read_symref(&self, path: &Path) -> anyhow::Result<Option<ObjectId>> {
        match SymRefOrOid::read_symref_or_oid(path)? {
            Some(SymRefOrOid::SymRef { sym_ref_name }) => {
                self.read_symref(&self.path.join(sym_ref_name.as_ref_path()))
            }
            Some(SymRefOrOid::Oid(oid)) => Ok(Some(oid)),
            None => Ok(None),
        }
    }

    /// Resolve a short or full ref name, searching the git directory,
    /// `refs/`, `refs/heads/` and `refs/tags/` in that order.
    pub fn read_ref(&self, name: &str) -> anyhow::Result<Option<ObjectId>> {
        match self.find_ref_path(name) {
            Some(path) => self.read_symref(&path),
            None => Ok(None),
        }
    }

    /// Branch ref for a short name, when such a branch exists.
    pub fn branch_ref(&self, name: &str) -> Option<SymRefName> {
        let branch = BranchName::try_parse(name.to_string()).ok()?;
        let sym_ref = branch.to_sym_ref_name();

        self.path
            .join(sym_ref.as_ref_path())
            .is_file()
            .then_some(sym_ref)
    }

    fn find_ref_path(&self, name: &str) -> Option<Box<Path>> {
        [
            self.path.to_path_buf(),
            self.path.join("refs"),
            self.path.join("refs").join("heads"),
            self.path.join("refs").join("tags"),
        ]
        .iter()
        .map(|base_path| base_path.join(name).into_boxed_path())
        .find(|path| path.is_file())
    }

    pub fn update_ref(&self, name: &SymRefName, oid: &ObjectId) -> anyhow::Result<()> {
        self.update_ref_file(
            self.path.join(name.as_ref_path()).into_boxed_path(),
            oid.as_ref().to_string(),
        )
    }

    pub fn set_head_to_branch(&self, branch: &SymRefName) -> anyhow::Result<()> {
        self.update_ref_file(self.head_path(), format!("ref: {}", branch.as_ref_path()))
    }

    pub fn set_head_detached(&self, oid: &ObjectId) -> anyhow::Result<()> {
        self.update_ref_file(self.head_path(), oid.as_ref().to_string())
    }

    /// Write a ref file under an exclusive lock, creating parent directories.
    pub fn update_ref_file(&self, path: Box<Path>, raw_ref: String) -> anyhow::Result<()> {
        std::fs::create_dir_all(path.parent().with_context(|| {
            format!(
                "failed to create parent directories for ref file at {:?}",
                path
            )
        })?)?;

        let mut ref_file = std::fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)
            .with_context(|| format!("failed to open ref file at {:?}", path))?;
        let mut lock = file_guard::lock(&mut ref_file, Lock::Exclusive, 0, 1)?;
        lock.deref_mut().write_all(raw_ref.as_bytes())?;
        lock.deref_mut().write_all(b"\n")?;

        Ok(())
    }

    pub fn head_path(&self) -> Box<Path> {
        self.path.join(HEAD_REF_NAME).into_boxed_path()
    }
}
