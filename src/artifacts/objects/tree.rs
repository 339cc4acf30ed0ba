//! Tree objects
//!
//! Trees represent directory snapshots. They contain entries for blobs
//! (regular files, executables and symlinks) and nested trees.
//!
//! ## Format
//!
//! On disk: `tree <size>\0<entries>`
//! Each entry: `<mode> <name>\0<20-byte-sha1>`
//!
//! Trees are either read back from the database (`readable_entries`) or
//! built from a flat list of paths (`writeable_entries`) before being stored.

use crate::artifacts::database::database_entry::DatabaseEntry;
use crate::artifacts::index::entry_mode::EntryMode;
use crate::artifacts::objects::object::{Object, Packable, Unpackable, frame};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use anyhow::Context;
use bytes::Bytes;
use std::collections::BTreeMap;
use std::io::{BufRead, Write};
use std::path::{Component, Path};

#[derive(Debug, Clone)]
enum TreeNode {
    Entry(DatabaseEntry),
    Directory(Tree),
}

impl TreeNode {
    fn mode(&self) -> EntryMode {
        match self {
            TreeNode::Entry(entry) => entry.mode,
            TreeNode::Directory(_) => EntryMode::Directory,
        }
    }

    fn oid(&self) -> anyhow::Result<ObjectId> {
        match self {
            TreeNode::Entry(entry) => Ok(entry.oid.clone()),
            TreeNode::Directory(tree) => tree.object_id(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Tree {
    readable_entries: BTreeMap<String, DatabaseEntry>,
    // directory keys carry a trailing '/' so that names sort the way git sorts them
    writeable_entries: BTreeMap<String, TreeNode>,
}

impl Tree {
    /// Build a tree hierarchy from a flat list of blob paths.
    pub fn build<P: AsRef<Path>>(
        entries: impl IntoIterator<Item = (P, DatabaseEntry)>,
    ) -> anyhow::Result<Self> {
        let mut root = Self::default();

        for (path, entry) in entries {
            let components = path
                .as_ref()
                .components()
                .map(|component| match component {
                    Component::Normal(name) => name
                        .to_str()
                        .map(str::to_string)
                        .context("Tree entry names must be valid UTF-8"),
                    _ => Err(anyhow::anyhow!(
                        "Invalid tree entry path {}",
                        path.as_ref().display()
                    )),
                })
                .collect::<anyhow::Result<Vec<_>>>()?;

            root.add_entry(&components, entry)?;
        }

        Ok(root)
    }

    fn add_entry(&mut self, components: &[String], entry: DatabaseEntry) -> anyhow::Result<()> {
        match components {
            [] => Err(anyhow::anyhow!("Empty tree entry path")),
            [name] => {
                self.writeable_entries
                    .insert(name.clone(), TreeNode::Entry(entry));
                Ok(())
            }
            [parent, rest @ ..] => {
                let key = format!("{parent}/");
                let node = self
                    .writeable_entries
                    .entry(key)
                    .or_insert_with(|| TreeNode::Directory(Tree::default()));

                match node {
                    TreeNode::Directory(tree) => tree.add_entry(rest, entry),
                    TreeNode::Entry(_) => unreachable!("directory keys always hold subtrees"),
                }
            }
        }
    }

    /// Visit every subtree before its parent, so child ids exist before a
    /// parent referencing them is stored.
    pub fn traverse<F>(&self, func: &mut F) -> anyhow::Result<()>
    where
        F: FnMut(&Tree) -> anyhow::Result<()>,
    {
        for node in self.writeable_entries.values() {
            if let TreeNode::Directory(tree) = node {
                tree.traverse(func)?;
            }
        }

        func(self)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&String, &DatabaseEntry)> {
        self.readable_entries.iter()
    }

    pub fn into_entries(self) -> impl Iterator<Item = (String, DatabaseEntry)> {
        self.readable_entries.into_iter()
    }
}

impl Packable for Tree {
    fn serialize(&self) -> anyhow::Result<Bytes> {
        let mut content = Vec::new();

        for (name, node) in &self.writeable_entries {
            let name = name.trim_end_matches('/');

            write!(content, "{:o} {}", node.mode().as_u32(), name)?;
            content.push(0);
            node.oid()?.write_h40_to(&mut content)?;
        }

        Ok(frame(self.object_type(), &content))
    }
}

impl Unpackable for Tree {
    fn deserialize(reader: impl BufRead) -> anyhow::Result<Self> {
        let mut entries = BTreeMap::new();
        let mut reader = reader;

        let mut mode_bytes = Vec::new();
        let mut name_bytes = Vec::new();

        loop {
            mode_bytes.clear();
            let n = reader.read_until(b' ', &mut mode_bytes)?;
            if n == 0 {
                break;
            }
            if mode_bytes.pop() != Some(b' ') {
                return Err(anyhow::anyhow!("unexpected EOF in mode"));
            }

            let mode = EntryMode::from_octal_str(std::str::from_utf8(&mode_bytes)?)?;

            name_bytes.clear();
            reader.read_until(b'\0', &mut name_bytes)?;
            if name_bytes.pop() != Some(b'\0') {
                return Err(anyhow::anyhow!("unexpected EOF in name"));
            }
            let name = std::str::from_utf8(&name_bytes)?.to_owned();

            let oid =
                ObjectId::read_h40_from(&mut reader).context("unexpected EOF in object id")?;

            entries.insert(name, DatabaseEntry::new(oid, mode));
        }

        Ok(Tree {
            readable_entries: entries,
            writeable_entries: Default::default(),
        })
    }
}

impl Object for Tree {
    fn object_type(&self) -> ObjectType {
        ObjectType::Tree
    }
}
