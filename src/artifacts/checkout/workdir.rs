use crate::artifacts::checkout::context::CheckoutContext;
use crate::artifacts::core::PathKey;
use crate::artifacts::index::entry_mode::EntryMode;
use crate::artifacts::index::index_entry::EntryMetadata;
use crate::errors::Result;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

/// What the working tree holds at one path.
#[derive(Debug, Clone)]
pub struct WorkdirEntry {
    pub metadata: EntryMetadata,
    /// Directories holding tracked paths are walked; others stand for their
    /// whole content
    pub descended: bool,
}

impl WorkdirEntry {
    pub fn mode(&self) -> EntryMode {
        self.metadata.mode
    }

    pub fn is_dir(&self) -> bool {
        self.metadata.is_directory()
    }
}

/// The working tree as observed once, before planning.
#[derive(Debug, Default)]
pub struct WorkdirSnapshot {
    entries: BTreeMap<PathKey, WorkdirEntry>,
}

impl WorkdirSnapshot {
    /// Walk the output directory, entering only directories in `tracked_dirs`.
    pub fn scan(context: &CheckoutContext<'_>, tracked_dirs: &HashSet<PathBuf>) -> Result<Self> {
        let workspace = context.workspace();
        let walked = workspace.walk(|dir| tracked_dirs.contains(dir))?;
        context.record_stats(walked.len());

        let mut entries = BTreeMap::new();
        for (path, metadata) in walked {
            let abs_path = workspace.abs_path(&path);
            let metadata = EntryMetadata::try_from((abs_path.as_path(), metadata))?;
            let descended = metadata.is_directory() && tracked_dirs.contains(&path);

            entries.insert(
                PathKey::from(path),
                WorkdirEntry {
                    metadata,
                    descended,
                },
            );
        }

        Ok(WorkdirSnapshot { entries })
    }

    pub fn get(&self, path: &Path) -> Option<&WorkdirEntry> {
        self.entries.get(&PathKey::from(path))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Path, &WorkdirEntry)> {
        self.entries.iter().map(|(key, entry)| (key.as_path(), entry))
    }

    /// Entries strictly beneath `dir`, in byte order.
    pub fn descendants<'s>(
        &'s self,
        dir: &Path,
    ) -> impl Iterator<Item = (&'s Path, &'s WorkdirEntry)> + 's {
        let mut prefix = dir.as_os_str().as_encoded_bytes().to_vec();
        prefix.push(b'/');
        let start = PathKey::from(PathBuf::from(String::from_utf8_lossy(&prefix).into_owned()));

        self.entries
            .range(start..)
            .take_while(move |(key, _)| key.as_path().as_os_str().as_encoded_bytes().starts_with(&prefix))
            .map(|(key, entry)| (key.as_path(), entry))
    }
}

/// Every directory that is an ancestor of one of `paths`.
pub fn ancestor_dirs<'p>(paths: impl IntoIterator<Item = &'p Path>) -> HashSet<PathBuf> {
    paths
        .into_iter()
        .flat_map(|path| {
            path.ancestors()
                .skip(1)
                .filter(|ancestor| !ancestor.as_os_str().is_empty())
        })
        .map(Path::to_path_buf)
        .collect()
}
