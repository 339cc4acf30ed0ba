use crate::areas::repository::Repository;
use crate::artifacts::index::index_entry::IndexEntry;
use crate::artifacts::objects::blob::Blob;
use std::path::Path;

impl Repository {
    /// Stage files (directories are expanded) and persist the index.
    ///
    /// Paths are relative to the working directory root, or absolute paths
    /// inside it.
    pub fn add<P: AsRef<Path>>(&mut self, paths: &[P]) -> anyhow::Result<()> {
        let workspace = self
            .workspace()
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("cannot add files in a bare repository"))?;

        let mut files = Vec::new();
        for path in paths {
            let path = path.as_ref();
            let relative_path = if path.is_absolute() {
                path.strip_prefix(workspace.path())?
            } else {
                path
            };
            files.extend(workspace.list_files(relative_path)?);
        }

        for file in files {
            let metadata = workspace
                .stat_entry(&file)?
                .ok_or_else(|| anyhow::anyhow!("{} vanished while staging", file.display()))?;
            let content = workspace.read_content(&file, metadata.mode)?;
            let blob_id = self.database().store(&Blob::new(content))?;

            self.index_mut().add(IndexEntry::new(file, blob_id, metadata))?;
        }

        self.index_mut().write_updates()
    }
}
