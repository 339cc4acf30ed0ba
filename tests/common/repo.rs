use assert_fs::TempDir;
use bit_checkout::areas::repository::Repository;
use bit_checkout::artifacts::branch::branch_name::SymRefName;
use bit_checkout::artifacts::checkout::CheckoutReport;
use bit_checkout::artifacts::checkout::options::{CheckoutOptions, CheckoutStrategy};
use bit_checkout::artifacts::database::database_entry::DatabaseEntry;
use bit_checkout::artifacts::index::entry_mode::{EntryMode, FileMode};
use bit_checkout::artifacts::objects::blob::Blob;
use bit_checkout::artifacts::objects::commit::{Author, Commit};
use bit_checkout::artifacts::objects::object_id::ObjectId;
use bit_checkout::artifacts::objects::tree::Tree;
use bytes::Bytes;
use std::path::{Path, PathBuf};

pub const REGULAR: EntryMode = EntryMode::File(FileMode::Regular);
pub const EXECUTABLE: EntryMode = EntryMode::File(FileMode::Executable);
pub const SYMLINK: EntryMode = EntryMode::Symlink;

/// A repository in a scratch directory, driven through the library API.
pub struct TestRepo {
    pub dir: TempDir,
    pub repository: Repository,
}

impl TestRepo {
    pub fn new() -> Self {
        super::redirect_temp_dir();

        let dir = TempDir::new().expect("Failed to create temp dir");
        let repository = Repository::init(dir.path()).expect("Failed to init repository");

        TestRepo { dir, repository }
    }

    /// A repository whose HEAD commit holds `files`, checked out cleanly.
    pub fn with_head(files: &[(&str, &str)]) -> Self {
        let mut repo = Self::new();
        let commit = repo.commit_files(files);
        repo.set_branch("master", &commit);
        repo.repository
            .checkout_head(CheckoutOptions::new().strategy(CheckoutStrategy::FORCE))
            .expect("Failed to check out the initial commit");

        repo
    }

    pub fn root(&self) -> PathBuf {
        self.repository
            .workdir()
            .expect("repository has a working directory")
            .to_path_buf()
    }

    pub fn path(&self, path: &str) -> PathBuf {
        self.root().join(path)
    }

    pub fn write(&self, path: &str, content: &str) {
        let path = self.path(path);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent directory");
        }
        std::fs::write(path, content).expect("Failed to write file");
    }

    pub fn read(&self, path: &str) -> String {
        std::fs::read_to_string(self.path(path))
            .unwrap_or_else(|e| panic!("Failed to read {path}: {e}"))
    }

    pub fn read_bytes(&self, path: &str) -> Vec<u8> {
        std::fs::read(self.path(path)).unwrap_or_else(|e| panic!("Failed to read {path}: {e}"))
    }

    pub fn exists(&self, path: &str) -> bool {
        self.path(path).symlink_metadata().is_ok()
    }

    pub fn remove(&self, path: &str) {
        let path = self.path(path);
        if path.is_dir() {
            std::fs::remove_dir_all(path).expect("Failed to remove directory");
        } else {
            std::fs::remove_file(path).expect("Failed to remove file");
        }
    }

    pub fn blob(&self, content: impl AsRef<[u8]>) -> ObjectId {
        let blob = Blob::new(Bytes::copy_from_slice(content.as_ref()));
        self.repository
            .database()
            .store(&blob)
            .expect("Failed to store blob")
    }

    pub fn tree(&self, files: &[(&str, &str)]) -> ObjectId {
        let files = files
            .iter()
            .map(|(path, content)| (*path, content.as_bytes(), REGULAR))
            .collect::<Vec<_>>();

        self.tree_with_modes(&files)
    }

    pub fn tree_with_modes(&self, files: &[(&str, &[u8], EntryMode)]) -> ObjectId {
        let entries = files
            .iter()
            .map(|(path, content, mode)| {
                (PathBuf::from(path), DatabaseEntry::new(self.blob(content), *mode))
            })
            .collect::<Vec<_>>();
        let tree = Tree::build(entries).expect("Failed to build tree");

        self.repository
            .database()
            .store_tree(&tree)
            .expect("Failed to store tree")
    }

    pub fn commit(&self, tree: ObjectId, parents: Vec<ObjectId>) -> ObjectId {
        let commit = Commit::new(
            parents,
            tree,
            Author::load_from_env(),
            "test commit".to_string(),
        );

        self.repository
            .database()
            .store(&commit)
            .expect("Failed to store commit")
    }

    pub fn commit_files(&self, files: &[(&str, &str)]) -> ObjectId {
        let tree = self.tree(files);
        let parents = self
            .repository
            .refs()
            .read_head()
            .expect("Failed to read HEAD")
            .into_iter()
            .collect();

        self.commit(tree, parents)
    }

    pub fn set_branch(&self, name: &str, oid: &ObjectId) {
        self.repository
            .refs()
            .update_ref(&SymRefName::new(format!("refs/heads/{name}")), oid)
            .expect("Failed to update branch");
    }

    /// A branch `name` pointing at a new commit holding `files`.
    pub fn branch_with(&self, name: &str, files: &[(&str, &str)]) -> ObjectId {
        let commit = self.commit_files(files);
        self.set_branch(name, &commit);
        commit
    }

    pub fn checkout(
        &mut self,
        target: &str,
        options: CheckoutOptions<'_>,
    ) -> bit_checkout::errors::Result<CheckoutReport> {
        self.repository.checkout(target, options)
    }

    pub fn safe(&mut self, target: &str) -> bit_checkout::errors::Result<CheckoutReport> {
        self.checkout(target, CheckoutOptions::new().strategy(CheckoutStrategy::SAFE))
    }

    pub fn force(&mut self, target: &str) -> bit_checkout::errors::Result<CheckoutReport> {
        self.checkout(target, CheckoutOptions::new().strategy(CheckoutStrategy::FORCE))
    }

    /// Paths staged at stage 0, as slash-separated strings.
    pub fn index_paths(&self) -> Vec<String> {
        self.repository
            .index()
            .resolved_entries()
            .map(|entry| entry.name.to_string_lossy().into_owned())
            .collect()
    }

    pub fn index_oid(&self, path: &str) -> Option<ObjectId> {
        self.repository
            .index()
            .entry_by_path(Path::new(path))
            .map(|entry| entry.oid.clone())
    }

    /// A fresh handle over the same directory, with the index read from disk.
    pub fn reopen(&self) -> Repository {
        Repository::open(self.root()).expect("Failed to reopen repository")
    }
}

pub fn paths(paths: &[PathBuf]) -> Vec<String> {
    paths
        .iter()
        .map(|path| path.to_string_lossy().into_owned())
        .collect()
}
