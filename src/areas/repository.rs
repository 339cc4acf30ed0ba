use crate::areas::database::Database;
use crate::areas::index::Index;
use crate::areas::refs::Refs;
use crate::areas::workspace::Workspace;
use crate::artifacts::branch::branch_name::SymRefName;
use anyhow::Context;
use std::path::{Path, PathBuf};

pub const GIT_DIR_NAME: &str = ".git";
pub const DEFAULT_BRANCH: &str = "master";

/// Handle over one repository: its object database, refs, staging index and
/// (unless bare) working directory.
///
/// The handle owns the in-memory index; commands mutate it through
/// `index_mut` and decide themselves when to persist it.
#[derive(Debug)]
pub struct Repository {
    git_dir: Box<Path>,
    workspace: Option<Workspace>,
    index: Index,
    database: Database,
    refs: Refs,
    /// Ignore patterns registered at runtime, consulted after the files on disk
    ignore_rules: Vec<String>,
}

impl Repository {
    fn from_git_dir(git_dir: PathBuf, workdir: Option<PathBuf>) -> Self {
        let index = Index::new(git_dir.join("index").into_boxed_path());
        let database = Database::new(git_dir.join("objects").into_boxed_path());
        let refs = Refs::new(git_dir.clone().into_boxed_path());

        Repository {
            git_dir: git_dir.into_boxed_path(),
            workspace: workdir.map(|path| Workspace::new(path.into_boxed_path())),
            index,
            database,
            refs,
            ignore_rules: Vec::new(),
        }
    }

    /// Create an empty repository with a working directory at `path`.
    ///
    /// No index file is written: until the first checkout or commit the
    /// baseline is empty.
    pub fn init(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        std::fs::create_dir_all(path.as_ref())
            .with_context(|| format!("failed to create {}", path.as_ref().display()))?;
        let workdir = path.as_ref().canonicalize()?;

        Self::init_layout(&workdir.join(GIT_DIR_NAME))?;
        Ok(Self::from_git_dir(workdir.join(GIT_DIR_NAME), Some(workdir)))
    }

    /// Create an empty repository without a working directory.
    pub fn init_bare(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        std::fs::create_dir_all(path.as_ref())
            .with_context(|| format!("failed to create {}", path.as_ref().display()))?;
        let git_dir = path.as_ref().canonicalize()?;

        Self::init_layout(&git_dir)?;
        Ok(Self::from_git_dir(git_dir, None))
    }

    fn init_layout(git_dir: &Path) -> anyhow::Result<()> {
        std::fs::create_dir_all(git_dir.join("objects"))
            .context("Failed to create objects directory")?;
        std::fs::create_dir_all(git_dir.join("refs").join("heads"))
            .context("Failed to create refs/heads directory")?;
        std::fs::create_dir_all(git_dir.join("refs").join("tags"))
            .context("Failed to create refs/tags directory")?;
        std::fs::create_dir_all(git_dir.join("info"))
            .context("Failed to create info directory")?;

        let refs = Refs::new(git_dir.to_path_buf().into_boxed_path());
        if !refs.head_path().exists() {
            refs.set_head_to_branch(&SymRefName::new(format!("refs/heads/{DEFAULT_BRANCH}")))
                .context("Failed to create initial HEAD reference")?;
        }

        Ok(())
    }

    /// Open the repository at `path`: either a working directory holding
    /// `.git`, or a bare git directory. The index is loaded eagerly.
    pub fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path
            .as_ref()
            .canonicalize()
            .with_context(|| format!("no such directory {}", path.as_ref().display()))?;

        let mut repository = if path.join(GIT_DIR_NAME).is_dir() {
            Self::from_git_dir(path.join(GIT_DIR_NAME), Some(path))
        } else if path.join("HEAD").is_file() && path.join("objects").is_dir() {
            Self::from_git_dir(path, None)
        } else {
            anyhow::bail!("not a git repository: {}", path.display());
        };

        repository.index.rehydrate()?;
        Ok(repository)
    }

    pub fn git_dir(&self) -> &Path {
        &self.git_dir
    }

    /// Working directory root, `None` for bare repositories.
    pub fn workdir(&self) -> Option<&Path> {
        self.workspace.as_ref().map(Workspace::path)
    }

    pub fn is_bare(&self) -> bool {
        self.workspace.is_none()
    }

    pub fn workspace(&self) -> Option<&Workspace> {
        self.workspace.as_ref()
    }

    pub fn index(&self) -> &Index {
        &self.index
    }

    pub fn index_mut(&mut self) -> &mut Index {
        &mut self.index
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    pub fn refs(&self) -> &Refs {
        &self.refs
    }

    pub fn ignore_rules(&self) -> &[String] {
        &self.ignore_rules
    }

    /// Register extra ignore patterns, one per line, for this handle only.
    pub fn add_ignore_rule(&mut self, rules: &str) {
        self.ignore_rules.extend(
            rules
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string),
        );
    }

    pub fn clear_ignore_rules(&mut self) {
        self.ignore_rules.clear();
    }
}
