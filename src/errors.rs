//! Error types for checkout

use crate::artifacts::checkout::action::Reason;
use crate::artifacts::checkout::conflict::ConflictType;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use std::path::{Path, PathBuf};

/// Numeric code reported for conflicts, matching git's `EMERGECONFLICT`.
pub const CONFLICT_CODE: i32 = -13;
pub const GENERIC_CODE: i32 = -1;

pub type Result<T> = std::result::Result<T, CheckoutError>;

/// A path that blocked the checkout and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictedPath {
    pub path: PathBuf,
    pub reason: Reason,
    /// Grouping used when reporting
    pub conflict_type: ConflictType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Precondition,
    Conflict,
    Cancelled,
    Io,
    Object,
}

#[derive(Debug, thiserror::Error)]
pub enum CheckoutError {
    #[error("object {oid} is a {kind}, which cannot be peeled to a tree")]
    NotTreeish { oid: ObjectId, kind: ObjectType },

    #[error("{} path(s) have unresolved merge stages: {}", paths.len(), join_paths(paths))]
    UnmergedEntries { paths: Vec<PathBuf> },

    #[error("cannot checkout into a bare repository without a target directory")]
    NoWorkdir,

    #[error("checking out into {path} requires allowing a target directory")]
    AlternateRootNotAllowed { path: PathBuf },

    #[error("{} conflict(s) prevent checkout", conflicts.len())]
    Conflict { conflicts: Vec<ConflictedPath> },

    #[error("checkout cancelled by notify callback (code {code})")]
    Cancelled { code: i32 },

    #[error("failed to {op} '{}': {source}", path.display())]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Object(#[from] anyhow::Error),
}

fn join_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|path| path.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl CheckoutError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CheckoutError::NotTreeish { .. }
            | CheckoutError::UnmergedEntries { .. }
            | CheckoutError::NoWorkdir
            | CheckoutError::AlternateRootNotAllowed { .. } => ErrorKind::Precondition,
            CheckoutError::Conflict { .. } => ErrorKind::Conflict,
            CheckoutError::Cancelled { .. } => ErrorKind::Cancelled,
            CheckoutError::Io { .. } => ErrorKind::Io,
            CheckoutError::Object(_) => ErrorKind::Object,
        }
    }

    /// Numeric result code: the callback's own value for cancellations.
    pub fn code(&self) -> i32 {
        match self {
            CheckoutError::Conflict { .. } => CONFLICT_CODE,
            CheckoutError::Cancelled { code } => *code,
            _ => GENERIC_CODE,
        }
    }

    pub fn io(op: &'static str, path: &Path, source: std::io::Error) -> Self {
        CheckoutError::Io {
            op,
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Attach the failed operation and path to an I/O error.
pub trait IoResultExt<T> {
    fn io_context(self, op: &'static str, path: &Path) -> Result<T>;
}

impl<T> IoResultExt<T> for std::io::Result<T> {
    fn io_context(self, op: &'static str, path: &Path) -> Result<T> {
        self.map_err(|source| CheckoutError::io(op, path, source))
    }
}
