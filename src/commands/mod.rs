//! Command implementations
//!
//! Commands are organized into two categories following Git's architecture:
//!
//! - `plumbing`: Low-level object writers (write-tree, commit-tree)
//! - `porcelain`: User-facing workflows (add, commit, branch, checkout)
//!
//! Both extend `Repository` with methods rather than defining free functions.

pub mod plumbing;
pub mod porcelain;
