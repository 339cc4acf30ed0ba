//! Plumbing commands (low-level Git operations)
//!
//! - `write-tree`: Store the resolved index entries as a tree hierarchy
//! - `commit-tree`: Store a commit pointing at a tree

pub mod write_commit;
