//! Core repository components
//!
//! - `database`: Object database for storing blobs, trees, and commits
//! - `index`: Staging area, including unresolved merge stages
//! - `refs`: Reference management (branches, HEAD, tags)
//! - `repository`: Handle owning every area of one repository
//! - `workspace`: Working directory file system operations

pub mod database;
pub mod index;
pub mod refs;
pub mod repository;
pub mod workspace;
