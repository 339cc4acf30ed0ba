//! Git object model
//!
//! - **Blob**: file content (raw bytes, or a symlink target)
//! - **Tree**: directory listing (names, modes and object IDs)
//! - **Commit**: snapshot pointing to a tree, with parents and signatures
//!
//! All objects are framed as `<type> <size>\0<content>` before hashing and
//! compression.

pub mod blob;
pub mod commit;
pub mod object;
pub mod object_id;
pub mod object_type;
pub mod tree;

/// Length of a SHA-1 hash in hexadecimal format
pub const OBJECT_ID_LENGTH: usize = 40;
