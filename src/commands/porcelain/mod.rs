//! Porcelain commands (user-facing Git operations)
//!
//! ## Commands
//!
//! - `add`: Stage files
//! - `commit`: Record the index as a new commit
//! - `branch`: Create branches
//! - `checkout`: Make the working tree and index match a tree

pub mod add;
pub mod branch;
pub mod checkout;
pub mod commit;
