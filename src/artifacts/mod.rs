//! Git data structures and checkout algorithms
//!
//! - `attributes`: `.gitattributes` rules and content filters
//! - `branch`: Branch names and revision parsing
//! - `checkout`: Three-way checkout planning and materialization
//! - `core`: Shared path helpers
//! - `database`: Database entry types
//! - `ignore`: Ignore rules
//! - `index`: Index/staging area data structures
//! - `objects`: Git object types (blob, tree, commit)

pub mod attributes;
pub mod branch;
pub mod checkout;
pub mod core;
pub mod database;
pub mod ignore;
pub mod index;
pub mod objects;
