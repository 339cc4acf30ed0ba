//! Three-way checkout engine for git repositories.
//!
//! The crate reconciles four views of a repository (the baseline tree, the
//! staging index, the target tree and the working directory) and materializes
//! the target onto disk without clobbering local work unless asked to.
//!
//! ```ignore
//! use bit_checkout::areas::repository::Repository;
//! use bit_checkout::artifacts::checkout::options::{CheckoutOptions, CheckoutStrategy};
//!
//! let mut repository = Repository::open("path/to/repo")?;
//! let options = CheckoutOptions::new().strategy(CheckoutStrategy::FORCE);
//! let report = repository.checkout_head(options)?;
//! ```

pub mod areas;
pub mod artifacts;
pub mod commands;
pub mod errors;
