//! Dependency records: what a target was last built from.
//!
//! A record stores the target paths, the build arguments and a content hash
//! of every source. Comparing it with the current arguments and sources
//! yields a reason to rebuild, or none when the targets are up to date.

mod store;
pub mod types;

pub use store::DependencyStore;
pub use types::{BuildArgs, DepInfoError, DependencyEntry, DependencyInfo};
