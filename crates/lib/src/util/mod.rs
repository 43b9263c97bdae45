//! Shared utilities.
//!
//! Content hashing for dependency records and the `OneOrMany` argument shape
//! used by the script API.

pub mod hash;
mod one_or_many;

pub use one_or_many::OneOrMany;

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Lock a mutex, recovering the data if a panicking thread poisoned it.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
  mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
