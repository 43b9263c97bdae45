//! Memoisation keys and the per-tool result cache.

use std::any::Any;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use super::Value;
use crate::util::lock;

/// Identifies one memoised call: the method, its positional arguments and its
/// keyword arguments.
///
/// Keyword arguments live in a sorted map, so the order they were supplied in
/// does not affect the key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MemoKey {
  method: &'static str,
  args: Vec<Value>,
  kwargs: BTreeMap<String, Value>,
}

impl MemoKey {
  pub fn new(method: &'static str) -> Self {
    MemoKey {
      method,
      args: Vec::new(),
      kwargs: BTreeMap::new(),
    }
  }

  /// Append a positional argument.
  pub fn arg(mut self, value: impl Into<Value>) -> Self {
    self.args.push(value.into());
    self
  }

  /// Add a keyword argument. A repeated name replaces the earlier value.
  pub fn kwarg(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
    self.kwargs.insert(name.into(), value.into());
    self
  }

  pub fn method(&self) -> &'static str {
    self.method
  }
}

type Entry = Arc<dyn Any + Send + Sync>;

#[derive(Default)]
pub(crate) struct MemoCache {
  entries: Mutex<HashMap<MemoKey, Entry>>,
}

impl MemoCache {
  pub(crate) fn get<T: Any + Clone>(&self, key: &MemoKey) -> Option<T> {
    lock(&self.entries)
      .get(key)
      .and_then(|entry| entry.downcast_ref::<T>())
      .cloned()
  }

  pub(crate) fn insert<T: Any + Send + Sync>(&self, key: MemoKey, value: T) {
    lock(&self.entries).insert(key, Arc::new(value));
  }

  pub(crate) fn clear(&self) {
    lock(&self.entries).clear();
  }

  pub(crate) fn len(&self) -> usize {
    lock(&self.entries).len()
  }
}
