//! Script loading: where script bodies come from.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock, PoisonError};

use super::{Script, ScriptError};
use crate::path;

/// The executable part of a script.
pub trait ScriptBody: Send + Sync {
  fn execute(&self, script: &Script) -> anyhow::Result<()>;
}

impl<F> ScriptBody for F
where
  F: Fn(&Script) -> anyhow::Result<()> + Send + Sync,
{
  fn execute(&self, script: &Script) -> anyhow::Result<()> {
    self(script)
  }
}

/// Source of script bodies, keyed by absolute path.
pub trait ScriptLoader: Send + Sync {
  /// Whether a script exists at `path`.
  fn exists(&self, path: &Path) -> bool;

  /// Load the script at `path`.
  fn load(&self, path: &Path) -> Result<Arc<dyn ScriptBody>, ScriptError>;
}

/// An in-memory loader for embedding scripts written in Rust.
#[derive(Default)]
pub struct ScriptRegistry {
  scripts: RwLock<HashMap<PathBuf, Arc<dyn ScriptBody>>>,
}

impl ScriptRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  /// Register a closure as the script at `path`, replacing any earlier
  /// script there.
  pub fn register<F>(&self, path: impl AsRef<Path>, body: F)
  where
    F: Fn(&Script) -> anyhow::Result<()> + Send + Sync + 'static,
  {
    self.register_body(path, Arc::new(body));
  }

  pub fn register_body(&self, path: impl AsRef<Path>, body: Arc<dyn ScriptBody>) {
    let path = path::normalize(path.as_ref());
    self
      .scripts
      .write()
      .unwrap_or_else(PoisonError::into_inner)
      .insert(path, body);
  }

  /// Builder-style [`register`](Self::register).
  pub fn with<F>(self, path: impl AsRef<Path>, body: F) -> Self
  where
    F: Fn(&Script) -> anyhow::Result<()> + Send + Sync + 'static,
  {
    self.register(path, body);
    self
  }
}

impl ScriptLoader for ScriptRegistry {
  fn exists(&self, path: &Path) -> bool {
    self
      .scripts
      .read()
      .unwrap_or_else(PoisonError::into_inner)
      .contains_key(&path::normalize(path))
  }

  fn load(&self, path: &Path) -> Result<Arc<dyn ScriptBody>, ScriptError> {
    self
      .scripts
      .read()
      .unwrap_or_else(PoisonError::into_inner)
      .get(&path::normalize(path))
      .cloned()
      .ok_or_else(|| ScriptError::ScriptNotFound(path.to_path_buf()))
  }
}
