//! The build engine: task creation, configuration discovery and caching.
//!
//! An [`Engine`] owns the tokio runtime handle tasks are spawned on, the
//! [`ScriptLoader`] scripts are read through and one [`Configuration`] per
//! config script. Build actions share a semaphore that caps how many run at
//! once; script bodies are not limited, since they only build the graph.

pub mod task;
pub mod types;

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::thread::{self, ThreadId};

use tokio::runtime::Handle;
use tokio::sync::Semaphore;
use tracing::{debug, info};

use crate::configuration::Configuration;
use crate::path;
use crate::script::{Script, ScriptError, ScriptLoader};
use crate::util::lock;

pub use task::{Task, TaskAction, TaskId};
pub use types::{EngineConfig, TaskError, TaskStatus};

/// Handle to the build engine. Clones share the same engine.
#[derive(Clone)]
pub struct Engine {
  inner: Arc<EngineInner>,
}

pub(crate) struct EngineInner {
  config: EngineConfig,
  loader: Arc<dyn ScriptLoader>,
  runtime: Handle,
  limiter: Arc<Semaphore>,
  next_task: AtomicU64,
  configurations: Mutex<HashMap<PathBuf, Arc<Mutex<Option<Configuration>>>>>,
  // config scripts currently running, by the thread running them
  loading: Mutex<HashMap<PathBuf, ThreadId>>,
}

impl Engine {
  pub fn new(runtime: Handle, loader: Arc<dyn ScriptLoader>, config: EngineConfig) -> Self {
    let parallelism = config.parallelism.max(1);
    info!(parallelism, "engine created");
    Engine {
      inner: Arc::new(EngineInner {
        config,
        loader,
        runtime,
        limiter: Arc::new(Semaphore::new(parallelism)),
        next_task: AtomicU64::new(1),
        configurations: Mutex::new(HashMap::new()),
        loading: Mutex::new(HashMap::new()),
      }),
    }
  }

  pub(crate) fn from_inner(inner: Arc<EngineInner>) -> Self {
    Engine { inner }
  }

  pub(crate) fn downgrade(&self) -> Weak<EngineInner> {
    Arc::downgrade(&self.inner)
  }

  pub fn config(&self) -> &EngineConfig {
    &self.inner.config
  }

  pub fn runtime(&self) -> &Handle {
    &self.inner.runtime
  }

  pub fn loader(&self) -> &Arc<dyn ScriptLoader> {
    &self.inner.loader
  }

  /// Create an unstarted task for a build action. Build actions count
  /// against the engine's parallelism.
  pub fn create_task<F>(&self, action: F) -> Task
  where
    F: FnOnce() -> anyhow::Result<()> + Send + 'static,
  {
    Task::new(
      self.next_id(),
      Box::new(action),
      self.inner.runtime.clone(),
      Some(self.inner.limiter.clone()),
    )
  }

  /// Create an unstarted task for a script body.
  pub(crate) fn create_script_task<F>(&self, action: F) -> Task
  where
    F: FnOnce() -> anyhow::Result<()> + Send + 'static,
  {
    Task::new(self.next_id(), Box::new(action), self.inner.runtime.clone(), None)
  }

  fn next_id(&self) -> TaskId {
    TaskId(self.inner.next_task.fetch_add(1, Ordering::SeqCst))
  }

  /// The configuration defined by the config script at `path`.
  ///
  /// The first request for a given script creates the configuration and runs
  /// the script synchronously so it can register variants. Later requests
  /// return the cached configuration. A config script that fails is retried
  /// on the next request. A config script asking for its own configuration
  /// fails with [`ScriptError::RecursiveConfiguration`].
  pub fn get_configuration(&self, path: impl AsRef<Path>) -> Result<Configuration, ScriptError> {
    let path = path::absolute(path.as_ref()).map_err(|source| ScriptError::Io {
      path: path.as_ref().to_path_buf(),
      source,
    })?;

    if lock(&self.inner.loading).get(&path) == Some(&thread::current().id()) {
      return Err(ScriptError::RecursiveConfiguration(path));
    }

    let cell = lock(&self.inner.configurations).entry(path.clone()).or_default().clone();
    let mut slot = lock(&cell);
    if let Some(configuration) = slot.as_ref() {
      return Ok(configuration.clone());
    }

    if !self.inner.loader.exists(&path) {
      return Err(ScriptError::ScriptNotFound(path));
    }

    debug!(config = %path.display(), "loading configuration");
    let configuration = Configuration::new(self, path.clone());
    lock(&self.inner.loading).insert(path.clone(), thread::current().id());
    let loaded = configuration.run_config_script();
    lock(&self.inner.loading).remove(&path);
    loaded?;
    info!(
      config = %configuration.path().display(),
      variants = configuration.variants().len(),
      "configuration loaded"
    );
    *slot = Some(configuration.clone());
    Ok(configuration)
  }

  /// Find the configuration for a script by searching upward from its
  /// directory for a config script called `name`.
  pub fn find_configuration(&self, script: impl AsRef<Path>, name: &str) -> Result<Configuration, ScriptError> {
    let script = path::absolute(script.as_ref()).map_err(|source| ScriptError::Io {
      path: script.as_ref().to_path_buf(),
      source,
    })?;
    let start = script.parent().unwrap_or(&script).to_path_buf();

    for dir in start.ancestors() {
      let candidate = dir.join(name);
      if self.inner.loader.exists(&candidate) {
        debug!(script = %script.display(), config = %candidate.display(), "found configuration");
        return self.get_configuration(candidate);
      }
    }

    Err(ScriptError::ConfigurationNotFound {
      name: name.to_string(),
      start,
    })
  }

  /// Every configuration loaded so far, ordered by config-script path.
  pub fn configurations(&self) -> Vec<Configuration> {
    let slots: Vec<_> = lock(&self.inner.configurations).values().cloned().collect();
    let mut configurations: Vec<Configuration> = slots.iter().filter_map(|slot| lock(slot).clone()).collect();
    configurations.sort_by(|a, b| a.path().cmp(b.path()));
    configurations
  }

  /// Every script scheduled so far, across all configurations.
  pub fn scripts(&self) -> Vec<Script> {
    self.configurations().iter().flat_map(Configuration::scripts).collect()
  }

  /// Wait until every scheduled script has finished, including scripts
  /// scheduled while waiting.
  ///
  /// Returns each script with its outcome, in the order they were found.
  pub async fn wait_all(&self) -> Vec<(Script, Result<(), ScriptError>)> {
    let mut seen = HashSet::new();
    let mut outcomes = Vec::new();
    loop {
      let pending: Vec<Script> = self
        .scripts()
        .into_iter()
        .filter(|script| {
          seen.insert((
            script.configuration().path().to_path_buf(),
            script.path().to_path_buf(),
            script.variant().clone(),
          ))
        })
        .collect();
      if pending.is_empty() {
        return outcomes;
      }
      for script in pending {
        let result = script.wait().await;
        if let Err(err) = &result {
          debug!(script = %script.path().display(), error = %err, "script failed");
        }
        outcomes.push((script, result));
      }
    }
  }
}
