//! Per-execution script state.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tracing::{debug, info};

use super::ScriptError;
use crate::configuration::Configuration;
use crate::engine::{Engine, Task};
use crate::tool::Value;
use crate::util::{OneOrMany, lock};
use crate::variant::Variant;

/// State owned by one script execution.
pub(crate) struct ScriptState {
  path: PathBuf,
  dir: PathBuf,
  variant: Variant,
  task: Option<Task>,
  results: Mutex<BTreeMap<String, Value>>,
  included: Mutex<HashSet<PathBuf>>,
}

impl ScriptState {
  pub(crate) fn new(path: PathBuf, variant: Variant, task: Option<Task>) -> Self {
    let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
    let included = HashSet::from([path.clone()]);
    ScriptState {
      path,
      dir,
      variant,
      task,
      results: Mutex::new(BTreeMap::new()),
      included: Mutex::new(included),
    }
  }
}

/// The context of one script execution.
///
/// Passed explicitly to script bodies and build actions. Clones refer to the
/// same execution, so results published through one clone are visible
/// through every other.
#[derive(Clone)]
pub struct Script {
  state: Arc<ScriptState>,
  configuration: Configuration,
}

impl std::fmt::Debug for Script {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Script")
      .field("path", &self.state.path)
      .field("variant", &self.state.variant)
      .field("task", &self.state.task)
      .finish()
  }
}

/// Two handles are equal when they refer to the same execution.
impl PartialEq for Script {
  fn eq(&self, other: &Self) -> bool {
    Arc::ptr_eq(&self.state, &other.state)
  }
}

impl Eq for Script {}

impl Script {
  pub(crate) fn new(state: Arc<ScriptState>, configuration: Configuration) -> Self {
    Script { state, configuration }
  }

  /// Absolute path of the script.
  pub fn path(&self) -> &Path {
    &self.state.path
  }

  /// Directory containing the script.
  pub fn dir(&self) -> &Path {
    &self.state.dir
  }

  pub fn variant(&self) -> &Variant {
    &self.state.variant
  }

  /// The task running this script. Config scripts and included scripts
  /// executed outside the engine have none.
  pub fn task(&self) -> Option<&Task> {
    self.state.task.as_ref()
  }

  pub fn configuration(&self) -> &Configuration {
    &self.configuration
  }

  pub fn engine(&self) -> Result<Engine, ScriptError> {
    self.configuration.engine()
  }

  /// Prefix path(s) with the script's directory, keeping the shape.
  pub fn cwd(&self, paths: impl Into<OneOrMany<String>>) -> OneOrMany<String> {
    paths
      .into()
      .map(|path| self.state.dir.join(path).to_string_lossy().into_owned())
  }

  /// Run other scripts' bodies inside this execution.
  ///
  /// Each script is included at most once per execution; repeated includes
  /// of the same absolute path are ignored.
  pub fn include(&self, scripts: impl Into<OneOrMany<String>>) -> Result<(), ScriptError> {
    for script in scripts.into().into_vec() {
      if script.is_empty() {
        return Err(ScriptError::InvalidScriptPath(script));
      }
      let path = self.configuration.abspath(&script);
      if !lock(&self.state.included).insert(path.clone()) {
        debug!(script = %self.path().display(), include = %path.display(), "already included");
        continue;
      }
      let engine = self.engine()?;
      let body = engine.loader().load(&path)?;
      debug!(script = %self.path().display(), include = %path.display(), "including script");
      body.execute(self).map_err(|err| ScriptError::Execution {
        path: path.clone(),
        source: err.into(),
      })?;
    }
    Ok(())
  }

  /// Publish a named result. The last value written under a name wins.
  pub fn set_result(&self, name: impl Into<String>, value: impl Into<Value>) {
    lock(&self.state.results).insert(name.into(), value.into());
  }

  /// Publish several results at once.
  pub fn set_results<I, K, V>(&self, values: I)
  where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<Value>,
  {
    let mut results = lock(&self.state.results);
    for (name, value) in values {
      results.insert(name.into(), value.into());
    }
  }

  /// A published result, if any. Only final once the script's task has
  /// completed.
  pub fn result(&self, name: &str) -> Option<Value> {
    lock(&self.state.results).get(name).cloned()
  }

  pub fn results(&self) -> BTreeMap<String, Value> {
    lock(&self.state.results).clone()
  }

  /// Keep this script's task from completing until `task` has.
  pub fn complete_after(&self, task: &Task) {
    if let Some(own) = &self.state.task {
      own.complete_after(task);
    }
  }

  /// Wait for the script and every task it spawned to finish.
  pub async fn wait(&self) -> Result<(), ScriptError> {
    if let Some(task) = &self.state.task {
      task.wait().await?;
    }
    Ok(())
  }

  /// Blocking form of [`wait`](Self::wait), for script bodies and build
  /// actions.
  pub fn wait_blocking(&self) -> Result<(), ScriptError> {
    if let Some(task) = &self.state.task {
      task.wait_blocking()?;
    }
    Ok(())
  }

  /// Load and execute this script's body.
  pub(crate) fn run_body(&self) -> Result<(), ScriptError> {
    let engine = self.engine()?;
    let body = engine.loader().load(self.path())?;
    info!(script = %self.path().display(), variant = %self.variant(), "executing script");
    body.execute(self).map_err(|err| ScriptError::Execution {
      path: self.path().to_path_buf(),
      source: err.into(),
    })
  }
}
