//! Lazy handles to scripts and their results.

use std::fmt;
use std::sync::Arc;

use super::{Script, ScriptError};
use crate::engine::Task;
use crate::tool::Value;

type Resolver = dyn Fn() -> Result<Script, ScriptError> + Send + Sync;

/// A script that will run once something asks for it.
///
/// Cloning shares the resolver. Executing more than once is safe: the
/// configuration schedules each (script, variant) pair only once and hands
/// back the same [`Script`] on later requests.
#[derive(Clone)]
pub struct ScriptProxy {
  resolve: Arc<Resolver>,
}

impl ScriptProxy {
  pub fn new<F>(resolve: F) -> Self
  where
    F: Fn() -> Result<Script, ScriptError> + Send + Sync + 'static,
  {
    ScriptProxy {
      resolve: Arc::new(resolve),
    }
  }

  /// Start the script if it has not started yet.
  pub fn execute(&self) -> Result<Script, ScriptError> {
    (self.resolve)()
  }

  /// A handle to the result `name` this script will publish.
  pub fn get_result(&self, name: impl Into<String>) -> ScriptResult {
    ScriptResult {
      proxy: self.clone(),
      name: name.into(),
    }
  }
}

impl fmt::Debug for ScriptProxy {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str("ScriptProxy")
  }
}

/// A named result of a script that has possibly not run yet.
#[derive(Clone, Debug)]
pub struct ScriptResult {
  proxy: ScriptProxy,
  name: String,
}

impl ScriptResult {
  pub fn name(&self) -> &str {
    &self.name
  }

  /// Execute the producing script (if needed) and return it.
  pub fn script(&self) -> Result<Script, ScriptError> {
    self.proxy.execute()
  }

  /// The task the result becomes available after. Starts the producing
  /// script.
  pub fn task(&self) -> Result<Option<Task>, ScriptError> {
    Ok(self.script()?.task().cloned())
  }

  /// Resolve the value, waiting for the producing script to finish.
  pub async fn resolve(&self) -> Result<Value, ScriptError> {
    let proxy = self.proxy.clone();
    let script = tokio::task::spawn_blocking(move || proxy.execute())
      .await
      .map_err(|err| ScriptError::Execution {
        path: Default::default(),
        source: Box::new(err),
      })??;
    script.wait().await?;
    self.read(&script)
  }

  /// Blocking form of [`resolve`](Self::resolve), for script bodies and
  /// build actions.
  pub fn resolve_blocking(&self) -> Result<Value, ScriptError> {
    let script = self.script()?;
    script.wait_blocking()?;
    self.read(&script)
  }

  fn read(&self, script: &Script) -> Result<Value, ScriptError> {
    script.result(&self.name).ok_or_else(|| ScriptError::ResultNotFound {
      script: script.path().to_path_buf(),
      name: self.name.clone(),
    })
  }
}
