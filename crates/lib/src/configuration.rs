//! Configurations: one build setup, defined by a config script.
//!
//! A configuration owns the variants its config script registers, resolves
//! script paths against its base directory, latches script executions so each
//! (script, variant) pair runs once, and keeps the dependency records of the
//! targets built under it.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, RwLock, Weak};

use anyhow::anyhow;
use tracing::{debug, info};

use crate::consts::DEPENDENCY_DIR;
use crate::depinfo::{BuildArgs, DepInfoError, DependencyInfo, DependencyStore};
use crate::engine::{Engine, EngineInner};
use crate::path;
use crate::script::{Script, ScriptError, ScriptState};
use crate::util::lock;
use crate::variant::{Keywords, Variant};

/// Handle to a configuration. Clones share the same configuration.
#[derive(Clone)]
pub struct Configuration {
  inner: Arc<ConfigurationInner>,
}

struct ConfigurationInner {
  path: PathBuf,
  base_dir: PathBuf,
  engine: Weak<EngineInner>,
  force: bool,
  variants: RwLock<Vec<Variant>>,
  scripts: Mutex<HashMap<(PathBuf, Variant), Arc<ScriptState>>>,
  dependencies: DependencyStore,
}

impl std::fmt::Debug for Configuration {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Configuration")
      .field("path", &self.inner.path)
      .field("variants", &self.variants())
      .finish()
  }
}

impl Configuration {
  /// Create the configuration for the config script at `path` (absolute).
  pub(crate) fn new(engine: &Engine, path: PathBuf) -> Self {
    let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
    let dependency_dir = match &engine.config().dependency_dir {
      Some(dir) => path::normalize(&base_dir.join(dir)),
      None => base_dir.join(DEPENDENCY_DIR),
    };
    Configuration {
      inner: Arc::new(ConfigurationInner {
        path,
        base_dir,
        engine: engine.downgrade(),
        force: engine.config().force,
        variants: RwLock::new(Vec::new()),
        scripts: Mutex::new(HashMap::new()),
        dependencies: DependencyStore::new(dependency_dir),
      }),
    }
  }

  /// Path of the config script.
  pub fn path(&self) -> &Path {
    &self.inner.path
  }

  /// Directory relative script and target paths resolve against.
  pub fn base_dir(&self) -> &Path {
    &self.inner.base_dir
  }

  pub fn engine(&self) -> Result<Engine, ScriptError> {
    self
      .inner
      .engine
      .upgrade()
      .map(Engine::from_inner)
      .ok_or(ScriptError::EngineShutDown)
  }

  pub fn dependency_store(&self) -> &DependencyStore {
    &self.inner.dependencies
  }

  /// Register a variant. Adding an equal variant twice keeps one copy.
  pub fn add_variant(&self, variant: Variant) {
    let mut variants = self.inner.variants.write().unwrap_or_else(PoisonError::into_inner);
    if !variants.contains(&variant) {
      debug!(config = %self.path().display(), variant = %variant, "variant added");
      variants.push(variant);
    }
  }

  /// Registered variants, in registration order. A configuration that never
  /// registered one has the single empty variant.
  pub fn variants(&self) -> Vec<Variant> {
    let variants = self.inner.variants.read().unwrap_or_else(PoisonError::into_inner);
    if variants.is_empty() {
      vec![Variant::new()]
    } else {
      variants.clone()
    }
  }

  /// The one variant matching `keywords` laid over `base`'s keywords.
  pub fn find_variant(&self, keywords: &Keywords, base: Option<&Variant>) -> Result<Variant, ScriptError> {
    let mut requested = base.map(|b| b.keywords().clone()).unwrap_or_default();
    requested.extend(keywords.iter().map(|(k, v)| (k.clone(), v.clone())));

    let mut matches: Vec<Variant> = self.variants().into_iter().filter(|v| v.matches(&requested)).collect();
    match matches.len() {
      0 => Err(ScriptError::VariantNotFound { keywords: requested }),
      1 => Ok(matches.remove(0)),
      count => Err(ScriptError::AmbiguousVariant {
        keywords: requested,
        count,
      }),
    }
  }

  /// Resolve `path` against the base directory and normalise it.
  pub fn abspath(&self, path: impl AsRef<Path>) -> PathBuf {
    path::normalize(&self.inner.base_dir.join(path))
  }

  /// Schedule the script at `path` under `variant`.
  ///
  /// Each (absolute path, variant) pair is executed at most once; later
  /// requests return the script already scheduled.
  pub fn execute(&self, path: impl AsRef<Path>, variant: &Variant) -> Result<Script, ScriptError> {
    let path = self.abspath(path);
    let engine = self.engine()?;
    if !engine.loader().exists(&path) {
      return Err(ScriptError::ScriptNotFound(path));
    }

    let key = (path.clone(), variant.clone());
    let state = {
      let mut scripts = lock(&self.inner.scripts);
      if let Some(state) = scripts.get(&key) {
        return Ok(Script::new(state.clone(), self.clone()));
      }

      let configuration = self.clone();
      let state = Arc::new_cyclic(|weak: &Weak<ScriptState>| {
        let weak = weak.clone();
        let task = engine.create_script_task(move || {
          let state = weak.upgrade().ok_or_else(|| anyhow!("script state dropped before it ran"))?;
          Script::new(state, configuration).run_body()?;
          Ok(())
        });
        ScriptState::new(path.clone(), variant.clone(), Some(task))
      });
      scripts.insert(key, state.clone());
      state
    };

    let script = Script::new(state, self.clone());
    if let Some(task) = script.task() {
      task.start()?;
    }
    debug!(script = %path.display(), variant = %variant, "script scheduled");
    Ok(script)
  }

  /// Every script scheduled so far, ordered by path and variant.
  pub fn scripts(&self) -> Vec<Script> {
    let mut scheduled: Vec<_> = lock(&self.inner.scripts)
      .iter()
      .map(|(key, state)| (key.clone(), state.clone()))
      .collect();
    scheduled.sort_by(|a, b| a.0.cmp(&b.0));
    scheduled
      .into_iter()
      .map(|(_, state)| Script::new(state, self.clone()))
      .collect()
  }

  /// Run the config script so it can register variants.
  pub(crate) fn run_config_script(&self) -> Result<(), ScriptError> {
    let state = Arc::new(ScriptState::new(self.inner.path.clone(), Variant::new(), None));
    Script::new(state, self.clone()).run_body()
  }

  /// Look up the record for `target` and compare it with `args`.
  ///
  /// Returns the record and the reason it is stale, or `None` when up to
  /// date. A missing record is [`DepInfoError::NotFound`].
  pub fn check_dependency_info(
    &self,
    target: &str,
    args: &BuildArgs,
  ) -> Result<(DependencyInfo, Option<String>), DepInfoError> {
    let target = self.abspath_string(target);
    let args = self.absolute_args(args);
    let info = self.inner.dependencies.load(&target)?;
    if self.inner.force {
      return Ok((info, Some("a rebuild was forced".to_string())));
    }
    let reason = info.stale_reason(&args)?;
    Ok((info, reason))
  }

  /// Capture a record of `targets` built from `args`.
  pub fn create_dependency_info(&self, targets: &[String], args: &BuildArgs) -> Result<DependencyInfo, DepInfoError> {
    let targets = targets.iter().map(|t| self.abspath_string(t)).collect();
    DependencyInfo::capture(targets, &self.absolute_args(args))
  }

  pub fn store_dependency_info(&self, info: &DependencyInfo) -> Result<(), DepInfoError> {
    self.inner.dependencies.store(info)
  }

  /// Delete every dependency record of this configuration.
  pub fn clear_dependency_info(&self) -> Result<usize, DepInfoError> {
    let removed = self.inner.dependencies.clear()?;
    info!(config = %self.path().display(), removed, "dependency records cleared");
    Ok(removed)
  }

  fn abspath_string(&self, path: &str) -> String {
    self.abspath(path).to_string_lossy().into_owned()
  }

  fn absolute_args(&self, args: &BuildArgs) -> BuildArgs {
    BuildArgs::new(
      args.args.clone(),
      args.sources.iter().map(|s| self.abspath_string(s)).collect(),
    )
  }
}
