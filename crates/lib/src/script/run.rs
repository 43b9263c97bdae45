//! The incremental-build primitive.

use serde::Serialize;
use tracing::debug;

use super::{Script, ScriptError, ScriptTool};
use crate::configuration::Configuration;
use crate::depinfo::BuildArgs;
use crate::engine::Task;
use crate::target::{FileTarget, Source, get_paths_and_tasks};

/// What [`ScriptTool::run`] hands back.
#[derive(Debug, Clone)]
pub enum RunOutput {
  /// No targets were given: the raw task.
  Task(Task),
  /// One target per requested path, all produced by the same task.
  Targets(Vec<FileTarget>),
}

impl RunOutput {
  /// The task doing the build.
  pub fn task(&self) -> Option<&Task> {
    match self {
      RunOutput::Task(task) => Some(task),
      RunOutput::Targets(targets) => targets.first().and_then(|t| t.task.as_ref()),
    }
  }

  pub fn targets(&self) -> &[FileTarget] {
    match self {
      RunOutput::Task(_) => &[],
      RunOutput::Targets(targets) => targets,
    }
  }

  pub fn into_targets(self) -> Vec<FileTarget> {
    match self {
      RunOutput::Task(_) => Vec::new(),
      RunOutput::Targets(targets) => targets,
    }
  }
}

impl ScriptTool {
  /// Schedule `func` as a build action that only runs when needed.
  ///
  /// The action starts after every source's producing task. With targets, it
  /// first consults the dependency record of the first target: when the
  /// record says the targets are up to date for these `args` and sources,
  /// `func` is skipped. After `func` succeeds a fresh record is stored. A
  /// failing `func` leaves the old record in place, so the next build retries.
  ///
  /// The calling script does not complete until the action has.
  pub fn run<F, A>(
    &self,
    cx: &Script,
    func: F,
    args: A,
    targets: Option<Vec<String>>,
    sources: &[Source],
  ) -> Result<RunOutput, ScriptError>
  where
    F: FnOnce() -> anyhow::Result<()> + Send + 'static,
    A: Serialize,
  {
    self.run_scanned(cx, move || func().map(|()| Vec::new()), args, targets, sources)
  }

  /// Like [`ScriptTool::run`], for actions that find further inputs while
  /// running. `func` returns those paths; they are recorded alongside the
  /// sources, so changing one of them makes the targets stale.
  pub fn run_scanned<F, A>(
    &self,
    cx: &Script,
    func: F,
    args: A,
    targets: Option<Vec<String>>,
    sources: &[Source],
  ) -> Result<RunOutput, ScriptError>
  where
    F: FnOnce() -> anyhow::Result<Vec<String>> + Send + 'static,
    A: Serialize,
  {
    let (source_paths, source_tasks) = get_paths_and_tasks(sources);
    let args = serde_json::to_value(args).map_err(ScriptError::Args)?;
    let build_args = BuildArgs::new(args, source_paths);

    let engine = self.engine()?;
    let configuration = self.configuration().clone();
    let primary = targets.clone().unwrap_or_default();
    let task = engine.create_task(move || build_if_stale(&configuration, func, &build_args, &primary));
    task.start_after(&source_tasks)?;
    cx.complete_after(&task);

    Ok(match targets {
      Some(targets) => RunOutput::Targets(
        targets
          .into_iter()
          .map(|path| FileTarget::new(path, Some(task.clone())))
          .collect(),
      ),
      None => RunOutput::Task(task),
    })
  }
}

fn build_if_stale<F>(configuration: &Configuration, func: F, args: &BuildArgs, targets: &[String]) -> anyhow::Result<()>
where
  F: FnOnce() -> anyhow::Result<Vec<String>>,
{
  if let Some(primary) = targets.first() {
    match configuration.check_dependency_info(primary, args) {
      Ok((_, None)) => {
        debug!(path = %primary, "up to date");
        return Ok(());
      }
      Ok((_, Some(reason))) => debug!(path = %primary, "building '{}' because {}", primary, reason),
      Err(err) if err.is_not_found() => debug!(path = %primary, "building '{}': no dependency record", primary),
      Err(err) => return Err(err.into()),
    }
  }

  let discovered: Vec<String> = func()?
    .iter()
    .map(|path| configuration.abspath(path).to_string_lossy().into_owned())
    .collect();

  if !targets.is_empty() {
    let info = configuration
      .create_dependency_info(targets, args)?
      .with_discovered(&discovered)?;
    configuration.store_dependency_info(&info)?;
  }
  Ok(())
}
