//! Types for task scheduling.

use std::path::PathBuf;

use thiserror::Error;

use super::task::TaskId;
use crate::consts::DEFAULT_CONFIG_SCRIPT_NAME;

/// Why a task did not succeed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskError {
  /// The task's own action returned an error.
  #[error("task {id} failed: {message}")]
  Failed { id: TaskId, message: String },

  /// A task this one was ordered after did not succeed, so the action never ran.
  #[error("task {id} skipped: dependency {dependency} failed")]
  DependencyFailed { id: TaskId, dependency: TaskId },

  /// The action succeeded but a task registered to complete with it failed.
  #[error("task {id} failed: sub-task {child} failed: {message}")]
  ChildFailed {
    id: TaskId,
    child: TaskId,
    message: String,
  },

  /// The action panicked.
  #[error("task {id} panicked")]
  Panicked { id: TaskId },

  /// `start_after` was called twice.
  #[error("task {id} was already started")]
  AlreadyStarted { id: TaskId },

  /// The engine shut down before the task could run.
  #[error("task {id} was abandoned")]
  Abandoned { id: TaskId },
}

impl TaskError {
  /// The task this error belongs to.
  pub fn id(&self) -> TaskId {
    match self {
      TaskError::Failed { id, .. }
      | TaskError::DependencyFailed { id, .. }
      | TaskError::ChildFailed { id, .. }
      | TaskError::Panicked { id }
      | TaskError::AlreadyStarted { id }
      | TaskError::Abandoned { id } => *id,
    }
  }
}

/// Lifecycle of a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskStatus {
  Pending,
  Running,
  Succeeded,
  Failed(TaskError),
}

impl TaskStatus {
  pub fn is_finished(&self) -> bool {
    matches!(self, TaskStatus::Succeeded | TaskStatus::Failed(_))
  }
}

/// Configuration for the build engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
  /// Maximum number of build actions running at once.
  pub parallelism: usize,

  /// File name searched for when locating a script's configuration.
  pub config_script_name: String,

  /// Where dependency records are kept. Relative paths resolve against each
  /// configuration's base directory; `None` uses the default location.
  pub dependency_dir: Option<PathBuf>,

  /// Treat every dependency record as stale.
  pub force: bool,
}

impl Default for EngineConfig {
  fn default() -> Self {
    Self {
      parallelism: num_cpus(),
      config_script_name: DEFAULT_CONFIG_SCRIPT_NAME.to_string(),
      dependency_dir: None,
      force: false,
    }
  }
}

/// Get the number of CPUs for default parallelism.
fn num_cpus() -> usize {
  std::thread::available_parallelism().map(|p| p.get()).unwrap_or(4)
}
