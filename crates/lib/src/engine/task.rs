//! Scheduled units of work with run-after ordering.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::runtime::Handle;
use tokio::sync::{Semaphore, watch};
use tracing::{debug, error, warn};

use super::types::{TaskError, TaskStatus};
use crate::util::lock;

/// The synchronous body of a task.
pub type TaskAction = Box<dyn FnOnce() -> anyhow::Result<()> + Send + 'static>;

/// Sequential task identifier, unique within one engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(pub u64);

impl fmt::Display for TaskId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "#{}", self.0)
  }
}

/// Handle to a scheduled task. Cheap to clone; clones refer to the same task.
///
/// A task is created unstarted. [`start_after`](Task::start_after) schedules
/// it: once every given task has succeeded the action runs on the blocking
/// pool. The task then completes when the action and every task registered
/// with [`complete_after`](Task::complete_after) have completed.
#[derive(Clone)]
pub struct Task {
  inner: Arc<TaskInner>,
}

struct TaskInner {
  id: TaskId,
  action: Mutex<Option<TaskAction>>,
  started: AtomicBool,
  children: Mutex<Vec<Task>>,
  status: watch::Sender<TaskStatus>,
  runtime: Handle,
  limiter: Option<Arc<Semaphore>>,
}

impl Task {
  pub(crate) fn new(id: TaskId, action: TaskAction, runtime: Handle, limiter: Option<Arc<Semaphore>>) -> Self {
    let (status, _) = watch::channel(TaskStatus::Pending);
    Task {
      inner: Arc::new(TaskInner {
        id,
        action: Mutex::new(Some(action)),
        started: AtomicBool::new(false),
        children: Mutex::new(Vec::new()),
        status,
        runtime,
        limiter,
      }),
    }
  }

  pub fn id(&self) -> TaskId {
    self.inner.id
  }

  pub fn status(&self) -> TaskStatus {
    self.inner.status.borrow().clone()
  }

  pub fn is_started(&self) -> bool {
    self.inner.started.load(Ordering::SeqCst)
  }

  /// Start the task now.
  pub fn start(&self) -> Result<(), TaskError> {
    self.start_after(&[])
  }

  /// Start the task once every task in `dependencies` has succeeded.
  ///
  /// May be called once. If a dependency fails the action never runs and the
  /// task fails with [`TaskError::DependencyFailed`].
  pub fn start_after(&self, dependencies: &[Task]) -> Result<(), TaskError> {
    if self.inner.started.swap(true, Ordering::SeqCst) {
      return Err(TaskError::AlreadyStarted { id: self.id() });
    }
    debug!(task = %self.id(), dependencies = dependencies.len(), "task scheduled");
    let task = self.clone();
    let dependencies = dependencies.to_vec();
    self.inner.runtime.spawn(async move { task.drive(dependencies).await });
    Ok(())
  }

  /// Delay this task's completion until `child` has completed too.
  ///
  /// Registering a task with itself is ignored.
  pub fn complete_after(&self, child: &Task) {
    if child.id() == self.id() {
      return;
    }
    lock(&self.inner.children).push(child.clone());
  }

  /// Wait for the task to finish.
  ///
  /// Waits forever on a task that is never started.
  pub async fn wait(&self) -> Result<(), TaskError> {
    let mut rx = self.inner.status.subscribe();
    let status = match rx.wait_for(TaskStatus::is_finished).await {
      Ok(status) => status.clone(),
      Err(_) => return Err(TaskError::Abandoned { id: self.id() }),
    };
    match status {
      TaskStatus::Failed(err) => Err(err),
      _ => Ok(()),
    }
  }

  /// Wait for the task from a thread that is not driving the runtime, such as
  /// a script body or a build action.
  pub fn wait_blocking(&self) -> Result<(), TaskError> {
    self.inner.runtime.block_on(self.wait())
  }

  async fn drive(self, dependencies: Vec<Task>) {
    let id = self.id();
    for dependency in &dependencies {
      if dependency.wait().await.is_err() {
        warn!(task = %id, dependency = %dependency.id(), "skipping task due to failed dependency");
        self.finish(TaskStatus::Failed(TaskError::DependencyFailed {
          id,
          dependency: dependency.id(),
        }));
        return;
      }
    }

    self.inner.status.send_replace(TaskStatus::Running);
    if let Err(err) = self.run_action().await {
      error!(task = %id, error = %err, "task failed");
      self.finish(TaskStatus::Failed(err));
      return;
    }

    // Children may still be registered by other tasks while earlier ones
    // are awaited, so index instead of iterating a snapshot.
    let mut next = 0;
    loop {
      let child = lock(&self.inner.children).get(next).cloned();
      let Some(child) = child else { break };
      next += 1;
      if let Err(err) = child.wait().await {
        self.finish(TaskStatus::Failed(TaskError::ChildFailed {
          id,
          child: child.id(),
          message: err.to_string(),
        }));
        return;
      }
    }

    debug!(task = %id, "task succeeded");
    self.finish(TaskStatus::Succeeded);
  }

  async fn run_action(&self) -> Result<(), TaskError> {
    let id = self.id();
    let action = lock(&self.inner.action).take();
    let Some(action) = action else {
      return Ok(());
    };

    let _permit = match &self.inner.limiter {
      Some(limiter) => Some(
        limiter
          .clone()
          .acquire_owned()
          .await
          .map_err(|_| TaskError::Abandoned { id })?,
      ),
      None => None,
    };

    match tokio::task::spawn_blocking(action).await {
      Ok(Ok(())) => Ok(()),
      Ok(Err(err)) => Err(TaskError::Failed {
        id,
        message: format!("{:#}", err),
      }),
      Err(_) => Err(TaskError::Panicked { id }),
    }
  }

  fn finish(&self, status: TaskStatus) {
    self.inner.status.send_replace(status);
  }
}

impl fmt::Debug for Task {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "Task({})", self.id())
  }
}

impl PartialEq for Task {
  fn eq(&self, other: &Self) -> bool {
    self.id() == other.id()
  }
}

impl Eq for Task {}

impl PartialOrd for Task {
  fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
    Some(self.cmp(other))
  }
}

impl Ord for Task {
  fn cmp(&self, other: &Self) -> std::cmp::Ordering {
    self.id().cmp(&other.id())
  }
}

impl Hash for Task {
  fn hash<H: Hasher>(&self, state: &mut H) {
    self.id().hash(state);
  }
}
