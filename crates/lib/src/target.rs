//! File targets: output paths paired with the task that produces them.

use std::fmt;

use crate::engine::Task;

/// A file that is valid once its producing task (if any) has completed.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FileTarget {
  pub path: String,
  pub task: Option<Task>,
}

impl FileTarget {
  pub fn new(path: impl Into<String>, task: Option<Task>) -> Self {
    FileTarget {
      path: path.into(),
      task,
    }
  }

  /// A target for a file that already exists and needs no task.
  pub fn existing(path: impl Into<String>) -> Self {
    Self::new(path, None)
  }
}

impl fmt::Display for FileTarget {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.path)
  }
}

/// An input to a build action: either a plain path or a target.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Source {
  Path(String),
  Target(FileTarget),
}

impl Source {
  pub fn path(&self) -> &str {
    match self {
      Source::Path(path) => path,
      Source::Target(target) => &target.path,
    }
  }

  pub fn task(&self) -> Option<&Task> {
    match self {
      Source::Path(_) => None,
      Source::Target(target) => target.task.as_ref(),
    }
  }
}

impl From<&str> for Source {
  fn from(path: &str) -> Self {
    Source::Path(path.to_string())
  }
}

impl From<String> for Source {
  fn from(path: String) -> Self {
    Source::Path(path)
  }
}

impl From<&String> for Source {
  fn from(path: &String) -> Self {
    Source::Path(path.clone())
  }
}

impl From<FileTarget> for Source {
  fn from(target: FileTarget) -> Self {
    Source::Target(target)
  }
}

impl From<&FileTarget> for Source {
  fn from(target: &FileTarget) -> Self {
    Source::Target(target.clone())
  }
}

/// Split a source into its path and producing task.
pub fn get_path_and_task(source: &Source) -> (String, Option<Task>) {
  (source.path().to_string(), source.task().cloned())
}

/// Split sources into parallel collections. Sources without a task contribute
/// a path but no task, so the two lists may differ in length.
pub fn get_paths_and_tasks<'a, I>(sources: I) -> (Vec<String>, Vec<Task>)
where
  I: IntoIterator<Item = &'a Source>,
{
  let mut paths = Vec::new();
  let mut tasks = Vec::new();
  for source in sources {
    let (path, task) = get_path_and_task(source);
    paths.push(path);
    tasks.extend(task);
  }
  (paths, tasks)
}
