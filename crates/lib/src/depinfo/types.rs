//! Dependency record types.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::DEPENDENCY_INFO_VERSION;
use crate::util::hash::{ContentHash, FileHashError, hash_file_if_exists};

/// The effective inputs of a build action: its arguments and sources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildArgs {
  pub args: serde_json::Value,
  pub sources: Vec<String>,
}

impl BuildArgs {
  pub fn new(args: serde_json::Value, sources: Vec<String>) -> Self {
    BuildArgs { args, sources }
  }
}

/// One recorded dependency and the hash of its contents when recorded.
/// `hash` is `None` when the file did not exist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyEntry {
  pub path: String,
  pub hash: Option<ContentHash>,
}

/// What was true about a build the last time it ran.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DependencyInfo {
  pub version: u32,
  /// Absolute target paths; the first one names the record.
  pub targets: Vec<String>,
  pub args: serde_json::Value,
  pub dependencies: Vec<DependencyEntry>,
  /// Inputs the action reported while running, such as included headers.
  pub discovered: Vec<DependencyEntry>,
}

impl Default for DependencyInfo {
  fn default() -> Self {
    DependencyInfo {
      version: 0,
      targets: Vec::new(),
      args: serde_json::Value::Null,
      dependencies: Vec::new(),
      discovered: Vec::new(),
    }
  }
}

impl DependencyInfo {
  /// Record the current state of `sources` for a build of `targets`.
  pub fn capture(targets: Vec<String>, args: &BuildArgs) -> Result<Self, DepInfoError> {
    Ok(DependencyInfo {
      version: DEPENDENCY_INFO_VERSION,
      targets,
      args: args.args.clone(),
      dependencies: hash_entries(&args.sources)?,
      discovered: Vec::new(),
    })
  }

  /// Also record `paths`, inputs found only by running the action.
  /// Paths already listed are skipped.
  pub fn with_discovered(mut self, paths: &[String]) -> Result<Self, DepInfoError> {
    let fresh: Vec<String> = paths
      .iter()
      .filter(|p| !self.dependencies.iter().chain(&self.discovered).any(|d| &d.path == *p))
      .cloned()
      .collect();
    self.discovered.extend(hash_entries(&fresh)?);
    Ok(self)
  }

  /// Why the recorded build no longer matches, or `None` when it is up to
  /// date. Checks run cheapest first and stop at the first difference.
  pub fn stale_reason(&self, args: &BuildArgs) -> Result<Option<String>, DepInfoError> {
    if self.version != DEPENDENCY_INFO_VERSION {
      return Ok(Some("dependency info format changed".to_string()));
    }

    if self.args != args.args {
      return Ok(Some("'args' changed".to_string()));
    }

    let recorded = self.dependencies.iter().map(|d| d.path.as_str());
    if !recorded.eq(args.sources.iter().map(String::as_str)) {
      return Ok(Some("dependency list changed".to_string()));
    }

    for target in &self.targets {
      if !Path::new(target).exists() {
        return Ok(Some(format!("'{}' does not exist", target)));
      }
    }

    for dependency in self.dependencies.iter().chain(&self.discovered) {
      let current = hash_file_if_exists(Path::new(&dependency.path))?;
      if current != dependency.hash {
        return Ok(Some(format!("'{}' has been changed", dependency.path)));
      }
    }

    Ok(None)
  }
}

fn hash_entries(paths: &[String]) -> Result<Vec<DependencyEntry>, DepInfoError> {
  paths
    .iter()
    .map(|path| -> Result<DependencyEntry, DepInfoError> {
      Ok(DependencyEntry {
        path: path.clone(),
        hash: hash_file_if_exists(Path::new(path))?,
      })
    })
    .collect()
}

/// Errors reading or writing dependency records.
#[derive(Debug, Error)]
pub enum DepInfoError {
  /// No record exists for the target. Means "build it".
  #[error("no dependency record for {0}")]
  NotFound(PathBuf),

  #[error("failed to read dependency record {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to write dependency record {path}: {source}")]
  Write {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to parse dependency record: {0}")]
  Parse(#[source] serde_json::Error),

  #[error("failed to serialize dependency record: {0}")]
  Serialize(#[source] serde_json::Error),

  #[error(transparent)]
  Hash(#[from] FileHashError),

  /// A record has no targets to be keyed by.
  #[error("dependency record has no targets")]
  NoTargets,
}

impl DepInfoError {
  pub fn is_not_found(&self) -> bool {
    matches!(self, DepInfoError::NotFound(_))
  }
}
