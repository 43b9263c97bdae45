//! Error types for script resolution and execution.

use std::path::PathBuf;

use thiserror::Error;

use crate::depinfo::DepInfoError;
use crate::engine::TaskError;
use crate::tool::ToolError;
use crate::tools::CompilerError;
use crate::variant::Keywords;

/// Errors that can occur while resolving, scheduling or running scripts.
#[derive(Debug, Error)]
pub enum ScriptError {
  /// A script reference was not a usable path.
  #[error("invalid script path '{0}': expected a non-empty path")]
  InvalidScriptPath(String),

  /// No script exists at the path.
  #[error("script not found: {0}")]
  ScriptNotFound(PathBuf),

  /// No config script was found searching upward from a script's directory.
  #[error("no configuration '{name}' found above {start}")]
  ConfigurationNotFound { name: String, start: PathBuf },

  /// A config script asked for its own configuration while running.
  #[error("configuration {0} was requested by its own config script")]
  RecursiveConfiguration(PathBuf),

  /// No variant of the configuration matches the requested keywords.
  #[error("no variant matches {}", format_keywords(.keywords))]
  VariantNotFound { keywords: Keywords },

  /// More than one variant matches the requested keywords.
  #[error("{count} variants match {}", format_keywords(.keywords))]
  AmbiguousVariant { keywords: Keywords, count: usize },

  /// The script body failed.
  #[error("script {path} failed: {source}")]
  Execution {
    path: PathBuf,
    #[source]
    source: Box<dyn std::error::Error + Send + Sync>,
  },

  /// A script finished without publishing the requested result.
  #[error("script {script} has no result '{name}'")]
  ResultNotFound { script: PathBuf, name: String },

  /// Build arguments could not be turned into a comparable description.
  #[error("invalid build arguments: {0}")]
  Args(#[source] serde_json::Error),

  #[error(transparent)]
  DependencyInfo(#[from] DepInfoError),

  #[error(transparent)]
  Task(#[from] TaskError),

  #[error(transparent)]
  Tool(#[from] ToolError),

  #[error(transparent)]
  Compiler(#[from] CompilerError),

  #[error("io error at {path}: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  /// The engine was dropped while scripts still referenced it.
  #[error("engine has shut down")]
  EngineShutDown,
}

fn format_keywords(keywords: &Keywords) -> String {
  if keywords.is_empty() {
    return "{}".to_string();
  }
  let pairs: Vec<String> = keywords.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
  format!("{{{}}}", pairs.join(", "))
}
