//! Error types for tool attribute access.

use thiserror::Error;

/// Errors raised by a tool's attribute lock or typed accessors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ToolError {
  /// The attribute was never declared during construction (or, for a
  /// variant projection, is not a keyword of the active variant).
  #[error("unknown attribute '{0}'")]
  UnknownAttribute(String),

  /// Construction has finished; no attribute can be declared any more.
  #[error("attributes are fixed once construction has finished")]
  Closed,

  /// The attribute exists but holds a value of another kind.
  #[error("attribute '{name}' is not a {expected} (found {found})")]
  WrongType {
    name: String,
    expected: &'static str,
    found: &'static str,
  },
}
