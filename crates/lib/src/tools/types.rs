//! Error types for the built-in tools.

use thiserror::Error;

/// Errors raised while turning compiler attributes into command lines.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompilerError {
  /// Neither the `language` attribute nor the source's extension names a
  /// supported language.
  #[error("cannot tell the language of '{0}'; set the 'language' attribute")]
  UnknownLanguage(String),

  #[error("attribute '{name}' has unsupported value '{value}'")]
  InvalidSetting { name: String, value: String },
}
