//! Build variants: named sets of keywords selecting one build setup.

mod tool;

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

pub use tool::VariantTool;

/// Keyword name to value.
pub type Keywords = BTreeMap<String, String>;

/// An immutable set of build keywords, e.g. `{platform: "win32", release: "true"}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Variant {
  keywords: Keywords,
}

impl Variant {
  /// The empty variant.
  pub fn new() -> Self {
    Self::default()
  }

  pub fn from_keywords(keywords: Keywords) -> Self {
    Variant { keywords }
  }

  /// Builder-style keyword insertion.
  pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
    self.keywords.insert(name.into(), value.into());
    self
  }

  pub fn keyword(&self, name: &str) -> Option<&str> {
    self.keywords.get(name).map(String::as_str)
  }

  pub fn keywords(&self) -> &Keywords {
    &self.keywords
  }

  pub fn is_empty(&self) -> bool {
    self.keywords.is_empty()
  }

  /// True when every requested keyword is present here with the same value.
  pub fn matches(&self, requested: &Keywords) -> bool {
    requested
      .iter()
      .all(|(name, value)| self.keywords.get(name) == Some(value))
  }
}

impl fmt::Display for Variant {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if self.keywords.is_empty() {
      return write!(f, "(default)");
    }
    for (i, (name, value)) in self.keywords.iter().enumerate() {
      if i > 0 {
        write!(f, ", ")?;
      }
      write!(f, "{}={}", name, value)?;
    }
    Ok(())
  }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Variant {
  fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
    Variant {
      keywords: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
    }
  }
}

/// Parse `key=value` pairs, as given on the command line.
pub fn parse_keywords<'a, I>(pairs: I) -> Result<Keywords, String>
where
  I: IntoIterator<Item = &'a str>,
{
  let mut keywords = Keywords::new();
  for pair in pairs {
    let (name, value) = pair
      .split_once('=')
      .ok_or_else(|| format!("expected key=value, got '{}'", pair))?;
    let name = name.trim();
    if name.is_empty() {
      return Err(format!("empty keyword name in '{}'", pair));
    }
    keywords.insert(name.to_string(), value.trim().to_string());
  }
  Ok(keywords)
}
