use std::fmt;

/// Host operating system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Os {
  Linux,
  MacOs,
  Windows,
  Other(&'static str),
}

impl Os {
  pub fn current() -> Self {
    Self::from_name(std::env::consts::OS)
  }

  pub fn from_name(name: &'static str) -> Self {
    match name {
      "linux" => Self::Linux,
      "macos" => Self::MacOs,
      "windows" => Self::Windows,
      other => Self::Other(other),
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Linux => "linux",
      Self::MacOs => "darwin",
      Self::Windows => "windows",
      Self::Other(name) => name,
    }
  }

  /// Conventional executable suffix, including the dot.
  pub fn exe_suffix(&self) -> &'static str {
    match self {
      Self::Windows => ".exe",
      _ => "",
    }
  }
}

impl fmt::Display for Os {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}
