use std::fmt;

/// Host CPU architecture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arch {
  X86,
  X86_64,
  Arm,
  Aarch64,
  /// Any other architecture, by its Rust target name.
  Other(&'static str),
}

impl Arch {
  /// The architecture this binary was built for.
  pub fn current() -> Self {
    Self::from_name(std::env::consts::ARCH)
  }

  pub fn from_name(name: &'static str) -> Self {
    match name {
      "x86" => Self::X86,
      "x86_64" => Self::X86_64,
      "arm" => Self::Arm,
      "aarch64" => Self::Aarch64,
      other => Self::Other(other),
    }
  }

  /// The keyword value build scripts see, e.g. `"x64"`.
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::X86 => "x86",
      Self::X86_64 => "x64",
      Self::Arm => "arm",
      Self::Aarch64 => "arm64",
      Self::Other(name) => name,
    }
  }
}

impl fmt::Display for Arch {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}
