//! The machine cake runs on.
//!
//! Config scripts read these values (as `cake.host` in Lua) to register
//! variants that build for the host.

pub mod arch;
pub mod os;

use std::fmt;

use arch::Arch;
use os::Os;

use crate::variant::{Keywords, Variant};

/// Host operating system and architecture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Host {
  pub arch: Arch,
  pub os: Os,
}

impl Host {
  pub fn new(arch: Arch, os: Os) -> Self {
    Self { arch, os }
  }

  /// The host this binary runs on.
  pub fn current() -> Self {
    Self::new(Arch::current(), Os::current())
  }

  /// Platform string combining OS and architecture, e.g. `"linux-x64"`.
  pub fn platform(&self) -> String {
    format!("{}-{}", self.os, self.arch)
  }

  /// `os`, `arch` and `platform` keywords.
  pub fn keywords(&self) -> Keywords {
    Keywords::from([
      ("os".to_string(), self.os.to_string()),
      ("arch".to_string(), self.arch.to_string()),
      ("platform".to_string(), self.platform()),
    ])
  }

  /// A variant with just the host keywords.
  pub fn variant(&self) -> Variant {
    Variant::from_keywords(self.keywords())
  }
}

impl fmt::Display for Host {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.platform())
  }
}
