//! Shared test helpers for CLI integration tests.

use std::path::PathBuf;

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use tempfile::TempDir;

/// Registers a debug and a release variant for the host platform.
pub const VARIANT_CONFIG: &str = r#"
cake.add_variant{ platform = cake.host.platform, release = "false" }
cake.add_variant{ platform = cake.host.platform, release = "true" }
"#;

/// Copies `src/in.txt` through an intermediate file into `out/`.
pub const COPY_BUILD: &str = r#"
local staged = cake.copy("src/in.txt", "out/staged.txt")
cake.copy(staged, "out/final.txt")
cake.write("out/mode.txt", cake.variant.release == "true" and "release" or "debug")
"#;

/// Isolated project directory.
pub struct TestEnv {
  pub temp: TempDir,
  pub root: PathBuf,
}

impl TestEnv {
  /// A project with the variant config, the copy build and its input.
  pub fn copy_project() -> Self {
    let env = Self::empty();
    env.write_file("config.cake", VARIANT_CONFIG);
    env.write_file("build.cake", COPY_BUILD);
    env.write_file("src/in.txt", "payload");
    env
  }

  pub fn empty() -> Self {
    let temp = TempDir::new().unwrap();
    let root = dunce::canonicalize(temp.path()).unwrap();
    Self { temp, root }
  }

  /// Write a file relative to the project root.
  pub fn write_file(&self, relative_path: &str, content: &str) {
    let path = self.root.join(relative_path);
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, content).unwrap();
  }

  pub fn read_file(&self, relative_path: &str) -> String {
    std::fs::read_to_string(self.root.join(relative_path))
      .unwrap_or_else(|e| panic!("failed to read {}: {}", relative_path, e))
  }

  /// A `cake` command running in the project root.
  pub fn cake_cmd(&self) -> Command {
    let mut cmd = cargo_bin_cmd!("cake");
    cmd.current_dir(&self.root).env_remove("RUST_LOG");
    cmd
  }
}
