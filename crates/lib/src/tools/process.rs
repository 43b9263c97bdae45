//! Spawning external programs for build actions.

use std::process::Command;

use anyhow::{Context, bail};
use tracing::debug;

/// Run `command` to completion. `shown` names it in logs and errors.
///
/// Standard output is logged at debug level. A non-zero exit fails with the
/// exit code and whatever the program wrote to standard error.
pub(crate) fn check_output(command: &mut Command, shown: &str) -> anyhow::Result<()> {
  let program = command.get_program().to_string_lossy().into_owned();
  debug!(program = %program, working_dir = ?command.get_current_dir(), "spawning process");

  let output = command
    .output()
    .with_context(|| format!("failed to spawn {}", program))?;

  let stdout = String::from_utf8_lossy(&output.stdout);
  let stderr = String::from_utf8_lossy(&output.stderr);
  if !stdout.trim().is_empty() {
    debug!(stdout = %stdout.trim(), "command output");
  }

  if !output.status.success() {
    if !stderr.is_empty() {
      debug!(stderr = %stderr, "command stderr");
    }
    bail!(
      "command failed with exit code {:?}: {}{}",
      output.status.code(),
      shown,
      if stderr.trim().is_empty() {
        String::new()
      } else {
        format!("\n{}", stderr.trim())
      }
    );
  }
  Ok(())
}
