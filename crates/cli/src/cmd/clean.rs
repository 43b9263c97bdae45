//! Implementation of the `cake clean` command.

use anyhow::Result;

use super::{ConfigArgs, configuration_for};
use crate::output::print_success;

/// Remove every dependency record of the configuration of `script`, so the
/// next build runs every step.
pub fn cmd_clean(script: Option<&str>, args: &ConfigArgs) -> Result<()> {
  let (_rt, _engine, configuration) = configuration_for(script, args)?;
  let removed = configuration.clear_dependency_info()?;
  print_success(&format!(
    "Removed {} dependency record(s) from {}",
    removed,
    configuration.dependency_store().dir().display()
  ));
  Ok(())
}
