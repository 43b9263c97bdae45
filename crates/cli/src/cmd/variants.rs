//! Implementation of the `cake variants` command.

use anyhow::Result;

use super::{ConfigArgs, configuration_for};
use crate::output::{OutputFormat, print_info, print_json, symbols};

/// List the variants registered by the configuration of `script`.
pub fn cmd_variants(script: Option<&str>, args: &ConfigArgs, format: OutputFormat) -> Result<()> {
  let (_rt, _engine, configuration) = configuration_for(script, args)?;
  let variants = configuration.variants();

  if format.is_json() {
    let keywords: Vec<_> = variants.iter().map(|v| v.keywords()).collect();
    return print_json(&keywords);
  }

  print_info(&format!(
    "{} variant(s) in {}",
    variants.len(),
    configuration.path().display()
  ));
  for variant in &variants {
    println!("  {} {}", symbols::ARROW, variant);
  }
  Ok(())
}
