//! Implementation of the `cake build` command.
//!
//! Resolves each script's configuration and variant, starts the scripts in
//! one engine and waits for every script and build step they led to.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result, anyhow, bail};
use serde::Serialize;
use tracing::debug;

use cake_lib::engine::EngineConfig;
use cake_lib::script::Script;
use cake_lib::variant::parse_keywords;

use super::{ConfigArgs, DEFAULT_SCRIPT, resolve_configuration, start_engine};
use crate::output::{OutputFormat, format_duration, print_error, print_info, print_json, print_stat, print_success};

pub struct BuildOptions {
  pub scripts: Vec<String>,
  pub keywords: Vec<String>,
  pub config: ConfigArgs,
  pub jobs: Option<usize>,
  pub force: bool,
}

#[derive(Serialize)]
struct ScriptOutcome {
  script: PathBuf,
  variant: String,
  error: Option<String>,
}

/// Execute the build command.
///
/// Prints one line per script and a summary. Fails if any script or any
/// build step it declared failed.
pub fn cmd_build(opts: BuildOptions, format: OutputFormat) -> Result<()> {
  let keywords = parse_keywords(opts.keywords.iter().map(String::as_str)).map_err(|e| anyhow!(e))?;

  let defaults = EngineConfig::default();
  let config = EngineConfig {
    parallelism: opts.jobs.unwrap_or(defaults.parallelism),
    config_script_name: opts.config.config_name.clone(),
    force: opts.force,
    ..defaults
  };
  let (rt, engine) = start_engine(config)?;

  let names = if opts.scripts.is_empty() {
    vec![DEFAULT_SCRIPT.to_string()]
  } else {
    opts.scripts
  };

  let start = Instant::now();
  let mut started: Vec<Script> = Vec::new();
  for name in &names {
    let path = dunce::canonicalize(name).with_context(|| format!("script not found: {}", name))?;
    let configuration = resolve_configuration(&engine, &path, &opts.config)?;
    let variant = configuration.find_variant(&keywords, None)?;
    debug!(script = %path.display(), config = %configuration.path().display(), variant = %variant, "starting script");
    started.push(configuration.execute(&path, &variant)?);
  }

  // Scripts started by other scripts are waited for too; the ones named on
  // the command line are reported first, in order.
  let mut finished = rt.block_on(engine.wait_all());
  finished.sort_by_key(|(script, _)| started.iter().position(|s| s == script).unwrap_or(usize::MAX));
  let outcomes: Vec<ScriptOutcome> = finished
    .into_iter()
    .map(|(script, result)| ScriptOutcome {
      script: script.path().to_path_buf(),
      variant: script.variant().to_string(),
      error: result.err().map(|e| e.to_string()),
    })
    .collect();
  let elapsed = start.elapsed();
  let failed = outcomes.iter().filter(|o| o.error.is_some()).count();

  if format.is_json() {
    print_json(&outcomes)?;
  } else {
    for outcome in &outcomes {
      let line = format!("{} [{}]", outcome.script.display(), outcome.variant);
      match &outcome.error {
        None => print_success(&line),
        Some(err) => print_error(&format!("{}: {}", line, err)),
      }
    }
    println!();
    print_stat("Scripts", &outcomes.len().to_string());
    print_stat("Failed", &failed.to_string());
    print_stat("Time", &format_duration(elapsed));
  }

  if failed > 0 {
    bail!("{} of {} script(s) failed", failed, outcomes.len());
  }
  if !format.is_json() {
    print_info("Build complete");
  }
  Ok(())
}
