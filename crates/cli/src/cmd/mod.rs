mod build;
mod clean;
mod variants;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use tokio::runtime::Runtime;

use cake_lib::configuration::Configuration;
use cake_lib::consts::DEFAULT_CONFIG_SCRIPT_NAME;
use cake_lib::engine::{Engine, EngineConfig};
use cake_lib::lua::LuaScriptLoader;

pub use build::{BuildOptions, cmd_build};
pub use clean::cmd_clean;
pub use variants::cmd_variants;

/// Script built when none is named on the command line.
pub const DEFAULT_SCRIPT: &str = "build.cake";

/// How a script's configuration is found.
#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
  /// Config script to use instead of searching for one
  #[arg(long, value_name = "PATH")]
  pub config: Option<PathBuf>,

  /// Config script name searched for upward from each script
  #[arg(long, value_name = "NAME", default_value = DEFAULT_CONFIG_SCRIPT_NAME)]
  pub config_name: String,
}

/// Start a runtime and an engine loading Lua scripts.
fn start_engine(config: EngineConfig) -> Result<(Runtime, Engine)> {
  let rt = Runtime::new().context("Failed to create async runtime")?;
  let engine = Engine::new(rt.handle().clone(), Arc::new(LuaScriptLoader::new()), config);
  Ok((rt, engine))
}

fn resolve_configuration(engine: &Engine, script: &Path, args: &ConfigArgs) -> Result<Configuration> {
  let configuration = match &args.config {
    Some(path) => engine.get_configuration(path)?,
    None => engine.find_configuration(script, &args.config_name)?,
  };
  Ok(configuration)
}

/// Configuration of `script` (or the default script) for commands that do
/// not build anything. The engine is returned so the configuration stays
/// usable.
fn configuration_for(script: Option<&str>, args: &ConfigArgs) -> Result<(Runtime, Engine, Configuration)> {
  let config = EngineConfig {
    config_script_name: args.config_name.clone(),
    ..EngineConfig::default()
  };
  let (rt, engine) = start_engine(config)?;
  let script = Path::new(script.unwrap_or(DEFAULT_SCRIPT));
  let configuration = resolve_configuration(&engine, script, args)?;
  Ok((rt, engine, configuration))
}
