use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod cmd;
mod output;

use cmd::{BuildOptions, ConfigArgs};
use output::OutputFormat;

/// cake - variant-aware incremental builds described in Lua
#[derive(Parser)]
#[command(name = "cake")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Log why each build step runs or is skipped
  #[arg(short, long, global = true)]
  verbose: bool,

  /// Output format
  #[arg(long, global = true, value_enum, default_value_t)]
  format: OutputFormat,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Build scripts (default: build.cake)
  Build {
    /// Scripts to build
    scripts: Vec<String>,

    /// Select the variant by keyword, e.g. -k release=true
    #[arg(short = 'k', long = "keyword", value_name = "KEY=VALUE")]
    keywords: Vec<String>,

    #[command(flatten)]
    config: ConfigArgs,

    /// Maximum number of build steps running at once
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Rebuild every step regardless of dependency records
    #[arg(short, long)]
    force: bool,
  },

  /// List the variants of a script's configuration
  Variants {
    /// Script whose configuration to use (default: build.cake)
    script: Option<String>,

    #[command(flatten)]
    config: ConfigArgs,
  },

  /// Remove the dependency records of a script's configuration
  Clean {
    /// Script whose configuration to use (default: build.cake)
    script: Option<String>,

    #[command(flatten)]
    config: ConfigArgs,
  },
}

fn main() -> Result<()> {
  let cli = Cli::parse();

  let default_filter = if cli.verbose { "debug" } else { "warn" };
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  match cli.command {
    Commands::Build {
      scripts,
      keywords,
      config,
      jobs,
      force,
    } => cmd::cmd_build(
      BuildOptions {
        scripts,
        keywords,
        config,
        jobs,
        force,
      },
      cli.format,
    ),
    Commands::Variants { script, config } => cmd::cmd_variants(script.as_deref(), &config, cli.format),
    Commands::Clean { script, config } => cmd::cmd_clean(script.as_deref(), &config),
  }
}
