mod cmd;
mod output;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::cmd::Overrides;
use crate::output::{OutputFormat, print_error};

/// roundsman - provision a host over SSH and converge it with chef-solo
#[derive(Parser)]
#[command(name = "roundsman")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Lua configuration file (default: roundsman.lua)
  #[arg(short, long, global = true)]
  config: Option<PathBuf>,

  /// Host to provision, overrides `host` from the configuration
  #[arg(long, global = true)]
  host: Option<String>,

  /// Enable debug logging
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Install ruby if needed, then run chef with the given recipes
  Provision {
    /// Recipes to run, e.g. "recipe[main::cold]" (default: run_list from the configuration)
    recipes: Vec<String>,
  },

  /// Install ruby and its build dependencies unless the right version is present
  InstallRuby,

  /// Install chef if needed, upload cookbooks and run chef-solo
  RunChef {
    /// Recipes to run (default: run_list from the configuration)
    recipes: Vec<String>,
  },

  /// Exit with an error if install-ruby would install anything
  CheckRubyVersion,

  /// List every setting with a default and its current value
  Configuration {
    /// Output format
    #[arg(short, long, value_enum, default_value_t)]
    output: OutputFormat,
  },
}

fn init_logging(verbose: bool) {
  let default = if verbose { "roundsman=debug" } else { "roundsman=info" };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .without_time()
    .init();
}

fn main() -> ExitCode {
  let cli = Cli::parse();
  init_logging(cli.verbose);

  let overrides = Overrides {
    config: cli.config,
    host: cli.host,
  };

  let result = match cli.command {
    Commands::Provision { recipes } => cmd::cmd_provision(&overrides, recipes),
    Commands::InstallRuby => cmd::cmd_install_ruby(&overrides),
    Commands::RunChef { recipes } => cmd::cmd_run_chef(&overrides, recipes),
    Commands::CheckRubyVersion => cmd::cmd_check_ruby_version(&overrides),
    Commands::Configuration { output } => cmd::cmd_configuration(&overrides, output),
  };

  match result {
    Ok(()) => ExitCode::SUCCESS,
    Err(err) => {
      print_error(&format!("{err:#}"));
      ExitCode::FAILURE
    }
  }
}
