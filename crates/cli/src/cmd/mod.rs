mod check;
mod configuration;
mod install_ruby;
mod provision;
mod run_chef;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use tracing::{debug, warn};

use roundsman_lib::config::{ConfigStore, Options, Value, keys, lua, register_defaults};
use roundsman_lib::consts::DEFAULT_CONFIG_FILE;
use roundsman_lib::install::InstallOutcome;

pub use check::cmd_check_ruby_version;
pub use configuration::cmd_configuration;
pub use install_ruby::cmd_install_ruby;
pub use provision::cmd_provision;
pub use run_chef::cmd_run_chef;

/// Global flags that override the configuration file.
pub struct Overrides {
  pub config: Option<PathBuf>,
  pub host: Option<String>,
}

/// Loaded configuration for one command.
pub struct Session {
  pub store: ConfigStore,
  /// Directory cookbook paths are relative to.
  base_dir: PathBuf,
}

impl Session {
  /// Register defaults, evaluate the config file, then apply CLI overrides.
  ///
  /// A missing default config file is not an error; a missing `--config` file is.
  pub fn load(overrides: &Overrides, recipes: Vec<String>) -> Result<Self> {
    let mut store = ConfigStore::new();
    register_defaults(&mut store);

    let (path, explicit) = match &overrides.config {
      Some(path) => (path.clone(), true),
      None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
    };
    if path.exists() {
      lua::load_file(&mut store, &path).with_context(|| format!("Failed to load config: {}", path.display()))?;
      debug!(path = %path.display(), entries = store.len(), "loaded configuration");
    } else if explicit {
      bail!("Config file not found: {}", path.display());
    } else {
      warn!(path = %path.display(), "no configuration file, using defaults");
    }

    if let Some(host) = &overrides.host {
      store.set(keys::HOST, host.as_str());
    }
    if !recipes.is_empty() {
      store.set(keys::RUN_LIST, Value::from(recipes));
    }

    let cwd = std::env::current_dir().context("Failed to determine current directory")?;
    let base_dir = dunce::canonicalize(&cwd).unwrap_or(cwd);

    Ok(Self { store, base_dir })
  }

  /// Read the typed options, evaluating the deferred values they need.
  pub fn options(&self) -> Result<Options> {
    Options::from_store(&self.store).context("Invalid configuration")
  }

  pub fn base_dir(&self) -> &Path {
    &self.base_dir
  }
}

/// Runtime for driving the provisioning steps, one at a time.
pub fn runtime() -> Result<tokio::runtime::Runtime> {
  tokio::runtime::Builder::new_current_thread()
    .enable_all()
    .build()
    .context("Failed to create async runtime")
}

pub fn describe_outcome(outcome: Option<&InstallOutcome>) -> String {
  match outcome {
    None => "skipped".to_string(),
    Some(InstallOutcome::AlreadySatisfied) => "already installed".to_string(),
    Some(InstallOutcome::Installed { script }) => format!("installed ({script})"),
  }
}
