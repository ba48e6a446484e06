//! Typed view over the configuration store.

use crate::install::templates::{CHEF_INSTALL_SCRIPT, RUBY_INSTALL_SCRIPT};

use super::{ConfigError, ConfigStore, Value};

/// Config keys recognized by roundsman.
pub mod keys {
  pub const HOST: &str = "host";
  pub const USER: &str = "user";
  pub const SSH_PORT: &str = "ssh_port";
  pub const SSH_IDENTITY: &str = "ssh_identity";
  pub const SSH_OPTIONS: &str = "ssh_options";
  pub const SUDO: &str = "sudo";
  pub const RUN_LIST: &str = "run_list";

  pub const WORKING_DIR: &str = "working_dir";
  pub const STREAM_OUTPUT: &str = "stream_output";
  pub const REMOTE_USER: &str = "remote_user";
  pub const DEBUG_CHEF: &str = "debug_chef";
  pub const PACKAGE_MANAGER: &str = "package_manager";

  pub const RUBY_VERSION: &str = "ruby_version";
  pub const CARE_ABOUT_RUBY_VERSION: &str = "care_about_ruby_version";
  pub const RUBY_INSTALL_DIR: &str = "ruby_install_dir";
  pub const RUBY_DEPENDENCIES: &str = "ruby_dependencies";
  pub const RUBY_INSTALL_SCRIPT: &str = "ruby_install_script";

  pub const CHEF_VERSION: &str = "chef_version";
  pub const CHEF_INSTALL_SCRIPT: &str = "chef_install_script";
  pub const COOKBOOKS_DIRECTORY: &str = "cookbooks_directory";
  pub const COPYFILE_DISABLE: &str = "copyfile_disable";
}

/// Packages the ruby-build step needs on a fresh Ubuntu host.
const RUBY_DEPENDENCIES: &[&str] = &[
  "git",
  "curl",
  "build-essential",
  "bison",
  "openssl",
  "libreadline-dev",
  "zlib1g",
  "zlib1g-dev",
  "libssl-dev",
  "libyaml-dev",
  "libxml2-dev",
  "libxslt1-dev",
  "autoconf",
  "libc6-dev",
  "libncurses-dev",
  "libffi-dev",
];

/// Register every roundsman default in the store.
///
/// `remote_user` has no registered default: it is resolved against the
/// remote host (`user`, then `whoami`) when the workspace is first needed.
pub fn register_defaults(store: &mut ConfigStore) {
  store.set_default(keys::WORKING_DIR, "/tmp/roundsman");
  store.set_default(keys::STREAM_OUTPUT, true);
  store.set_default(keys::DEBUG_CHEF, false);
  store.set_default(keys::PACKAGE_MANAGER, "apt-get");
  store.set_default(keys::SUDO, "sudo");

  store.set_default(keys::RUBY_VERSION, "1.9.3-p194");
  store.set_default(keys::CARE_ABOUT_RUBY_VERSION, true);
  store.set_default(keys::RUBY_INSTALL_DIR, "/usr/local");
  store.set_default(
    keys::RUBY_DEPENDENCIES,
    Value::from(RUBY_DEPENDENCIES.to_vec()),
  );
  store.set_default(keys::RUBY_INSTALL_SCRIPT, RUBY_INSTALL_SCRIPT);

  store.set_default(keys::CHEF_VERSION, "~> 0.10.8");
  store.set_default(keys::CHEF_INSTALL_SCRIPT, CHEF_INSTALL_SCRIPT);
  store.set_default(keys::COOKBOOKS_DIRECTORY, Value::from(vec!["config/cookbooks"]));
  store.set_default(keys::COPYFILE_DISABLE, false);
}

/// Settings read once from the store at the start of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
  pub host: Option<String>,
  pub user: Option<String>,
  pub ssh_port: Option<u16>,
  pub ssh_identity: Option<String>,
  pub ssh_options: Vec<String>,
  pub sudo: String,
  pub run_list: Vec<String>,

  pub working_dir: String,
  pub stream_output: bool,
  pub remote_user: Option<String>,
  pub debug_chef: bool,
  pub package_manager: String,

  pub ruby_version: String,
  pub care_about_ruby_version: bool,
  pub ruby_install_dir: String,
  pub ruby_dependencies: Vec<String>,
  pub ruby_install_script: String,

  pub chef_version: String,
  pub chef_install_script: String,
  pub cookbooks_directory: Vec<String>,
  pub copyfile_disable: bool,
}

impl Options {
  /// Read every option, evaluating deferred values.
  ///
  /// Keys missing from the store fall back to the built-in defaults, so a
  /// store without registered defaults still yields a usable configuration.
  pub fn from_store(store: &ConfigStore) -> Result<Self, ConfigError> {
    let ssh_port = match store.get_integer(keys::SSH_PORT)? {
      None => None,
      Some(port) => Some(u16::try_from(port).map_err(|_| ConfigError::InvalidType {
        key: keys::SSH_PORT.to_string(),
        expected: "port number",
        found: port.to_string(),
      })?),
    };

    let string_or = |key: &str, default: &str| -> Result<String, ConfigError> {
      Ok(store.get_string(key)?.unwrap_or_else(|| default.to_string()))
    };
    let bool_or = |key: &str, default: bool| -> Result<bool, ConfigError> {
      Ok(store.get_bool(key)?.unwrap_or(default))
    };
    let list_or = |key: &str, default: &[&str]| -> Result<Vec<String>, ConfigError> {
      if store.has(key) {
        store.get_string_list(key)
      } else {
        Ok(default.iter().map(|s| s.to_string()).collect())
      }
    };

    Ok(Self {
      host: store.get_string(keys::HOST)?,
      user: store.get_string(keys::USER)?,
      ssh_port,
      ssh_identity: store.get_string(keys::SSH_IDENTITY)?,
      ssh_options: store.get_string_list(keys::SSH_OPTIONS)?,
      sudo: string_or(keys::SUDO, "sudo")?,
      run_list: store.get_string_list(keys::RUN_LIST)?,

      working_dir: string_or(keys::WORKING_DIR, "/tmp/roundsman")?,
      stream_output: bool_or(keys::STREAM_OUTPUT, true)?,
      remote_user: store.get_string(keys::REMOTE_USER)?,
      debug_chef: bool_or(keys::DEBUG_CHEF, false)?,
      package_manager: string_or(keys::PACKAGE_MANAGER, "apt-get")?,

      ruby_version: string_or(keys::RUBY_VERSION, "1.9.3-p194")?,
      care_about_ruby_version: bool_or(keys::CARE_ABOUT_RUBY_VERSION, true)?,
      ruby_install_dir: string_or(keys::RUBY_INSTALL_DIR, "/usr/local")?,
      ruby_dependencies: list_or(keys::RUBY_DEPENDENCIES, RUBY_DEPENDENCIES)?,
      ruby_install_script: string_or(keys::RUBY_INSTALL_SCRIPT, RUBY_INSTALL_SCRIPT)?,

      chef_version: string_or(keys::CHEF_VERSION, "~> 0.10.8")?,
      chef_install_script: string_or(keys::CHEF_INSTALL_SCRIPT, CHEF_INSTALL_SCRIPT)?,
      cookbooks_directory: list_or(keys::COOKBOOKS_DIRECTORY, &["config/cookbooks"])?,
      copyfile_disable: bool_or(keys::COPYFILE_DISABLE, false)?,
    })
  }

  /// The account that should own the workspace, if known without asking the host.
  pub fn workspace_owner(&self) -> Option<String> {
    self.remote_user.clone().or_else(|| self.user.clone())
  }
}
