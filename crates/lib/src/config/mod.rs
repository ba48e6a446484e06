//! Provisioning configuration.
//!
//! The store is populated at startup: defaults are registered first, then the
//! user's Lua file is evaluated and every key it returns is assigned on top.
//! After that the store is only read.

pub mod lua;
mod options;
mod store;
mod value;

use thiserror::Error;

pub use options::{Options, keys, register_defaults};
pub use store::{ConfigStore, DefaultEntry};
pub use value::{Deferred, DeferredError, Value};

/// Errors that can occur while loading or reading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
  /// The config file could not be read.
  #[error("cannot read config file {path}: {source}")]
  Read {
    path: String,
    #[source]
    source: std::io::Error,
  },

  /// Lua evaluation failed.
  #[error("lua error: {0}")]
  Lua(String),

  /// The config file did not return a table.
  #[error("config must return a table, got {0}")]
  NotATable(String),

  /// A key holds a value of the wrong kind.
  #[error("invalid value for '{key}': expected {expected}, got {found}")]
  InvalidType {
    key: String,
    expected: &'static str,
    found: String,
  },

  /// A deferred value failed while a typed option was being read.
  #[error("could not evaluate '{key}': {message}")]
  Deferred { key: String, message: String },

  /// A key required by the requested operation is not set.
  #[error("missing required setting '{0}'")]
  Missing(&'static str),
}

impl ConfigError {
  pub(crate) fn invalid_type(key: &str, expected: &'static str, found: &Value) -> Self {
    ConfigError::InvalidType {
      key: key.to_string(),
      expected,
      found: found.kind().to_string(),
    }
  }
}

impl From<mlua::Error> for ConfigError {
  fn from(e: mlua::Error) -> Self {
    ConfigError::Lua(e.to_string())
  }
}
