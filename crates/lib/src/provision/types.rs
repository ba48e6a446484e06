use serde::Serialize;
use thiserror::Error;

use crate::config::ConfigError;
use crate::install::InstallOutcome;
use crate::package::PackageError;
use crate::remote::RemoteError;

/// A condition that must hold before the host is touched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PreconditionError {
  #[error("You must specify at least one recipe when running roundsman")]
  EmptyRunList,

  #[error("No cookbooks found in {searched:?}")]
  NoCookbooks { searched: Vec<String> },

  #[error("This distribution is not (yet) supported: {found}")]
  UnsupportedDistribution { found: String },
}

#[derive(Debug, Error)]
pub enum ProvisionError {
  #[error(transparent)]
  Precondition(#[from] PreconditionError),

  #[error(transparent)]
  Remote(#[from] RemoteError),

  #[error(transparent)]
  Config(#[from] ConfigError),

  #[error(transparent)]
  Package(#[from] PackageError),

  #[error("failed to serialize node attributes: {0}")]
  Serialize(#[from] serde_json::Error),
}

/// What a provisioning run did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProvisionReport {
  /// `None` when the step did not run.
  pub ruby: Option<InstallOutcome>,
  pub chef: Option<InstallOutcome>,
  /// Cookbook directories that were uploaded.
  pub cookbooks: Vec<String>,
  pub run_list: Vec<String>,
}
