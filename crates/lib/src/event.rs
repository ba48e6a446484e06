//! Provisioning events.
//!
//! Components report what they decide through a [`Reporter`] instead of
//! logging directly, so decision logic stays independent of presentation.
//! [`TracingReporter`] turns events into `tracing` log lines.

use tracing::{debug, info, warn};

/// Something a provisioning component decided or observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
  /// The distribution probe ran.
  DistributionDetected { distribution: String },
  /// No installed version of the dependency was found.
  DependencyMissing { name: String },
  /// The installed version contains the required one.
  VersionMatched {
    name: String,
    installed: String,
    required: String,
  },
  /// Same decision as `VersionMatched`, reported when strict checking is off.
  VersionNotEnforced {
    name: String,
    installed: String,
    required: String,
  },
  /// The installed version does not contain the required one.
  VersionMismatch {
    name: String,
    installed: String,
    required: String,
  },
  /// An install script is about to run.
  InstallingDependency { name: String, version: String },
  /// The remote workspace was created and chowned.
  WorkspaceReady { path: String, owner: String },
  /// A deferred config value failed during rendering and was replaced by null.
  DeferredValueFailed { key: String, message: String },
  /// A config value with no data form was left out of the attributes.
  ValueOmitted { key: String, kind: String },
  /// Cookbooks were archived for upload.
  CookbooksPackaged { paths: Vec<String>, bytes: u64 },
  /// chef-solo is about to run.
  ConvergenceStarted { run_list: Vec<String> },
}

/// Receives provisioning events.
pub trait Reporter {
  fn report(&self, event: Event);
}

/// Reports events as `tracing` log lines.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
  fn report(&self, event: Event) {
    match event {
      Event::DistributionDetected { distribution } => {
        info!(distribution = %distribution, "using Linux distribution");
      }
      Event::DependencyMissing { name } => info!(dependency = %name, "no installed version found"),
      Event::VersionMatched {
        name,
        installed,
        required,
      } => info!(dependency = %name, installed = %installed, required = %required, "installed version matches"),
      Event::VersionNotEnforced {
        name,
        installed,
        required,
      } => info!(
        dependency = %name,
        installed = %installed,
        required = %required,
        "already installed, version not enforced; set care_about_{name}_version to check it"
      ),
      Event::VersionMismatch {
        name,
        installed,
        required,
      } => info!(dependency = %name, installed = %installed, required = %required, "version mismatch"),
      Event::InstallingDependency { name, version } => info!(dependency = %name, version = %version, "installing"),
      Event::WorkspaceReady { path, owner } => debug!(path = %path, owner = %owner, "workspace ready"),
      Event::DeferredValueFailed { key, message } => {
        debug!(key = %key, error = %message, "could not get the value, using null");
      }
      Event::ValueOmitted { key, kind } => debug!(key = %key, kind = %kind, "omitting non-data value"),
      Event::CookbooksPackaged { paths, bytes } => {
        info!(cookbooks = %paths.join(", "), bytes, "packaged cookbooks");
      }
      Event::ConvergenceStarted { run_list } => {
        if run_list.is_empty() {
          warn!("running chef-solo with an empty run list");
        } else {
          info!(run_list = %run_list.join(", "), "now running");
        }
      }
    }
  }
}
