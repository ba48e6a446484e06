//! Implementation of the `roundsman run-chef` command.

use std::time::Instant;

use anyhow::{Context, Result};

use roundsman_lib::event::TracingReporter;
use roundsman_lib::provision::{Orchestrator, validate};
use roundsman_lib::remote::Remote;
use roundsman_lib::remote::ssh::SshRemote;

use super::{Overrides, Session, describe_outcome, runtime};
use crate::output::{format_duration, print_stat, print_success};

/// Install chef if needed, upload manifests and cookbooks, and converge.
///
/// Ruby is assumed to be present already.
pub fn cmd_run_chef(overrides: &Overrides, recipes: Vec<String>) -> Result<()> {
  let session = Session::load(overrides, recipes)?;
  let options = session.options()?;
  validate(&options, session.base_dir())?;
  let remote = SshRemote::from_options(&options)?;

  let start = Instant::now();
  let rt = runtime()?;
  let report = rt
    .block_on(async {
      Orchestrator::new(
        &session.store,
        &options,
        &remote,
        &TracingReporter,
        session.base_dir(),
      )
      .run_chef()
      .await
    })
    .context("chef run failed")?;

  print_success(&format!(
    "Converged {} in {}",
    remote.host(),
    format_duration(start.elapsed())
  ));
  print_stat("Chef", &describe_outcome(report.chef.as_ref()));
  print_stat("Cookbooks", &report.cookbooks.join(", "));
  print_stat("Run list", &report.run_list.join(", "));
  Ok(())
}
