//! Implementation of the `roundsman provision` command.
//!
//! Installs ruby when needed, then runs chef on the host: the whole
//! provisioning sequence in one go.

use std::time::Instant;

use anyhow::{Context, Result};

use roundsman_lib::event::TracingReporter;
use roundsman_lib::provision::{Orchestrator, validate};
use roundsman_lib::remote::Remote;
use roundsman_lib::remote::ssh::SshRemote;

use super::{Overrides, Session, describe_outcome, runtime};
use crate::output::{format_duration, print_stat, print_success};

pub fn cmd_provision(overrides: &Overrides, recipes: Vec<String>) -> Result<()> {
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
      .provision()
      .await
    })
    .context("Provisioning failed")?;

  print_success(&format!(
    "Provisioned {} in {}",
    remote.host(),
    format_duration(start.elapsed())
  ));
  print_stat("Ruby", &describe_outcome(report.ruby.as_ref()));
  print_stat("Chef", &describe_outcome(report.chef.as_ref()));
  print_stat("Cookbooks", &report.cookbooks.join(", "));
  print_stat("Run list", &report.run_list.join(", "));
  Ok(())
}
