//! Implementation of the `roundsman install-ruby` command.

use anyhow::{Context, Result};

use roundsman_lib::event::TracingReporter;
use roundsman_lib::provision::Orchestrator;
use roundsman_lib::remote::Remote;
use roundsman_lib::remote::ssh::SshRemote;

use super::{Overrides, Session, describe_outcome, runtime};
use crate::output::print_success;

pub fn cmd_install_ruby(overrides: &Overrides) -> Result<()> {
  let session = Session::load(overrides, Vec::new())?;
  let options = session.options()?;
  let remote = SshRemote::from_options(&options)?;

  let rt = runtime()?;
  let outcome = rt
    .block_on(async {
      Orchestrator::new(
        &session.store,
        &options,
        &remote,
        &TracingReporter,
        session.base_dir(),
      )
      .install_ruby()
      .await
    })
    .context("Failed to install ruby")?;

  print_success(&format!(
    "ruby {} on {}: {}",
    options.ruby_version,
    remote.host(),
    describe_outcome(Some(&outcome))
  ));
  Ok(())
}
