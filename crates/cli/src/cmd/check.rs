//! Implementation of the `roundsman check-ruby-version` command.

use anyhow::{Context, Result, bail};

use roundsman_lib::event::TracingReporter;
use roundsman_lib::provision::Orchestrator;
use roundsman_lib::remote::Remote;
use roundsman_lib::remote::ssh::SshRemote;

use super::{Overrides, Session, runtime};
use crate::output::print_success;

/// Fails when `install-ruby` would install something.
pub fn cmd_check_ruby_version(overrides: &Overrides) -> Result<()> {
  let session = Session::load(overrides, Vec::new())?;
  let options = session.options()?;
  let remote = SshRemote::from_options(&options)?;

  let rt = runtime()?;
  let needed = rt
    .block_on(async {
      Orchestrator::new(
        &session.store,
        &options,
        &remote,
        &TracingReporter,
        session.base_dir(),
      )
      .ruby_install_needed()
      .await
    })
    .context("Failed to check the ruby version")?;

  if needed {
    bail!(
      "ruby {} is not installed on {}",
      options.ruby_version,
      remote.host()
    );
  }
  print_success(&format!("ruby {} is installed on {}", options.ruby_version, remote.host()));
  Ok(())
}
