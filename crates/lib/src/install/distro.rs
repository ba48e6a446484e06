//! Supported-distribution gate.

use crate::consts::{DISTRIBUTION_COMMAND, SUPPORTED_DISTRIBUTION};
use crate::event::Event;
use crate::exec::Executor;
use crate::provision::{PreconditionError, ProvisionError};
use crate::remote::Remote;

/// Checks once per run that the host runs a supported distribution.
#[derive(Debug, Clone, Default)]
pub struct DistroGate {
  distribution: Option<String>,
  ensured: bool,
}

impl DistroGate {
  pub fn new() -> Self {
    Self::default()
  }

  /// The detected distribution, once probed.
  pub fn distribution(&self) -> Option<&str> {
    self.distribution.as_deref()
  }

  async fn detect<R: Remote>(&mut self, exec: &Executor<'_, R>) -> Result<String, ProvisionError> {
    if let Some(distribution) = &self.distribution {
      return Ok(distribution.clone());
    }
    let distribution = exec.capture(DISTRIBUTION_COMMAND).await?;
    self.distribution = Some(distribution.clone());
    Ok(distribution)
  }

  /// Abort unless the host's `/etc/issue` names the supported distribution.
  pub async fn ensure_supported<R: Remote>(&mut self, exec: &Executor<'_, R>) -> Result<(), ProvisionError> {
    if self.ensured {
      return Ok(());
    }

    let distribution = self.detect(exec).await?;
    exec.reporter().report(Event::DistributionDetected {
      distribution: distribution.clone(),
    });
    if !distribution.contains(SUPPORTED_DISTRIBUTION) {
      return Err(PreconditionError::UnsupportedDistribution { found: distribution }.into());
    }

    self.ensured = true;
    Ok(())
  }
}
