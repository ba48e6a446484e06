//! Command execution policy over a [`Remote`].
//!
//! A non-zero exit is fatal. Call sites that want to tolerate a failure say
//! so in the command itself (`cmd || true`), except for [`Executor::probe`],
//! which is used to ask questions whose failure is an answer.

use tracing::debug;

use crate::event::Reporter;
use crate::remote::{CommandOutput, Remote, RemoteError};

/// Runs commands on the remote host, streamed or buffered.
pub struct Executor<'r, R: Remote> {
  remote: &'r R,
  stream_output: bool,
  sudo: String,
  reporter: &'r dyn Reporter,
}

impl<'r, R: Remote> Executor<'r, R> {
  pub fn new(remote: &'r R, stream_output: bool, sudo: impl Into<String>, reporter: &'r dyn Reporter) -> Self {
    Self {
      remote,
      stream_output,
      sudo: sudo.into(),
      reporter,
    }
  }

  pub fn remote(&self) -> &'r R {
    self.remote
  }

  pub fn reporter(&self) -> &'r dyn Reporter {
    self.reporter
  }

  /// Run `command`, failing on a non-zero exit.
  pub async fn execute(&self, command: &str) -> Result<CommandOutput, RemoteError> {
    let output = if self.stream_output {
      self.remote.stream(command).await?
    } else {
      self.remote.run(command).await?
    };

    if !output.success() {
      return Err(RemoteError::CommandFailed {
        host: self.remote.host().to_string(),
        cmd: command.to_string(),
        code: output.code,
        stderr: output.stderr,
      });
    }
    Ok(output)
  }

  /// Run `command` behind the privilege prefix.
  pub async fn execute_privileged(&self, command: &str) -> Result<CommandOutput, RemoteError> {
    let command = if self.sudo.is_empty() {
      command.to_string()
    } else {
      format!("{} {}", self.sudo, command)
    };
    self.execute(&command).await
  }

  /// Run `command` buffered and return its trimmed stdout.
  pub async fn capture(&self, command: &str) -> Result<String, RemoteError> {
    self.remote.capture(command).await
  }

  /// Run `command` buffered, returning its output whatever the exit status.
  pub async fn probe(&self, command: &str) -> Result<CommandOutput, RemoteError> {
    let output = self.remote.run(command).await?;
    if !output.success() {
      debug!(cmd = %command, code = ?output.code, "probe exited unsuccessfully");
    }
    Ok(output)
  }
}
