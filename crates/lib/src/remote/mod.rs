//! Remote command and file-transfer primitives.
//!
//! [`Remote`] is the boundary to the host being provisioned. Everything above
//! it decides *what* to run; implementations only know *how* to reach the
//! host. [`ssh::SshRemote`] shells out to `ssh` and `scp`.

pub mod ssh;

use std::path::Path;

use thiserror::Error;

/// Output of a finished remote command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
  pub stdout: String,
  pub stderr: String,
  /// Exit code, `None` when the process was killed by a signal.
  pub code: Option<i32>,
}

impl CommandOutput {
  /// A successful command that printed `stdout`.
  pub fn ok(stdout: impl Into<String>) -> Self {
    Self {
      stdout: stdout.into(),
      stderr: String::new(),
      code: Some(0),
    }
  }

  pub fn success(&self) -> bool {
    self.code == Some(0)
  }
}

/// Errors raised by the remote primitives.
#[derive(Debug, Error)]
pub enum RemoteError {
  /// A command exited unsuccessfully.
  #[error("command failed on {host} with exit code {code:?}: {cmd}")]
  CommandFailed {
    host: String,
    cmd: String,
    code: Option<i32>,
    stderr: String,
  },

  /// A file could not be transferred.
  #[error("upload of {local} to {host}:{remote} failed: {message}")]
  UploadFailed {
    host: String,
    local: String,
    remote: String,
    message: String,
  },

  /// The transport program could not be started.
  #[error("failed to run {program}: {source}")]
  Spawn {
    program: String,
    #[source]
    source: std::io::Error,
  },

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),
}

/// Access to the host being provisioned.
///
/// `run` and `stream` return the command's output whatever its exit status;
/// deciding whether a failure is fatal belongs to the caller.
#[allow(async_fn_in_trait)]
pub trait Remote {
  /// Name of the host, used in diagnostics.
  fn host(&self) -> &str;

  /// Run a command and buffer its output.
  async fn run(&self, command: &str) -> Result<CommandOutput, RemoteError>;

  /// Run a command, relaying its output line by line as it arrives.
  async fn stream(&self, command: &str) -> Result<CommandOutput, RemoteError>;

  /// Copy a local file to `remote_path`.
  async fn upload(&self, local: &Path, remote_path: &str) -> Result<(), RemoteError>;

  /// Write `content` to `remote_path`.
  async fn put(&self, content: &str, remote_path: &str) -> Result<(), RemoteError>;

  /// Run a command and return its trimmed stdout, failing on a non-zero exit.
  async fn capture(&self, command: &str) -> Result<String, RemoteError> {
    let output = self.run(command).await?;
    if !output.success() {
      return Err(RemoteError::CommandFailed {
        host: self.host().to_string(),
        cmd: command.to_string(),
        code: output.code,
        stderr: output.stderr,
      });
    }
    Ok(output.stdout.trim().to_string())
  }
}
