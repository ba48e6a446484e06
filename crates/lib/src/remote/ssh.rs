//! `ssh`/`scp` transport.
//!
//! Every call spawns a fresh `ssh` (or `scp`) process in batch mode, so
//! authentication must work without prompting (keys or an agent).

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::{debug, info};

use crate::config::{ConfigError, Options, keys};

use super::{CommandOutput, Remote, RemoteError};

/// Reaches a host through the system `ssh` and `scp` binaries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshRemote {
  /// `host` or `user@host`.
  target: String,
  port: Option<u16>,
  identity: Option<PathBuf>,
  /// Extra `-o` options, e.g. `StrictHostKeyChecking=accept-new`.
  options: Vec<String>,
}

impl SshRemote {
  pub fn new(target: impl Into<String>) -> Self {
    Self {
      target: target.into(),
      port: None,
      identity: None,
      options: Vec::new(),
    }
  }

  /// Build from the `host`, `user`, `ssh_port`, `ssh_identity` and `ssh_options` settings.
  ///
  /// `user` is prepended to `host` unless the host already names one.
  pub fn from_options(options: &Options) -> Result<Self, ConfigError> {
    let host = options.host.as_deref().ok_or(ConfigError::Missing(keys::HOST))?;
    let target = match &options.user {
      Some(user) if !host.contains('@') => format!("{user}@{host}"),
      _ => host.to_string(),
    };
    Ok(Self {
      target,
      port: options.ssh_port,
      identity: options.ssh_identity.as_ref().map(PathBuf::from),
      options: options.ssh_options.clone(),
    })
  }

  pub fn with_port(mut self, port: u16) -> Self {
    self.port = Some(port);
    self
  }

  pub fn with_identity(mut self, identity: impl Into<PathBuf>) -> Self {
    self.identity = Some(identity.into());
    self
  }

  pub fn with_option(mut self, option: impl Into<String>) -> Self {
    self.options.push(option.into());
    self
  }

  /// Options shared by `ssh` and `scp`; only the port flag differs.
  fn common_args(&self, port_flag: &str) -> Vec<String> {
    let mut args = vec!["-o".to_string(), "BatchMode=yes".to_string()];
    if let Some(port) = self.port {
      args.push(port_flag.to_string());
      args.push(port.to_string());
    }
    if let Some(identity) = &self.identity {
      args.push("-i".to_string());
      args.push(identity.display().to_string());
    }
    for option in &self.options {
      args.push("-o".to_string());
      args.push(option.clone());
    }
    args
  }

  fn ssh_args(&self, command: &str) -> Vec<String> {
    let mut args = self.common_args("-p");
    args.push(self.target.clone());
    args.push(command.to_string());
    args
  }

  fn scp_args(&self, local: &Path, remote_path: &str) -> Vec<String> {
    let mut args = self.common_args("-P");
    args.push(local.display().to_string());
    args.push(format!("{}:{}", self.target, remote_path));
    args
  }

  fn ssh_command(&self, command: &str) -> Command {
    let mut cmd = Command::new("ssh");
    cmd.args(self.ssh_args(command)).stdin(Stdio::null());
    cmd
  }
}

impl Remote for SshRemote {
  fn host(&self) -> &str {
    &self.target
  }

  async fn run(&self, command: &str) -> Result<CommandOutput, RemoteError> {
    debug!(host = %self.target, cmd = %command, "running");
    let output = self
      .ssh_command(command)
      .output()
      .await
      .map_err(|source| RemoteError::Spawn {
        program: "ssh".to_string(),
        source,
      })?;

    Ok(CommandOutput {
      stdout: String::from_utf8_lossy(&output.stdout).to_string(),
      stderr: String::from_utf8_lossy(&output.stderr).to_string(),
      code: output.status.code(),
    })
  }

  async fn stream(&self, command: &str) -> Result<CommandOutput, RemoteError> {
    debug!(host = %self.target, cmd = %command, "streaming");
    let mut child = self
      .ssh_command(command)
      .stdout(Stdio::piped())
      .stderr(Stdio::piped())
      .spawn()
      .map_err(|source| RemoteError::Spawn {
        program: "ssh".to_string(),
        source,
      })?;

    let stdout = child
      .stdout
      .take()
      .ok_or_else(|| std::io::Error::other("ssh stdout was not captured"))?;
    let stderr = child
      .stderr
      .take()
      .ok_or_else(|| std::io::Error::other("ssh stderr was not captured"))?;

    let (stdout, stderr) = tokio::join!(
      relay(stdout, &self.target, "out"),
      relay(stderr, &self.target, "err")
    );
    let status = child.wait().await?;

    Ok(CommandOutput {
      stdout: stdout?,
      stderr: stderr?,
      code: status.code(),
    })
  }

  async fn upload(&self, local: &Path, remote_path: &str) -> Result<(), RemoteError> {
    debug!(host = %self.target, local = ?local, remote = %remote_path, "uploading");
    let output = Command::new("scp")
      .args(self.scp_args(local, remote_path))
      .stdin(Stdio::null())
      .output()
      .await
      .map_err(|source| RemoteError::Spawn {
        program: "scp".to_string(),
        source,
      })?;

    if !output.status.success() {
      return Err(RemoteError::UploadFailed {
        host: self.target.clone(),
        local: local.display().to_string(),
        remote: remote_path.to_string(),
        message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
      });
    }
    Ok(())
  }

  async fn put(&self, content: &str, remote_path: &str) -> Result<(), RemoteError> {
    let mut file = tempfile::NamedTempFile::new()?;
    file.write_all(content.as_bytes())?;
    file.flush()?;
    self.upload(file.path(), remote_path).await
  }
}

/// Log each line of `reader` as it arrives and return everything read.
async fn relay<R: AsyncRead + Unpin>(reader: R, host: &str, stream: &str) -> std::io::Result<String> {
  let mut lines = BufReader::new(reader).lines();
  let mut collected = String::new();
  while let Some(line) = lines.next_line().await? {
    info!(host = %host, stream, "{line}");
    collected.push_str(&line);
    collected.push('\n');
  }
  Ok(collected)
}
