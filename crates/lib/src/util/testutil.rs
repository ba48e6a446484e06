//! Test doubles for roundsman-lib.
//!
//! [`RecordingRemote`] stands in for a host: it records every command and
//! upload, and answers commands from canned responses matched by substring.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::event::{Event, Reporter};
use crate::remote::{CommandOutput, Remote, RemoteError};

/// In-memory remote host.
pub struct RecordingRemote {
  host: String,
  commands: RefCell<Vec<String>>,
  streamed: Cell<usize>,
  uploads: RefCell<Vec<String>>,
  sources: RefCell<Vec<PathBuf>>,
  reject_uploads: Cell<bool>,
  files: RefCell<BTreeMap<String, Vec<u8>>>,
  responses: RefCell<Vec<(String, CommandOutput)>>,
}

impl RecordingRemote {
  pub fn new() -> Self {
    Self {
      host: "test-host".to_string(),
      commands: RefCell::new(Vec::new()),
      streamed: Cell::new(0),
      uploads: RefCell::new(Vec::new()),
      sources: RefCell::new(Vec::new()),
      reject_uploads: Cell::new(false),
      files: RefCell::new(BTreeMap::new()),
      responses: RefCell::new(Vec::new()),
    }
  }

  /// Answer commands containing `pattern` with a successful `stdout`.
  pub fn respond(&self, pattern: &str, stdout: &str) {
    self
      .responses
      .borrow_mut()
      .push((pattern.to_string(), CommandOutput::ok(stdout)));
  }

  /// Fail commands containing `pattern` with exit `code`.
  pub fn fail(&self, pattern: &str, code: i32) {
    self.responses.borrow_mut().push((
      pattern.to_string(),
      CommandOutput {
        stdout: String::new(),
        stderr: format!("{pattern}: failed"),
        code: Some(code),
      },
    ));
  }

  pub fn commands(&self) -> Vec<String> {
    self.commands.borrow().clone()
  }

  /// Number of commands that went through `stream`.
  pub fn streamed(&self) -> usize {
    self.streamed.get()
  }

  /// Remote paths written, in order.
  pub fn uploads(&self) -> Vec<String> {
    self.uploads.borrow().clone()
  }

  /// Make every file upload fail.
  pub fn reject_uploads(&self) {
    self.reject_uploads.set(true);
  }

  /// Local files handed to `upload`, including rejected ones.
  pub fn sources(&self) -> Vec<PathBuf> {
    self.sources.borrow().clone()
  }

  pub fn file(&self, remote_path: &str) -> Option<Vec<u8>> {
    self.files.borrow().get(remote_path).cloned()
  }

  pub fn file_text(&self, remote_path: &str) -> Option<String> {
    self.file(remote_path).map(|bytes| String::from_utf8_lossy(&bytes).to_string())
  }

  fn answer(&self, command: &str) -> CommandOutput {
    self.commands.borrow_mut().push(command.to_string());
    // Latest registration wins.
    self
      .responses
      .borrow()
      .iter()
      .rev()
      .find(|(pattern, _)| command.contains(pattern.as_str()))
      .map(|(_, output)| output.clone())
      .unwrap_or_else(|| CommandOutput::ok(""))
  }
}

impl Default for RecordingRemote {
  fn default() -> Self {
    Self::new()
  }
}

impl Remote for RecordingRemote {
  fn host(&self) -> &str {
    &self.host
  }

  async fn run(&self, command: &str) -> Result<CommandOutput, RemoteError> {
    Ok(self.answer(command))
  }

  async fn stream(&self, command: &str) -> Result<CommandOutput, RemoteError> {
    self.streamed.set(self.streamed.get() + 1);
    Ok(self.answer(command))
  }

  async fn upload(&self, local: &Path, remote_path: &str) -> Result<(), RemoteError> {
    self.sources.borrow_mut().push(local.to_path_buf());
    if self.reject_uploads.get() {
      return Err(RemoteError::UploadFailed {
        host: self.host.clone(),
        local: local.display().to_string(),
        remote: remote_path.to_string(),
        message: "connection reset".to_string(),
      });
    }
    let bytes = std::fs::read(local)?;
    self.uploads.borrow_mut().push(remote_path.to_string());
    self.files.borrow_mut().insert(remote_path.to_string(), bytes);
    Ok(())
  }

  async fn put(&self, content: &str, remote_path: &str) -> Result<(), RemoteError> {
    self.uploads.borrow_mut().push(remote_path.to_string());
    self
      .files
      .borrow_mut()
      .insert(remote_path.to_string(), content.as_bytes().to_vec());
    Ok(())
  }
}

/// Collects reported events.
#[derive(Default)]
pub struct RecordingReporter {
  events: RefCell<Vec<Event>>,
}

impl RecordingReporter {
  pub fn events(&self) -> Vec<Event> {
    self.events.borrow().clone()
  }
}

impl Reporter for RecordingReporter {
  fn report(&self, event: Event) {
    self.events.borrow_mut().push(event);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn unmatched_commands_succeed_silently() {
    let remote = RecordingRemote::new();
    let output = remote.run("uptime").await.unwrap();
    assert!(output.success());
    assert_eq!(output.stdout, "");
    assert_eq!(remote.commands(), vec!["uptime"]);
  }

  #[tokio::test]
  async fn latest_response_wins() {
    let remote = RecordingRemote::new();
    remote.respond("ruby", "ruby 1.9.3p194");
    remote.respond("ruby --version", "ruby 2.0.0p0");
    assert_eq!(remote.capture("ruby --version").await.unwrap(), "ruby 2.0.0p0");
  }

  #[tokio::test]
  async fn put_is_readable_back() {
    let remote = RecordingRemote::new();
    remote.put("{}", "/tmp/roundsman/solo.json").await.unwrap();
    assert_eq!(remote.file_text("/tmp/roundsman/solo.json").as_deref(), Some("{}"));
    assert_eq!(remote.uploads(), vec!["/tmp/roundsman/solo.json"]);
  }
}
