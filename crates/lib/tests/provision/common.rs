//! Shared helpers for provisioning integration tests.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use roundsman_lib::config::{ConfigStore, Options, lua, register_defaults};
use roundsman_lib::event::{Event, Reporter};
use roundsman_lib::remote::{CommandOutput, Remote, RemoteError};
use tempfile::TempDir;

/// A pretend Ubuntu host with a given ruby and chef installed.
pub struct FakeHost {
  pub ruby: Option<String>,
  pub chef_installed: bool,
  pub issue: String,
  commands: RefCell<Vec<String>>,
  files: RefCell<BTreeMap<String, Vec<u8>>>,
}

impl FakeHost {
  pub fn new(ruby: Option<&str>, chef_installed: bool) -> Self {
    Self {
      ruby: ruby.map(str::to_string),
      chef_installed,
      issue: "Ubuntu 12.04.2 LTS \\n \\l".to_string(),
      commands: RefCell::new(Vec::new()),
      files: RefCell::new(BTreeMap::new()),
    }
  }

  pub fn commands(&self) -> Vec<String> {
    self.commands.borrow().clone()
  }

  pub fn ran(&self, needle: &str) -> bool {
    self.commands.borrow().iter().any(|c| c.contains(needle))
  }

  pub fn file(&self, path: &str) -> Option<Vec<u8>> {
    self.files.borrow().get(path).cloned()
  }

  pub fn text(&self, path: &str) -> Option<String> {
    self.file(path).map(|bytes| String::from_utf8(bytes).unwrap())
  }

  fn answer(&self, command: &str) -> CommandOutput {
    self.commands.borrow_mut().push(command.to_string());
    let stdout = if command.starts_with("ruby --version") {
      match &self.ruby {
        Some(version) => format!("ruby {version} (2013-02-22) [x86_64-linux]\n"),
        None => "bash: ruby: command not found\n".to_string(),
      }
    } else if command.starts_with("gem list -i") {
      format!("{}\n", self.chef_installed)
    } else if command == "cat /etc/issue" {
      format!("{}\n", self.issue)
    } else if command == "whoami" {
      "vagrant\n".to_string()
    } else {
      String::new()
    };
    CommandOutput {
      stdout,
      stderr: String::new(),
      code: Some(0),
    }
  }
}

impl Remote for FakeHost {
  fn host(&self) -> &str {
    "fake"
  }

  async fn run(&self, command: &str) -> Result<CommandOutput, RemoteError> {
    Ok(self.answer(command))
  }

  async fn stream(&self, command: &str) -> Result<CommandOutput, RemoteError> {
    Ok(self.answer(command))
  }

  async fn upload(&self, local: &Path, remote_path: &str) -> Result<(), RemoteError> {
    let bytes = std::fs::read(local)?;
    self.files.borrow_mut().insert(remote_path.to_string(), bytes);
    Ok(())
  }

  async fn put(&self, content: &str, remote_path: &str) -> Result<(), RemoteError> {
    self
      .files
      .borrow_mut()
      .insert(remote_path.to_string(), content.as_bytes().to_vec());
    Ok(())
  }
}

#[derive(Default)]
pub struct Events(RefCell<Vec<Event>>);

impl Events {
  pub fn all(&self) -> Vec<Event> {
    self.0.borrow().clone()
  }
}

impl Reporter for Events {
  fn report(&self, event: Event) {
    self.0.borrow_mut().push(event);
  }
}

/// A project directory with a `roundsman.lua` and cookbook directories.
pub struct Project {
  pub temp: TempDir,
}

impl Project {
  pub fn new(config: &str) -> Self {
    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join("roundsman.lua"), config).unwrap();
    Self { temp }
  }

  pub fn dir(&self) -> PathBuf {
    self.temp.path().to_path_buf()
  }

  /// Create a cookbook with a default recipe under `dir`.
  pub fn cookbook(&self, dir: &str, name: &str) {
    let recipes = self.temp.path().join(dir).join(name).join("recipes");
    std::fs::create_dir_all(&recipes).unwrap();
    std::fs::write(recipes.join("default.rb"), "log 'converged'\n").unwrap();
  }

  pub fn load(&self) -> (ConfigStore, Options) {
    let mut store = ConfigStore::new();
    register_defaults(&mut store);
    lua::load_file(&mut store, &self.temp.path().join("roundsman.lua")).unwrap();
    let options = Options::from_store(&store).unwrap();
    (store, options)
  }
}
