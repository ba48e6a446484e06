//! The remote scratch directory.
//!
//! Every generated file (install scripts, chef-solo manifests, the cookbook
//! archive) is staged under one directory on the host. The directory is
//! created and handed to the remote user the first time a path inside it is
//! requested, and never again within the same run.

use crate::event::Event;
use crate::exec::Executor;
use crate::remote::{Remote, RemoteError};
use crate::util::join_remote;

#[derive(Debug, Clone)]
pub struct Workspace {
  base_path: String,
  owner: Option<String>,
  ensured: bool,
}

impl Workspace {
  /// A workspace at `base_path` owned by `owner`.
  ///
  /// When `owner` is `None` the owner is asked from the host (`whoami`)
  /// on first use.
  pub fn new(base_path: impl Into<String>, owner: Option<String>) -> Self {
    Self {
      base_path: base_path.into(),
      owner,
      ensured: false,
    }
  }

  pub fn base_path(&self) -> &str {
    &self.base_path
  }

  /// The resolved owner, if known yet.
  pub fn owner(&self) -> Option<&str> {
    self.owner.as_deref()
  }

  pub fn is_ensured(&self) -> bool {
    self.ensured
  }

  /// Resolve the owner without touching the directory.
  pub async fn resolve_owner<R: Remote>(&mut self, exec: &Executor<'_, R>) -> Result<String, RemoteError> {
    if let Some(owner) = &self.owner {
      return Ok(owner.clone());
    }
    let owner = exec.capture("whoami").await?;
    self.owner = Some(owner.clone());
    Ok(owner)
  }

  /// Create the directory and chown it to the owner. Runs once per workspace.
  pub async fn ensure<R: Remote>(&mut self, exec: &Executor<'_, R>) -> Result<(), RemoteError> {
    if self.ensured {
      return Ok(());
    }

    let owner = self.resolve_owner(exec).await?;
    exec.execute(&format!("mkdir -p {}", self.base_path)).await?;
    exec
      .execute_privileged(&format!("chown -R {} {}", owner, self.base_path))
      .await?;

    self.ensured = true;
    exec.reporter().report(Event::WorkspaceReady {
      path: self.base_path.clone(),
      owner,
    });
    Ok(())
  }

  /// Path of `segments` inside the workspace, ensuring it first.
  pub async fn path<R: Remote, S: AsRef<str>>(
    &mut self,
    exec: &Executor<'_, R>,
    segments: &[S],
  ) -> Result<String, RemoteError> {
    self.ensure(exec).await?;
    Ok(join_remote(&self.base_path, segments))
  }
}
