//! The provisioning sequence.
//!
//! A full run is:
//! 1. check the run list and cookbook directories (nothing remote yet)
//! 2. install ruby when the installed version does not match
//! 3. install chef when `gem` does not have a matching version
//! 4. render and upload `solo.rb` and `solo.json`
//! 5. archive, upload and extract the cookbooks
//! 6. run chef-solo
//!
//! chef is installed through ruby's `gem`, so ruby comes first. Any failure
//! aborts the run where it happened; nothing already done on the host is
//! undone.

mod types;

use std::path::{Path, PathBuf};

use tracing::info;

use crate::config::{ConfigStore, Options};
use crate::event::{Event, Reporter};
use crate::exec::Executor;
use crate::install::{DependencyInstaller, DependencySpec, InstallOutcome};
use crate::package::{ArtifactPackager, existing_cookbooks};
use crate::remote::Remote;
use crate::render::{ConfigRenderer, SOLO_JSON, SOLO_RB};
use crate::workspace::Workspace;

pub use types::{PreconditionError, ProvisionError, ProvisionReport};

/// Check what must hold before anything runs on the host.
///
/// Returns the cookbook directories that exist under `base_dir`.
pub fn validate(options: &Options, base_dir: &Path) -> Result<Vec<String>, PreconditionError> {
  if options.run_list.is_empty() {
    return Err(PreconditionError::EmptyRunList);
  }
  let cookbooks = existing_cookbooks(&options.cookbooks_directory, base_dir);
  if cookbooks.is_empty() {
    return Err(PreconditionError::NoCookbooks {
      searched: options.cookbooks_directory.clone(),
    });
  }
  Ok(cookbooks)
}

/// Drives one provisioning run against one host.
pub struct Orchestrator<'a, R: Remote> {
  store: &'a ConfigStore,
  options: &'a Options,
  exec: Executor<'a, R>,
  workspace: Workspace,
  installer: DependencyInstaller,
  packager: ArtifactPackager,
  base_dir: PathBuf,
}

impl<'a, R: Remote> Orchestrator<'a, R> {
  /// `base_dir` is where relative cookbook directories are looked up.
  pub fn new(
    store: &'a ConfigStore,
    options: &'a Options,
    remote: &'a R,
    reporter: &'a dyn Reporter,
    base_dir: impl Into<PathBuf>,
  ) -> Self {
    let base_dir = base_dir.into();
    Self {
      store,
      options,
      exec: Executor::new(remote, options.stream_output, options.sudo.clone(), reporter),
      workspace: Workspace::new(options.working_dir.clone(), options.workspace_owner()),
      installer: DependencyInstaller::new(options.package_manager.clone()),
      packager: ArtifactPackager::new(base_dir.clone(), options.copyfile_disable),
      base_dir,
    }
  }

  pub fn workspace(&self) -> &Workspace {
    &self.workspace
  }

  /// Install ruby if needed, then converge the run list.
  pub async fn provision(&mut self) -> Result<ProvisionReport, ProvisionError> {
    validate(self.options, &self.base_dir)?;
    let ruby = self.install_ruby().await?;
    let mut report = self.run_chef().await?;
    report.ruby = Some(ruby);
    Ok(report)
  }

  /// Install ruby unless the installed version matches.
  pub async fn install_ruby(&mut self) -> Result<InstallOutcome, ProvisionError> {
    let spec = DependencySpec::ruby(self.options);
    self.installer.ensure(&self.exec, &mut self.workspace, &spec).await
  }

  /// Whether [`Orchestrator::install_ruby`] would install anything.
  pub async fn ruby_install_needed(&self) -> Result<bool, ProvisionError> {
    let spec = DependencySpec::ruby(self.options);
    Ok(self.installer.check(&self.exec, &spec).await?.needs_install())
  }

  /// Install chef if needed, upload manifests and cookbooks, run chef-solo.
  pub async fn run_chef(&mut self) -> Result<ProvisionReport, ProvisionError> {
    let cookbooks = validate(self.options, &self.base_dir)?;

    let spec = DependencySpec::chef(self.options);
    let chef = self.installer.ensure(&self.exec, &mut self.workspace, &spec).await?;

    let renderer = ConfigRenderer::new(self.store);
    let bundle = renderer.render(&cookbooks, self.exec.reporter())?;
    renderer.upload(&bundle, &self.exec, &mut self.workspace).await?;

    let cookbooks = self
      .packager
      .package(&self.exec, &mut self.workspace, &self.options.cookbooks_directory)
      .await?;

    self.chef_solo().await?;

    Ok(ProvisionReport {
      ruby: None,
      chef: Some(chef),
      cookbooks,
      run_list: self.options.run_list.clone(),
    })
  }

  /// Run chef-solo against the uploaded manifests.
  pub async fn chef_solo(&mut self) -> Result<(), ProvisionError> {
    let solo_rb = self.workspace.path(&self.exec, &[SOLO_RB]).await?;
    let solo_json = self.workspace.path(&self.exec, &[SOLO_JSON]).await?;

    self.exec.reporter().report(Event::ConvergenceStarted {
      run_list: self.options.run_list.clone(),
    });

    let mut command = format!("chef-solo -c {solo_rb} -j {solo_json}");
    if self.options.debug_chef {
      command.push_str(" -l debug");
    }
    self.exec.execute_privileged(&command).await?;
    info!(host = %self.exec.remote().host(), "chef-solo finished");
    Ok(())
  }
}
