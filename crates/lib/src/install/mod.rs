//! Idempotent dependency installation.
//!
//! Each dependency goes through the same steps: check the installed version,
//! and only when it is missing or wrong, stage a rendered install script in
//! the workspace and run it with privileges. Dependencies that need OS
//! packages first pass the distribution gate and install them with the
//! configured package manager.

mod distro;
pub mod templates;

pub use distro::DistroGate;

use serde::Serialize;
use tracing::debug;

use crate::config::Options;
use crate::event::Event;
use crate::exec::Executor;
use crate::provision::ProvisionError;
use crate::remote::Remote;
use crate::util::shell_escape;
use crate::version::{Decision, MatchRule, VersionCheck, VersionProbe, normalize};
use crate::workspace::Workspace;

use templates::render_template;

pub const RUBY_SCRIPT: &str = "install_ruby.sh";
pub const CHEF_SCRIPT: &str = "install_chef.sh";

/// A dependency, how to check it, and how to install it.
#[derive(Debug, Clone)]
pub struct DependencySpec {
  pub check: VersionCheck,
  /// Script template, see [`templates`] for placeholders.
  pub install_script: String,
  pub install_dir: Option<String>,
  /// File name of the staged script inside the workspace.
  pub script_name: &'static str,
  /// OS packages to install before the script runs.
  pub os_packages: Vec<String>,
}

impl DependencySpec {
  /// The ruby interpreter, built with ruby-build.
  pub fn ruby(options: &Options) -> Self {
    Self {
      check: VersionCheck {
        name: "ruby".to_string(),
        required: options.ruby_version.clone(),
        command: "ruby --version 2>&1 || true".to_string(),
        rule: MatchRule::Contains {
          absent_marker: "not found",
        },
        normalizer: normalize,
        strict: options.care_about_ruby_version,
      },
      install_script: options.ruby_install_script.clone(),
      install_dir: Some(options.ruby_install_dir.clone()),
      script_name: RUBY_SCRIPT,
      os_packages: options.ruby_dependencies.clone(),
    }
  }

  /// The chef gem, installed through ruby's `gem`.
  pub fn chef(options: &Options) -> Self {
    Self {
      check: VersionCheck {
        name: "chef".to_string(),
        required: options.chef_version.clone(),
        command: format!("gem list -i chef -v {} || true", shell_escape(&options.chef_version)),
        rule: MatchRule::Presence { absent_output: "false" },
        normalizer: normalize,
        strict: true,
      },
      install_script: options.chef_install_script.clone(),
      install_dir: None,
      script_name: CHEF_SCRIPT,
      os_packages: Vec::new(),
    }
  }

  pub fn name(&self) -> &str {
    &self.check.name
  }

  /// The install script with every placeholder shell-quoted.
  pub fn render_script(&self, working_dir: &str, remote_user: &str) -> String {
    let version = shell_escape(&self.check.required);
    let install_dir = shell_escape(self.install_dir.as_deref().unwrap_or_default());
    let working_dir = shell_escape(working_dir);
    let remote_user = shell_escape(remote_user);
    render_template(
      &self.install_script,
      &[
        ("version", version.as_str()),
        ("install_dir", install_dir.as_str()),
        ("working_dir", working_dir.as_str()),
        ("remote_user", remote_user.as_str()),
      ],
    )
  }
}

/// What [`DependencyInstaller::ensure`] did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum InstallOutcome {
  AlreadySatisfied,
  /// The script was staged at `script` and ran.
  Installed { script: String },
}

/// Installs dependencies on the host.
#[derive(Debug, Clone)]
pub struct DependencyInstaller {
  package_manager: String,
  distro: DistroGate,
  probe: VersionProbe,
}

impl DependencyInstaller {
  pub fn new(package_manager: impl Into<String>) -> Self {
    Self {
      package_manager: package_manager.into(),
      distro: DistroGate::new(),
      probe: VersionProbe,
    }
  }

  /// Check the installed version against `spec`.
  pub async fn check<R: Remote>(&self, exec: &Executor<'_, R>, spec: &DependencySpec) -> Result<Decision, ProvisionError> {
    Ok(self.probe.check(exec, &spec.check).await?)
  }

  /// Install `spec` unless the installed version already satisfies it.
  pub async fn ensure<R: Remote>(
    &mut self,
    exec: &Executor<'_, R>,
    workspace: &mut Workspace,
    spec: &DependencySpec,
  ) -> Result<InstallOutcome, ProvisionError> {
    if !self.check(exec, spec).await?.needs_install() {
      return Ok(InstallOutcome::AlreadySatisfied);
    }
    let script = self.install(exec, workspace, spec).await?;
    Ok(InstallOutcome::Installed { script })
  }

  /// Install `spec` unconditionally, returning the staged script path.
  pub async fn install<R: Remote>(
    &mut self,
    exec: &Executor<'_, R>,
    workspace: &mut Workspace,
    spec: &DependencySpec,
  ) -> Result<String, ProvisionError> {
    if !spec.os_packages.is_empty() {
      self.install_os_packages(exec, &spec.os_packages).await?;
    }

    let owner = workspace.resolve_owner(exec).await?;
    let script = spec.render_script(workspace.base_path(), &owner);
    let script_path = workspace.path(exec, &[spec.script_name]).await?;
    exec.remote().put(&script, &script_path).await?;

    exec.reporter().report(Event::InstallingDependency {
      name: spec.name().to_string(),
      version: spec.check.required.clone(),
    });
    exec.execute_privileged(&format!("bash {script_path}")).await?;
    Ok(script_path)
  }

  async fn install_os_packages<R: Remote>(&mut self, exec: &Executor<'_, R>, packages: &[String]) -> Result<(), ProvisionError> {
    self.distro.ensure_supported(exec).await?;
    debug!(packages = %packages.join(" "), "installing os packages");
    exec
      .execute_privileged(&format!("{} -yq update", self.package_manager))
      .await?;
    exec
      .execute_privileged(&format!("{} -yq install {}", self.package_manager, packages.join(" ")))
      .await?;
    Ok(())
  }
}
