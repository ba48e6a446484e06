//! Install script templates.
//!
//! Placeholders substituted by [`render_template`]. Values arrive already
//! quoted for the shell, so templates use them bare:
//! - `{version}`: the required version of the dependency
//! - `{install_dir}`: where the dependency is installed
//! - `{working_dir}`: the remote workspace
//! - `{remote_user}`: the account owning the workspace

/// Builds the requested ruby with ruby-build.
pub const RUBY_INSTALL_SCRIPT: &str = r#"set -e
cd {working_dir}
rm -rf ruby-build
git clone -q https://github.com/rbenv/ruby-build.git
cd ruby-build
./install.sh
ruby-build {version} {install_dir}
"#;

/// Replaces any installed chef with the requested version constraint.
pub const CHEF_INSTALL_SCRIPT: &str = r#"set -e
gem uninstall -xaI chef || true
gem install chef -v {version} --quiet --no-document
gem install ruby-shadow --quiet --no-document
"#;

/// Substitute `{name}` placeholders with their values.
pub fn render_template(template: &str, vars: &[(&str, &str)]) -> String {
  vars.iter().fold(template.to_string(), |acc, (name, value)| {
    acc.replace(&format!("{{{name}}}"), value)
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn ruby_script_substitutes_version_and_dir() {
    let script = render_template(
      RUBY_INSTALL_SCRIPT,
      &[
        ("version", "2.0.0-p0"),
        ("install_dir", "/opt/ruby"),
        ("working_dir", "/tmp/roundsman"),
      ],
    );
    assert!(script.contains("cd /tmp/roundsman\n"));
    assert!(script.contains("ruby-build 2.0.0-p0 /opt/ruby"));
    assert!(!script.contains('{'));
  }

  #[test]
  fn chef_script_tolerates_missing_chef() {
    let script = render_template(CHEF_INSTALL_SCRIPT, &[("version", "'~> 0.10.8'")]);
    assert!(script.contains("gem uninstall -xaI chef || true"));
    assert!(script.contains("gem install chef -v '~> 0.10.8'"));
  }

  #[test]
  fn unknown_placeholders_are_left_alone() {
    assert_eq!(render_template("echo {other}", &[("version", "1")]), "echo {other}");
  }
}
