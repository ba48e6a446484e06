//! Installed-version checks.
//!
//! Versions are compared by substring containment after normalization, not
//! by semantic ordering: `ruby --version` prints a whole banner, and the
//! required version only has to appear somewhere in it. A required version
//! that is a prefix of the installed one (`2.0.0` vs `2.0.0-p247`) therefore
//! counts as satisfied.

use crate::event::Event;
use crate::exec::Executor;
use crate::remote::{Remote, RemoteError};

/// Default normalizer: trims and drops hyphens, so `1.9.3-p194` and `1.9.3p194` compare equal.
pub fn normalize(version: &str) -> String {
  version.trim().replace('-', "")
}

/// Whether `installed` fails to satisfy `required` under [`normalize`].
pub fn upgrade_needed(installed: &str, required: &str) -> bool {
  !normalize(installed).contains(&normalize(required))
}

/// How the output of a version check command is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchRule {
  /// The output is a version banner; `absent_marker` in it means not installed.
  Contains { absent_marker: &'static str },
  /// The output only says whether a matching version exists; `absent_output` means it does not.
  Presence { absent_output: &'static str },
}

/// A version requirement and how to check it on the host.
#[derive(Debug, Clone)]
pub struct VersionCheck {
  pub name: String,
  pub required: String,
  pub command: String,
  pub rule: MatchRule,
  pub normalizer: fn(&str) -> String,
  /// Only changes what is reported when the installed version matches.
  pub strict: bool,
}

impl VersionCheck {
  /// Decide from the output of `command`. A failed command means not installed.
  pub fn decide(&self, stdout: &str, success: bool) -> Decision {
    let output = stdout.trim();
    if !success {
      return Decision::Missing;
    }

    match self.rule {
      MatchRule::Contains { absent_marker } => {
        if output.is_empty() || output.contains(absent_marker) {
          Decision::Missing
        } else if (self.normalizer)(output).contains(&(self.normalizer)(&self.required)) {
          Decision::Satisfied {
            installed: output.to_string(),
          }
        } else {
          Decision::Mismatch {
            installed: output.to_string(),
          }
        }
      }
      MatchRule::Presence { absent_output } => {
        if output == absent_output {
          Decision::Missing
        } else {
          Decision::Satisfied {
            installed: self.required.clone(),
          }
        }
      }
    }
  }
}

/// Outcome of a version check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
  Missing,
  Satisfied { installed: String },
  Mismatch { installed: String },
}

impl Decision {
  pub fn needs_install(&self) -> bool {
    !matches!(self, Decision::Satisfied { .. })
  }
}

/// Runs version checks on the host and reports what it found.
#[derive(Debug, Default, Clone, Copy)]
pub struct VersionProbe;

impl VersionProbe {
  pub async fn check<R: Remote>(&self, exec: &Executor<'_, R>, check: &VersionCheck) -> Result<Decision, RemoteError> {
    let output = exec.probe(&check.command).await?;
    let decision = check.decide(&output.stdout, output.success());

    let reporter = exec.reporter();
    match &decision {
      Decision::Missing => reporter.report(Event::DependencyMissing {
        name: check.name.clone(),
      }),
      Decision::Satisfied { installed } if check.strict => reporter.report(Event::VersionMatched {
        name: check.name.clone(),
        installed: installed.clone(),
        required: check.required.clone(),
      }),
      Decision::Satisfied { installed } => reporter.report(Event::VersionNotEnforced {
        name: check.name.clone(),
        installed: installed.clone(),
        required: check.required.clone(),
      }),
      Decision::Mismatch { installed } => reporter.report(Event::VersionMismatch {
        name: check.name.clone(),
        installed: installed.clone(),
        required: check.required.clone(),
      }),
    }
    Ok(decision)
  }

  pub async fn is_upgrade_needed<R: Remote>(
    &self,
    exec: &Executor<'_, R>,
    check: &VersionCheck,
  ) -> Result<bool, RemoteError> {
    Ok(self.check(exec, check).await?.needs_install())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::util::testutil::{RecordingRemote, RecordingReporter};
  use proptest::prelude::*;

  fn ruby_check(required: &str, strict: bool) -> VersionCheck {
    VersionCheck {
      name: "ruby".to_string(),
      required: required.to_string(),
      command: "ruby --version 2>&1 || true".to_string(),
      rule: MatchRule::Contains {
        absent_marker: "not found",
      },
      normalizer: normalize,
      strict,
    }
  }

  #[test]
  fn hyphen_does_not_matter() {
    assert!(!upgrade_needed(
      "ruby 1.9.3p194 (2012-04-20 revision 35410) [x86_64-linux]",
      "1.9.3-p194"
    ));
  }

  #[test]
  fn prefix_of_installed_is_satisfied() {
    assert!(!upgrade_needed("2.0.0-extra", "2.0.0"));
    assert!(upgrade_needed("1.9.3", "2.0.0"));
  }

  #[test]
  fn absent_marker_means_missing() {
    let check = ruby_check("2.0.0", true);
    assert_eq!(check.decide("bash: ruby: command not found", true), Decision::Missing);
    assert_eq!(check.decide("", true), Decision::Missing);
    assert_eq!(check.decide("ruby 2.0.0p0", false), Decision::Missing);
  }

  #[test]
  fn presence_rule_reads_gem_list_output() {
    let check = VersionCheck {
      name: "chef".to_string(),
      required: "~> 0.10.8".to_string(),
      command: "gem list -i chef -v '~> 0.10.8' || true".to_string(),
      rule: MatchRule::Presence { absent_output: "false" },
      normalizer: normalize,
      strict: true,
    };
    assert_eq!(check.decide("false\n", true), Decision::Missing);
    assert!(!check.decide("true\n", true).needs_install());
  }

  #[tokio::test]
  async fn strict_flag_only_changes_the_report() {
    for strict in [true, false] {
      let remote = RecordingRemote::new();
      remote.respond("ruby --version", "ruby 2.0.0p247");
      let reporter = RecordingReporter::default();
      let exec = Executor::new(&remote, true, "sudo", &reporter);

      let needed = VersionProbe.is_upgrade_needed(&exec, &ruby_check("2.0.0", strict)).await.unwrap();
      assert!(!needed);

      let events = reporter.events();
      assert_eq!(events.len(), 1);
      if strict {
        assert!(matches!(events[0], Event::VersionMatched { .. }));
      } else {
        assert!(matches!(events[0], Event::VersionNotEnforced { .. }));
      }
    }
  }

  #[tokio::test]
  async fn mismatch_is_reported() {
    let remote = RecordingRemote::new();
    remote.respond("ruby --version", "ruby 1.9.3p194");
    let reporter = RecordingReporter::default();
    let exec = Executor::new(&remote, true, "sudo", &reporter);

    assert!(VersionProbe.is_upgrade_needed(&exec, &ruby_check("2.0.0", true)).await.unwrap());
    assert!(matches!(reporter.events()[0], Event::VersionMismatch { .. }));
  }

  proptest! {
    #[test]
    fn surrounding_text_never_forces_an_install(
      prefix in "[a-z0-9. ()]{0,12}",
      required in "[0-9][0-9.p-]{0,10}",
      suffix in "[a-z0-9. ()-]{0,12}",
    ) {
      let installed = format!("{prefix}{required}{suffix}");
      prop_assert!(!upgrade_needed(&installed, &required));
    }

    #[test]
    fn result_matches_normalized_containment(
      installed in "[0-9.p-]{0,12}",
      required in "[0-9.p-]{1,8}",
    ) {
      let expected = !normalize(&installed).contains(&normalize(&required));
      prop_assert_eq!(upgrade_needed(&installed, &required), expected);
    }

    #[test]
    fn hyphens_in_required_are_ignored(
      installed in "[0-9.p]{0,12}",
      required in "[0-9.p]{1,8}",
      at in 0usize..8,
    ) {
      let at = at.min(required.len());
      let hyphenated = format!("{}-{}", &required[..at], &required[at..]);
      prop_assert_eq!(upgrade_needed(&installed, &required), upgrade_needed(&installed, &hyphenated));
    }
  }
}
