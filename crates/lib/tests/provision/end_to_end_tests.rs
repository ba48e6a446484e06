//! Full provisioning runs against a fake host.

use flate2::read::GzDecoder;
use roundsman_lib::event::Event;
use roundsman_lib::install::InstallOutcome;
use roundsman_lib::provision::{Orchestrator, PreconditionError, ProvisionError};

use super::common::{Events, FakeHost, Project};

const CONFIG: &str = r#"
return {
  user = "vagrant",
  ruby_version = "2.0.0",
  run_list = { "recipe[main]" },
  cookbooks_directory = { "a", "b" },
}
"#;

fn archived_files(bytes: &[u8]) -> Vec<String> {
  let mut archive = tar::Archive::new(GzDecoder::new(bytes));
  archive
    .entries()
    .unwrap()
    .map(|entry| entry.unwrap())
    .filter(|entry| entry.header().entry_type().is_file())
    .map(|entry| entry.path().unwrap().to_string_lossy().to_string())
    .collect()
}

#[tokio::test]
async fn outdated_ruby_is_replaced() {
  let project = Project::new(CONFIG);
  project.cookbook("a", "main");
  let (store, options) = project.load();
  let host = FakeHost::new(Some("1.9.3"), true);
  let events = Events::default();

  let report = Orchestrator::new(&store, &options, &host, &events, project.dir())
    .provision()
    .await
    .unwrap();

  assert_eq!(
    report.ruby,
    Some(InstallOutcome::Installed {
      script: "/tmp/roundsman/install_ruby.sh".to_string()
    })
  );
  let script = host.text("/tmp/roundsman/install_ruby.sh").unwrap();
  assert!(script.contains("ruby-build 2.0.0 /usr/local"));
  assert!(host.ran("sudo bash /tmp/roundsman/install_ruby.sh"));
}

#[tokio::test]
async fn matching_ruby_is_kept() {
  let project = Project::new(CONFIG);
  project.cookbook("a", "main");
  let (store, options) = project.load();
  let host = FakeHost::new(Some("2.0.0-extra"), true);
  let events = Events::default();

  let report = Orchestrator::new(&store, &options, &host, &events, project.dir())
    .provision()
    .await
    .unwrap();

  assert_eq!(report.ruby, Some(InstallOutcome::AlreadySatisfied));
  assert!(host.file("/tmp/roundsman/install_ruby.sh").is_none());
  assert!(!host.ran("install_ruby.sh"));
  assert!(!host.ran("apt-get"));
}

#[tokio::test]
async fn only_existing_cookbooks_are_shipped() {
  let project = Project::new(CONFIG);
  project.cookbook("a", "main");
  let (store, options) = project.load();
  let host = FakeHost::new(Some("2.0.0"), true);
  let events = Events::default();

  let report = Orchestrator::new(&store, &options, &host, &events, project.dir())
    .provision()
    .await
    .unwrap();
  assert_eq!(report.cookbooks, vec!["a"]);

  let archive = host.file("/tmp/roundsman/cookbooks.tar.gz").unwrap();
  assert_eq!(archived_files(&archive), vec!["a/main/recipes/default.rb"]);

  let solo_rb = host.text("/tmp/roundsman/solo.rb").unwrap();
  assert!(solo_rb.contains("cookbook_path [ File.join(root, \"a\") ]"));
  assert!(!solo_rb.contains("\"b\""));
}

#[tokio::test]
async fn workspace_is_prepared_once() {
  let project = Project::new(CONFIG);
  project.cookbook("a", "main");
  let (store, options) = project.load();
  let host = FakeHost::new(None, false);
  let events = Events::default();

  Orchestrator::new(&store, &options, &host, &events, project.dir())
    .provision()
    .await
    .unwrap();

  let commands = host.commands();
  assert_eq!(commands.iter().filter(|c| c.starts_with("mkdir -p")).count(), 1);
  assert_eq!(commands.iter().filter(|c| c.contains("chown -R")).count(), 1);
  assert!(host.file("/tmp/roundsman/install_chef.sh").is_some());
  assert_eq!(
    commands.last().unwrap(),
    "sudo chef-solo -c /tmp/roundsman/solo.rb -j /tmp/roundsman/solo.json"
  );
}

#[tokio::test]
async fn empty_run_list_is_rejected_before_connecting() {
  let project = Project::new(
    r#"
return {
  user = "vagrant",
  run_list = {},
  cookbooks_directory = "a",
}
"#,
  );
  project.cookbook("a", "main");
  let (store, options) = project.load();
  let host = FakeHost::new(Some("1.9.3"), true);
  let events = Events::default();

  let err = Orchestrator::new(&store, &options, &host, &events, project.dir())
    .provision()
    .await
    .unwrap_err();

  assert!(matches!(err, ProvisionError::Precondition(PreconditionError::EmptyRunList)));
  assert!(host.commands().is_empty());
}

#[tokio::test]
async fn attributes_hold_evaluated_config() {
  let project = Project::new(
    r#"
local calls = 0
return {
  user = "vagrant",
  run_list = { "recipe[main]" },
  cookbooks_directory = "a",
  app = { name = "blog", port = 8080 },
  db_host = function() calls = calls + 1; return "db-" .. calls end,
  password = function() error("must not be asked") end,
  secret = function() error("vault unreachable") end,
}
"#,
  );
  project.cookbook("a", "main");
  let (store, options) = project.load();
  let host = FakeHost::new(Some("1.9.3-p194"), true);
  let events = Events::default();

  Orchestrator::new(&store, &options, &host, &events, project.dir())
    .provision()
    .await
    .unwrap();

  let attributes: serde_json::Value = serde_json::from_str(&host.text("/tmp/roundsman/solo.json").unwrap()).unwrap();
  assert_eq!(attributes["app"], serde_json::json!({"name": "blog", "port": 8080}));
  assert_eq!(attributes["db_host"], "db-1");
  assert_eq!(attributes["secret"], serde_json::Value::Null);
  assert!(attributes.get("password").is_none());
  assert_eq!(attributes["run_list"], serde_json::json!(["recipe[main]"]));

  assert!(events.all().iter().any(|event| matches!(
    event,
    Event::DeferredValueFailed { key, .. } if key == "secret"
  )));
}
