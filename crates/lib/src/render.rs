//! chef-solo manifests.
//!
//! Two files are generated for every run:
//! - `solo.rb` declares the cookbook search paths and the cache directory,
//!   all relative to the directory the file is in
//! - `solo.json` holds the node attributes: the whole configuration store with
//!   deferred values evaluated and non-data values dropped
//!
//! Anything named `password` never reaches the attributes, and its
//! computation is never run: it is usually a prompt the user chose not to
//! answer because keys are used instead.

use serde_json::{Map, Number, Value as Json};

use crate::config::{ConfigStore, Value};
use crate::consts::PASSWORD_KEY;
use crate::event::{Event, Reporter};
use crate::exec::Executor;
use crate::package::archive_name;
use crate::provision::ProvisionError;
use crate::remote::Remote;
use crate::workspace::Workspace;

pub const SOLO_RB: &str = "solo.rb";
pub const SOLO_JSON: &str = "solo.json";
pub const CACHE_DIR: &str = "cache";

/// Rendered `solo.rb` and `solo.json`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestBundle {
  pub solo_rb: String,
  pub solo_json: String,
}

/// Quote `s` as a Ruby double-quoted literal, without interpolation.
fn ruby_string(s: &str) -> String {
  let mut quoted = String::with_capacity(s.len() + 2);
  quoted.push('"');
  for c in s.chars() {
    match c {
      '"' => quoted.push_str("\\\""),
      '\\' => quoted.push_str("\\\\"),
      '#' => quoted.push_str("\\#"),
      '\n' => quoted.push_str("\\n"),
      c => quoted.push(c),
    }
  }
  quoted.push('"');
  quoted
}

/// `solo.rb` declaring `cookbooks` (as archived) under the file's own directory.
pub fn render_solo_rb(cookbooks: &[String]) -> String {
  let paths = cookbooks
    .iter()
    .map(|dir| format!("File.join(root, {})", ruby_string(&archive_name(dir))))
    .collect::<Vec<_>>()
    .join(", ");

  format!(
    "root = File.expand_path(File.dirname(__FILE__))\n\
     file_cache_path File.join(root, {})\n\
     cookbook_path [ {} ]\n",
    ruby_string(CACHE_DIR),
    paths
  )
}

/// The node attributes for every entry of `store`.
pub fn render_attributes(store: &ConfigStore, reporter: &dyn Reporter) -> Json {
  let mut attributes = Map::new();
  for (key, value) in store.entries() {
    if key == PASSWORD_KEY {
      continue;
    }
    if let Some(json) = to_json(key, value, reporter) {
      attributes.insert(key.clone(), json);
    }
  }
  Json::Object(attributes)
}

/// Convert one value; `None` means the value is left out.
fn to_json(path: &str, value: &Value, reporter: &dyn Reporter) -> Option<Json> {
  match value {
    Value::Null => Some(Json::Null),
    Value::Bool(b) => Some(Json::Bool(*b)),
    Value::Integer(i) => Some(Json::Number((*i).into())),
    Value::Float(f) => Some(Number::from_f64(*f).map(Json::Number).unwrap_or(Json::Null)),
    Value::String(s) => Some(Json::String(s.clone())),
    Value::List(items) => Some(Json::Array(
      items
        .iter()
        .enumerate()
        .filter_map(|(i, item)| to_json(&format!("{path}[{i}]"), item, reporter))
        .collect(),
    )),
    Value::Map(entries) => {
      let mut object = Map::new();
      for (key, value) in entries {
        if key == PASSWORD_KEY {
          continue;
        }
        if let Some(json) = to_json(&format!("{path}.{key}"), value, reporter) {
          object.insert(key.clone(), json);
        }
      }
      Some(Json::Object(object))
    }
    Value::Deferred(deferred) => match deferred.evaluate() {
      Ok(value) => to_json(path, &value, reporter),
      Err(e) => {
        reporter.report(Event::DeferredValueFailed {
          key: path.to_string(),
          message: e.0,
        });
        Some(Json::Null)
      }
    },
    Value::Opaque(kind) => {
      reporter.report(Event::ValueOmitted {
        key: path.to_string(),
        kind: kind.clone(),
      });
      None
    }
  }
}

/// Renders and uploads the chef-solo manifests.
pub struct ConfigRenderer<'s> {
  store: &'s ConfigStore,
}

impl<'s> ConfigRenderer<'s> {
  pub fn new(store: &'s ConfigStore) -> Self {
    Self { store }
  }

  pub fn render(&self, cookbooks: &[String], reporter: &dyn Reporter) -> Result<ManifestBundle, ProvisionError> {
    let attributes = render_attributes(self.store, reporter);
    Ok(ManifestBundle {
      solo_rb: render_solo_rb(cookbooks),
      solo_json: serde_json::to_string_pretty(&attributes)?,
    })
  }

  /// Write both files into the workspace.
  pub async fn upload<R: Remote>(
    &self,
    bundle: &ManifestBundle,
    exec: &Executor<'_, R>,
    workspace: &mut Workspace,
  ) -> Result<(), ProvisionError> {
    let solo_rb = workspace.path(exec, &[SOLO_RB]).await?;
    exec.remote().put(&bundle.solo_rb, &solo_rb).await?;
    let solo_json = workspace.path(exec, &[SOLO_JSON]).await?;
    exec.remote().put(&bundle.solo_json, &solo_json).await?;
    Ok(())
  }
}
