//! The configuration store.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use mlua::Lua;
use serde::Serialize;

use super::ConfigError;
use super::value::Value;

/// Longest rendering of a value in the defaults listing before truncation.
const DISPLAY_WIDTH: usize = 40;

/// A default as shown by the `configuration` listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DefaultEntry {
  pub key: String,
  pub value: String,
  pub overridden: bool,
}

/// Key/value store with default/override tracking.
///
/// Keys registered through [`ConfigStore::set_default`] are remembered as
/// defaults; once the user assigns the key (before or after the default is
/// registered) it is reported as overridden.
#[derive(Default)]
pub struct ConfigStore {
  entries: BTreeMap<String, Value>,
  defaults: BTreeSet<String>,
  overridden: BTreeSet<String>,
  // Declared last so deferred Lua functions in `entries` drop before their runtime.
  _runtime: Option<Lua>,
}

impl fmt::Debug for ConfigStore {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ConfigStore")
      .field("entries", &self.entries)
      .field("defaults", &self.defaults)
      .field("overridden", &self.overridden)
      .finish_non_exhaustive()
  }
}

impl ConfigStore {
  pub fn new() -> Self {
    Self::default()
  }

  /// Assign a key, marking it overridden if it was registered as a default.
  pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
    let key = key.into();
    if self.defaults.contains(&key) {
      self.overridden.insert(key.clone());
    }
    self.entries.insert(key, value.into());
  }

  /// Register a default. An existing assignment wins and is marked overridden.
  pub fn set_default(&mut self, key: impl Into<String>, value: impl Into<Value>) {
    let key = key.into();
    self.defaults.insert(key.clone());
    if self.entries.contains_key(&key) {
      self.overridden.insert(key);
    } else {
      self.entries.insert(key, value.into());
    }
  }

  pub fn has(&self, key: &str) -> bool {
    self.entries.contains_key(key)
  }

  /// The stored value, without evaluating deferred values.
  pub fn get_raw(&self, key: &str) -> Option<&Value> {
    self.entries.get(key)
  }

  /// The value for `key` with deferred computations evaluated (memoized).
  pub fn get(&self, key: &str) -> Result<Option<Value>, ConfigError> {
    match self.entries.get(key) {
      None => Ok(None),
      Some(value) => value.resolve().map(Some).map_err(|e| ConfigError::Deferred {
        key: key.to_string(),
        message: e.0,
      }),
    }
  }

  pub fn get_string(&self, key: &str) -> Result<Option<String>, ConfigError> {
    match self.get(key)? {
      None | Some(Value::Null) => Ok(None),
      Some(Value::String(s)) => Ok(Some(s)),
      Some(Value::Integer(i)) => Ok(Some(i.to_string())),
      Some(Value::Float(f)) => Ok(Some(f.to_string())),
      Some(other) => Err(ConfigError::invalid_type(key, "string", &other)),
    }
  }

  pub fn get_bool(&self, key: &str) -> Result<Option<bool>, ConfigError> {
    match self.get(key)? {
      None | Some(Value::Null) => Ok(None),
      Some(Value::Bool(b)) => Ok(Some(b)),
      Some(other) => Err(ConfigError::invalid_type(key, "boolean", &other)),
    }
  }

  pub fn get_integer(&self, key: &str) -> Result<Option<i64>, ConfigError> {
    match self.get(key)? {
      None | Some(Value::Null) => Ok(None),
      Some(Value::Integer(i)) => Ok(Some(i)),
      Some(other) => Err(ConfigError::invalid_type(key, "integer", &other)),
    }
  }

  /// A list of strings; a single string is accepted as a one-element list.
  pub fn get_string_list(&self, key: &str) -> Result<Vec<String>, ConfigError> {
    match self.get(key)? {
      None | Some(Value::Null) => Ok(Vec::new()),
      Some(Value::String(s)) => Ok(vec![s]),
      Some(Value::Map(map)) if map.is_empty() => Ok(Vec::new()),
      Some(Value::List(items)) => items
        .iter()
        .map(|item| match item.resolve() {
          Ok(Value::String(s)) => Ok(s),
          Ok(other) => Err(ConfigError::invalid_type(key, "list of strings", &other)),
          Err(e) => Err(ConfigError::Deferred {
            key: key.to_string(),
            message: e.0,
          }),
        })
        .collect(),
      Some(other) => Err(ConfigError::invalid_type(key, "list of strings", &other)),
    }
  }

  /// All entries in key order.
  pub fn entries(&self) -> impl Iterator<Item = (&String, &Value)> {
    self.entries.iter()
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn is_overridden(&self, key: &str) -> bool {
    self.overridden.contains(key)
  }

  /// Every registered default, sorted by key.
  pub fn defaults(&self) -> Vec<DefaultEntry> {
    self
      .defaults
      .iter()
      .map(|key| {
        let value = self.entries.get(key).map(Value::display).unwrap_or_else(|| "nil".to_string());
        DefaultEntry {
          key: key.clone(),
          value: truncate_display(value),
          overridden: self.overridden.contains(key),
        }
      })
      .collect()
  }

  /// Keep the Lua runtime alive for as long as its functions are stored here.
  pub(crate) fn attach_runtime(&mut self, lua: Lua) {
    self._runtime = Some(lua);
  }
}

fn truncate_display(value: String) -> String {
  if value.chars().count() <= DISPLAY_WIDTH {
    return value;
  }
  let head: String = value.chars().take(DISPLAY_WIDTH).collect();
  format!("{head}... (truncated)")
}
