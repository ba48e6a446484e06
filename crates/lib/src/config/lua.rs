//! Loading configuration from a Lua file.
//!
//! The file returns a table of settings:
//!
//! ```lua
//! return {
//!   host = "vagrant@192.168.33.10",
//!   run_list = { "recipe[main::cold]" },
//!   ruby_version = "2.0.0-p0",
//!   app = { name = "blog", port = 8080 },
//!   password = function() return io.read() end,
//! }
//! ```
//!
//! Conversion rules:
//! - sequences (keys exactly `1..n`, `n > 0`) become lists, other tables maps
//! - functions become deferred values, called with no arguments on demand
//! - userdata, light userdata and threads become opaque values
//!
//! A `roundsman` global is available while the file runs; `roundsman.dir`
//! is the directory containing the config file.

use std::fs;
use std::path::Path;

use mlua::prelude::*;
use tracing::{debug, warn};

use super::value::{DeferredError, Value};
use super::{ConfigError, ConfigStore};

/// Deepest table nesting accepted, guards against self-referencing tables.
const MAX_DEPTH: usize = 32;

/// Evaluate the Lua file at `path` and assign every key it returns.
pub fn load_file(store: &mut ConfigStore, path: &Path) -> Result<(), ConfigError> {
  let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
    path: path.display().to_string(),
    source,
  })?;
  let dir = path
    .parent()
    .filter(|p| !p.as_os_str().is_empty())
    .unwrap_or(Path::new("."));
  load_str(store, &content, &format!("@{}", path.display()), dir)
}

/// Evaluate Lua source and assign every key it returns.
///
/// A chunk returning `nil` assigns nothing.
pub fn load_str(store: &mut ConfigStore, source: &str, name: &str, dir: &Path) -> Result<(), ConfigError> {
  let lua = Lua::new();
  register_globals(&lua, dir)?;

  let result = lua.load(source).set_name(name).eval::<LuaValue>()?;
  let table = match result {
    LuaValue::Table(table) => table,
    LuaValue::Nil => {
      store.attach_runtime(lua);
      return Ok(());
    }
    other => return Err(ConfigError::NotATable(other.type_name().to_string())),
  };

  for pair in table.pairs::<LuaValue, LuaValue>() {
    let (key, value) = pair?;
    let Some(key) = key_string(&key) else {
      warn!(key_type = key.type_name(), "ignoring config entry with non-string key");
      continue;
    };
    let value = from_lua(value, 0)?;
    debug!(key = %key, kind = value.kind(), "config entry");
    store.set(key, value);
  }

  store.attach_runtime(lua);
  Ok(())
}

fn register_globals(lua: &Lua, dir: &Path) -> LuaResult<()> {
  let globals = lua.create_table()?;
  globals.set("dir", dir.to_string_lossy().to_string())?;
  lua.globals().set("roundsman", globals)?;
  Ok(())
}

fn key_string(key: &LuaValue) -> Option<String> {
  match key {
    LuaValue::String(s) => Some(s.to_string_lossy()),
    LuaValue::Integer(i) => Some(i.to_string()),
    LuaValue::Number(n) => Some(n.to_string()),
    _ => None,
  }
}

fn from_lua(value: LuaValue, depth: usize) -> LuaResult<Value> {
  if depth > MAX_DEPTH {
    return Err(LuaError::external("config table nesting is too deep"));
  }
  let value = match value {
    LuaValue::Nil => Value::Null,
    LuaValue::Boolean(b) => Value::Bool(b),
    LuaValue::Integer(i) => Value::Integer(i),
    LuaValue::Number(n) => Value::Float(n),
    LuaValue::String(s) => Value::String(s.to_string_lossy()),
    LuaValue::Table(table) => table_to_value(&table, depth)?,
    LuaValue::Function(function) => deferred(function),
    other => Value::Opaque(other.type_name().to_string()),
  };
  Ok(value)
}

fn deferred(function: LuaFunction) -> Value {
  Value::deferred(move || {
    let result = function
      .call::<LuaValue>(())
      .map_err(|e| DeferredError(e.to_string()))?;
    from_lua(result, 0).map_err(|e| DeferredError(e.to_string()))
  })
}

fn table_to_value(table: &LuaTable, depth: usize) -> LuaResult<Value> {
  let mut pairs = Vec::new();
  for pair in table.clone().pairs::<LuaValue, LuaValue>() {
    pairs.push(pair?);
  }

  let len = table.raw_len();
  let is_sequence = len > 0
    && pairs.len() == len
    && pairs
      .iter()
      .all(|(k, _)| matches!(k, LuaValue::Integer(i) if *i >= 1 && (*i as usize) <= len));

  if is_sequence {
    let mut items = vec![Value::Null; len];
    for (key, value) in pairs {
      if let LuaValue::Integer(i) = key {
        items[i as usize - 1] = from_lua(value, depth + 1)?;
      }
    }
    return Ok(Value::List(items));
  }

  let mut map = std::collections::BTreeMap::new();
  for (key, value) in pairs {
    match key_string(&key) {
      Some(key) => {
        map.insert(key, from_lua(value, depth + 1)?);
      }
      None => warn!(key_type = key.type_name(), "ignoring table entry with unsupported key"),
    }
  }
  Ok(Value::Map(map))
}
