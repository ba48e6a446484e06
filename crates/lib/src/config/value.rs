//! Configuration values.
//!
//! A [`Value`] is either plain data (scalars, lists, maps), a [`Deferred`]
//! computation evaluated on demand, or an [`Value::Opaque`] handle that the
//! config file produced but which has no data representation (Lua userdata,
//! coroutines). Only the data kinds ever reach the attributes file.

use std::cell::OnceCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use thiserror::Error;

/// Failure raised by a deferred computation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct DeferredError(pub String);

type Compute = dyn Fn() -> Result<Value, DeferredError>;

/// A zero-argument computation stored in place of a value.
///
/// The first successful evaluation is memoized and shared by every clone,
/// so a key is computed at most once per run. Failures are not memoized.
#[derive(Clone)]
pub struct Deferred {
  compute: Rc<Compute>,
  memo: Rc<OnceCell<Value>>,
}

impl Deferred {
  pub fn new<F>(compute: F) -> Self
  where
    F: Fn() -> Result<Value, DeferredError> + 'static,
  {
    Self {
      compute: Rc::new(compute),
      memo: Rc::new(OnceCell::new()),
    }
  }

  /// Evaluate the computation, returning the memoized result when available.
  pub fn evaluate(&self) -> Result<Value, DeferredError> {
    if let Some(value) = self.memo.get() {
      return Ok(value.clone());
    }
    let value = (self.compute)()?;
    let _ = self.memo.set(value.clone());
    Ok(value)
  }

  /// Whether a successful evaluation has already happened.
  pub fn is_evaluated(&self) -> bool {
    self.memo.get().is_some()
  }
}

impl fmt::Debug for Deferred {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Deferred")
      .field("evaluated", &self.is_evaluated())
      .finish()
  }
}

/// A configuration value.
#[derive(Debug, Clone)]
pub enum Value {
  Null,
  Bool(bool),
  Integer(i64),
  Float(f64),
  String(String),
  List(Vec<Value>),
  Map(BTreeMap<String, Value>),
  /// Computed on demand.
  Deferred(Deferred),
  /// A config-runtime object with no data form; carries its type name.
  Opaque(String),
}

impl Value {
  /// Wrap a closure as a deferred value.
  pub fn deferred<F>(compute: F) -> Self
  where
    F: Fn() -> Result<Value, DeferredError> + 'static,
  {
    Value::Deferred(Deferred::new(compute))
  }

  /// Short name of the value kind, used in diagnostics.
  pub fn kind(&self) -> &str {
    match self {
      Value::Null => "null",
      Value::Bool(_) => "boolean",
      Value::Integer(_) => "integer",
      Value::Float(_) => "float",
      Value::String(_) => "string",
      Value::List(_) => "list",
      Value::Map(_) => "map",
      Value::Deferred(_) => "deferred",
      Value::Opaque(name) => name,
    }
  }

  pub fn is_deferred(&self) -> bool {
    matches!(self, Value::Deferred(_))
  }

  pub fn as_str(&self) -> Option<&str> {
    match self {
      Value::String(s) => Some(s),
      _ => None,
    }
  }

  pub fn as_bool(&self) -> Option<bool> {
    match self {
      Value::Bool(b) => Some(*b),
      _ => None,
    }
  }

  pub fn as_integer(&self) -> Option<i64> {
    match self {
      Value::Integer(i) => Some(*i),
      _ => None,
    }
  }

  /// Follow deferred values until plain data (or an opaque handle) is reached.
  pub fn resolve(&self) -> Result<Value, DeferredError> {
    let mut current = self.clone();
    while let Value::Deferred(deferred) = current {
      current = deferred.evaluate()?;
    }
    Ok(current)
  }

  /// Human-readable rendering used by the `configuration` listing.
  ///
  /// Deferred values are shown as `<deferred>` and are never evaluated here.
  pub fn display(&self) -> String {
    match self {
      Value::Null => "nil".to_string(),
      Value::Bool(b) => b.to_string(),
      Value::Integer(i) => i.to_string(),
      Value::Float(f) => f.to_string(),
      Value::String(s) => format!("{s:?}"),
      Value::List(items) => {
        let items: Vec<String> = items.iter().map(Value::display).collect();
        format!("[{}]", items.join(", "))
      }
      Value::Map(map) => {
        let entries: Vec<String> = map.iter().map(|(k, v)| format!("{k:?} => {}", v.display())).collect();
        format!("{{{}}}", entries.join(", "))
      }
      Value::Deferred(_) => "<deferred>".to_string(),
      Value::Opaque(name) => format!("<{name}>"),
    }
  }
}

impl From<&str> for Value {
  fn from(value: &str) -> Self {
    Value::String(value.to_string())
  }
}

impl From<String> for Value {
  fn from(value: String) -> Self {
    Value::String(value)
  }
}

impl From<bool> for Value {
  fn from(value: bool) -> Self {
    Value::Bool(value)
  }
}

impl From<i64> for Value {
  fn from(value: i64) -> Self {
    Value::Integer(value)
  }
}

impl From<f64> for Value {
  fn from(value: f64) -> Self {
    Value::Float(value)
  }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
  fn from(values: Vec<T>) -> Self {
    Value::List(values.into_iter().map(Into::into).collect())
  }
}

impl From<BTreeMap<String, Value>> for Value {
  fn from(map: BTreeMap<String, Value>) -> Self {
    Value::Map(map)
  }
}
