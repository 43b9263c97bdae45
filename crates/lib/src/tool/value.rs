//! Dynamic attribute values held by tools and published as script results.

use std::any::Any;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::target::FileTarget;

/// A reference-counted handle to an arbitrary object.
///
/// Cloning a `Shared` never copies the object: both handles observe the same
/// instance. Equality, ordering and hashing go by identity, so a `Shared` can
/// take part in memoisation keys without the object being comparable itself.
#[derive(Clone)]
pub struct Shared(Arc<dyn Any + Send + Sync>);

impl Shared {
  pub fn new<T: Any + Send + Sync>(value: T) -> Self {
    Shared(Arc::new(value))
  }

  pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
    self.0.downcast_ref::<T>()
  }

  /// True if both handles point at the same object.
  pub fn ptr_eq(&self, other: &Shared) -> bool {
    self.addr() == other.addr()
  }

  fn addr(&self) -> usize {
    Arc::as_ptr(&self.0) as *const () as usize
  }
}

impl fmt::Debug for Shared {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "Shared({:#x})", self.addr())
  }
}

impl PartialEq for Shared {
  fn eq(&self, other: &Self) -> bool {
    self.ptr_eq(other)
  }
}

impl Eq for Shared {}

impl PartialOrd for Shared {
  fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
    Some(self.cmp(other))
  }
}

impl Ord for Shared {
  fn cmp(&self, other: &Self) -> std::cmp::Ordering {
    self.addr().cmp(&other.addr())
  }
}

impl Hash for Shared {
  fn hash<H: Hasher>(&self, state: &mut H) {
    self.addr().hash(state);
  }
}

/// A tool attribute or script result.
///
/// `List`, `Set` and `Map` are the built-in containers: cloning a `Value`
/// copies them recursively. `Shared` objects and the task inside a `Target`
/// are carried over by reference. That split is exactly the selective deep
/// copy `CloneTool` relies on.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Value {
  #[default]
  None,
  Bool(bool),
  Int(i64),
  Str(String),
  List(Vec<Value>),
  Set(BTreeSet<Value>),
  Map(BTreeMap<Value, Value>),
  Target(FileTarget),
  Shared(Shared),
}

impl Value {
  /// Wrap any object as a shared reference.
  pub fn shared<T: Any + Send + Sync>(value: T) -> Self {
    Value::Shared(Shared::new(value))
  }

  /// Name of the variant, for error messages.
  pub fn kind(&self) -> &'static str {
    match self {
      Value::None => "none",
      Value::Bool(_) => "bool",
      Value::Int(_) => "int",
      Value::Str(_) => "string",
      Value::List(_) => "list",
      Value::Set(_) => "set",
      Value::Map(_) => "map",
      Value::Target(_) => "target",
      Value::Shared(_) => "shared",
    }
  }

  pub fn is_none(&self) -> bool {
    matches!(self, Value::None)
  }

  pub fn as_bool(&self) -> Option<bool> {
    match self {
      Value::Bool(b) => Some(*b),
      _ => None,
    }
  }

  pub fn as_int(&self) -> Option<i64> {
    match self {
      Value::Int(i) => Some(*i),
      _ => None,
    }
  }

  pub fn as_str(&self) -> Option<&str> {
    match self {
      Value::Str(s) => Some(s),
      _ => None,
    }
  }

  pub fn as_list(&self) -> Option<&[Value]> {
    match self {
      Value::List(items) => Some(items),
      _ => None,
    }
  }

  pub fn as_list_mut(&mut self) -> Option<&mut Vec<Value>> {
    match self {
      Value::List(items) => Some(items),
      _ => None,
    }
  }

  pub fn as_set(&self) -> Option<&BTreeSet<Value>> {
    match self {
      Value::Set(items) => Some(items),
      _ => None,
    }
  }

  pub fn as_set_mut(&mut self) -> Option<&mut BTreeSet<Value>> {
    match self {
      Value::Set(items) => Some(items),
      _ => None,
    }
  }

  pub fn as_map(&self) -> Option<&BTreeMap<Value, Value>> {
    match self {
      Value::Map(entries) => Some(entries),
      _ => None,
    }
  }

  pub fn as_map_mut(&mut self) -> Option<&mut BTreeMap<Value, Value>> {
    match self {
      Value::Map(entries) => Some(entries),
      _ => None,
    }
  }

  pub fn as_target(&self) -> Option<&FileTarget> {
    match self {
      Value::Target(target) => Some(target),
      _ => None,
    }
  }

  pub fn as_shared(&self) -> Option<&Shared> {
    match self {
      Value::Shared(shared) => Some(shared),
      _ => None,
    }
  }

  /// Downcast a shared object to a concrete type.
  pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
    self.as_shared().and_then(Shared::downcast_ref)
  }
}

impl fmt::Display for Value {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Value::None => write!(f, "none"),
      Value::Bool(b) => write!(f, "{}", b),
      Value::Int(i) => write!(f, "{}", i),
      Value::Str(s) => write!(f, "{}", s),
      Value::List(items) => {
        write!(f, "[")?;
        for (i, item) in items.iter().enumerate() {
          if i > 0 {
            write!(f, ", ")?;
          }
          write!(f, "{}", item)?;
        }
        write!(f, "]")
      }
      Value::Set(items) => {
        write!(f, "{{")?;
        for (i, item) in items.iter().enumerate() {
          if i > 0 {
            write!(f, ", ")?;
          }
          write!(f, "{}", item)?;
        }
        write!(f, "}}")
      }
      Value::Map(entries) => {
        write!(f, "{{")?;
        for (i, (key, value)) in entries.iter().enumerate() {
          if i > 0 {
            write!(f, ", ")?;
          }
          write!(f, "{}: {}", key, value)?;
        }
        write!(f, "}}")
      }
      Value::Target(target) => write!(f, "{}", target.path),
      Value::Shared(shared) => write!(f, "{:?}", shared),
    }
  }
}

impl From<bool> for Value {
  fn from(value: bool) -> Self {
    Value::Bool(value)
  }
}

impl From<i64> for Value {
  fn from(value: i64) -> Self {
    Value::Int(value)
  }
}

impl From<i32> for Value {
  fn from(value: i32) -> Self {
    Value::Int(value.into())
  }
}

impl From<&str> for Value {
  fn from(value: &str) -> Self {
    Value::Str(value.to_string())
  }
}

impl From<String> for Value {
  fn from(value: String) -> Self {
    Value::Str(value)
  }
}

impl From<Vec<Value>> for Value {
  fn from(values: Vec<Value>) -> Self {
    Value::List(values)
  }
}

impl From<Vec<String>> for Value {
  fn from(values: Vec<String>) -> Self {
    Value::List(values.into_iter().map(Value::Str).collect())
  }
}

impl From<Vec<&str>> for Value {
  fn from(values: Vec<&str>) -> Self {
    Value::List(values.into_iter().map(Value::from).collect())
  }
}

impl From<BTreeSet<Value>> for Value {
  fn from(values: BTreeSet<Value>) -> Self {
    Value::Set(values)
  }
}

impl From<BTreeMap<Value, Value>> for Value {
  fn from(entries: BTreeMap<Value, Value>) -> Self {
    Value::Map(entries)
  }
}

impl From<BTreeMap<String, String>> for Value {
  fn from(entries: BTreeMap<String, String>) -> Self {
    Value::Map(
      entries
        .into_iter()
        .map(|(k, v)| (Value::Str(k), Value::Str(v)))
        .collect(),
    )
  }
}

impl From<FileTarget> for Value {
  fn from(target: FileTarget) -> Self {
    Value::Target(target)
  }
}

impl From<Shared> for Value {
  fn from(shared: Shared) -> Self {
    Value::Shared(shared)
  }
}

impl<T: Into<Value>> From<Option<T>> for Value {
  fn from(value: Option<T>) -> Self {
    value.map(Into::into).unwrap_or(Value::None)
  }
}
