use std::any::Any;
use std::collections::BTreeMap;
use std::ops::{Deref, DerefMut};

use tracing::trace;

use super::memo::{MemoCache, MemoKey};
use super::types::ToolError;
use super::Value;

/// Attribute storage shared by every build action.
///
/// Attributes are declared while the tool is *open*, which only happens
/// inside [`Tool::build`]. Constructors nest: a derived constructor may hand
/// its [`Construct`] guard to a base constructor, which opens it again. Once
/// the outermost guard drops the set of attribute names is frozen for good:
/// assigning an undeclared name fails with [`ToolError::UnknownAttribute`],
/// while assigning a declared one succeeds and clears the memoisation cache.
#[derive(Default)]
pub struct Tool {
  fields: BTreeMap<String, Value>,
  open: usize,
  memo: MemoCache,
}

impl std::fmt::Debug for Tool {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Tool")
      .field("fields", &self.fields)
      .field("open", &self.open)
      .field("cached", &self.memo.len())
      .finish()
  }
}

impl Tool {
  /// A closed tool with no attributes.
  pub fn new() -> Self {
    Self::default()
  }

  /// Construct a tool. `construct` runs in the open phase; the names it
  /// declares are the tool's attributes from then on.
  pub fn build(construct: impl FnOnce(&mut Construct<'_>)) -> Self {
    let mut tool = Tool::default();
    construct(&mut tool.enter());
    tool
  }

  fn enter(&mut self) -> Construct<'_> {
    self.open += 1;
    Construct { tool: self }
  }

  /// Reopen for a nested constructor. Only valid while construction is in
  /// progress; a finished tool stays closed.
  pub fn open(&mut self) -> Result<Construct<'_>, ToolError> {
    if self.open == 0 {
      return Err(ToolError::Closed);
    }
    Ok(self.enter())
  }

  pub fn is_open(&self) -> bool {
    self.open > 0
  }

  /// Assign an attribute, subject to the lock.
  pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<(), ToolError> {
    if let Some(slot) = self.fields.get_mut(name) {
      *slot = value.into();
    } else if self.open > 0 {
      self.fields.insert(name.to_string(), value.into());
    } else {
      return Err(ToolError::UnknownAttribute(name.to_string()));
    }
    self.memo.clear();
    Ok(())
  }

  /// Modify a declared attribute in place. Counts as a write.
  pub fn update<R>(&mut self, name: &str, f: impl FnOnce(&mut Value) -> R) -> Result<R, ToolError> {
    let slot = self
      .fields
      .get_mut(name)
      .ok_or_else(|| ToolError::UnknownAttribute(name.to_string()))?;
    let result = f(slot);
    self.memo.clear();
    Ok(result)
  }

  pub fn get(&self, name: &str) -> Option<&Value> {
    self.fields.get(name)
  }

  /// Like [`get`](Self::get), but an undeclared name is an error.
  pub fn attr(&self, name: &str) -> Result<&Value, ToolError> {
    self
      .fields
      .get(name)
      .ok_or_else(|| ToolError::UnknownAttribute(name.to_string()))
  }

  pub fn str_attr(&self, name: &str) -> Result<&str, ToolError> {
    let value = self.attr(name)?;
    value.as_str().ok_or_else(|| wrong_type(name, "string", value))
  }

  pub fn bool_attr(&self, name: &str) -> Result<bool, ToolError> {
    let value = self.attr(name)?;
    value.as_bool().ok_or_else(|| wrong_type(name, "bool", value))
  }

  pub fn list_attr(&self, name: &str) -> Result<&[Value], ToolError> {
    let value = self.attr(name)?;
    value.as_list().ok_or_else(|| wrong_type(name, "list", value))
  }

  pub fn map_attr(&self, name: &str) -> Result<&BTreeMap<Value, Value>, ToolError> {
    let value = self.attr(name)?;
    value.as_map().ok_or_else(|| wrong_type(name, "map", value))
  }

  pub fn has(&self, name: &str) -> bool {
    self.fields.contains_key(name)
  }

  pub fn field_names(&self) -> impl Iterator<Item = &str> {
    self.fields.keys().map(String::as_str)
  }

  /// Return the cached result for `key`, computing and storing it on a miss.
  ///
  /// The cache lock is released while `compute` runs, so a memoised method may
  /// call other memoised methods on the same tool.
  pub fn memoise<T, F>(&self, key: MemoKey, compute: F) -> T
  where
    T: Any + Clone + Send + Sync,
    F: FnOnce() -> T,
  {
    if let Some(hit) = self.memo.get::<T>(&key) {
      trace!(method = key.method(), "memo hit");
      return hit;
    }
    let value = compute();
    self.memo.insert(key, value.clone());
    value
  }

  /// Fallible [`memoise`](Self::memoise). Errors are returned but not cached.
  pub fn try_memoise<T, E, F>(&self, key: MemoKey, compute: F) -> Result<T, E>
  where
    T: Any + Clone + Send + Sync,
    F: FnOnce() -> Result<T, E>,
  {
    if let Some(hit) = self.memo.get::<T>(&key) {
      trace!(method = key.method(), "memo hit");
      return Ok(hit);
    }
    let value = compute()?;
    self.memo.insert(key, value.clone());
    Ok(value)
  }

  pub fn clear_cache(&self) {
    self.memo.clear();
  }

  /// Number of memoised results currently held.
  pub fn cached_len(&self) -> usize {
    self.memo.len()
  }

  /// Overwrite this tool's fields with copies of `other`'s.
  ///
  /// Containers are copied; shared objects keep their identity. The cache is
  /// not carried over.
  pub(crate) fn copy_fields_from(&mut self, other: &Tool) {
    for (name, value) in &other.fields {
      self.fields.insert(name.clone(), value.clone());
    }
    self.memo.clear();
  }
}

fn wrong_type(name: &str, expected: &'static str, found: &Value) -> ToolError {
  ToolError::WrongType {
    name: name.to_string(),
    expected,
    found: found.kind(),
  }
}

/// Keeps a [`Tool`] open for declarations until dropped.
pub struct Construct<'a> {
  tool: &'a mut Tool,
}

impl Construct<'_> {
  /// Open the tool again for a base constructor.
  pub fn open(&mut self) -> Construct<'_> {
    self.tool.enter()
  }

  /// Declare an attribute with its initial value.
  pub fn declare(&mut self, name: &str, value: impl Into<Value>) -> &mut Self {
    self.tool.fields.insert(name.to_string(), value.into());
    self
  }
}

impl Deref for Construct<'_> {
  type Target = Tool;

  fn deref(&self) -> &Tool {
    self.tool
  }
}

impl DerefMut for Construct<'_> {
  fn deref_mut(&mut self) -> &mut Tool {
    self.tool
  }
}

impl Drop for Construct<'_> {
  fn drop(&mut self) {
    self.tool.open -= 1;
  }
}

/// Access to the [`Tool`] embedded in a build action.
pub trait AsTool {
  fn tool(&self) -> &Tool;
  fn tool_mut(&mut self) -> &mut Tool;
}

impl AsTool for Tool {
  fn tool(&self) -> &Tool {
    self
  }

  fn tool_mut(&mut self) -> &mut Tool {
    self
  }
}

/// Produce an independent derivative of a build action.
///
/// The copy is built by the type's own constructor, then receives a selective
/// deep copy of the source's attribute values: lists, sets and maps are
/// copied recursively, everything else is shared.
pub trait CloneTool: AsTool + Sized {
  /// A freshly constructed instance bound to the same collaborators.
  fn construct_default(&self) -> Self;

  fn clone_tool(&self) -> Self {
    let mut copy = self.construct_default();
    copy.tool_mut().copy_fields_from(self.tool());
    copy
  }
}

impl CloneTool for Tool {
  fn construct_default(&self) -> Self {
    Tool::new()
  }
}
