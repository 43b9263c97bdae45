use super::Variant;
use crate::script::Script;
use crate::tool::{AsTool, Construct, Tool, ToolError, Value};

/// Read-only view of the active script's variant keywords.
///
/// Declared fields win. Any other name is looked up as a keyword of the
/// variant the given script runs under.
#[derive(Debug, Default)]
pub struct VariantTool {
  tool: Tool,
}

impl VariantTool {
  pub fn new() -> Self {
    Self::default()
  }

  /// A projection with declared fields of its own, which shadow keywords.
  pub fn with_fields(construct: impl FnOnce(&mut Construct<'_>)) -> Self {
    VariantTool {
      tool: Tool::build(construct),
    }
  }

  /// Resolve `name` against the variant `script` runs under.
  pub fn get(&self, script: &Script, name: &str) -> Result<Value, ToolError> {
    self.lookup(script.variant(), name)
  }

  pub fn lookup(&self, variant: &Variant, name: &str) -> Result<Value, ToolError> {
    if let Some(value) = self.tool.get(name) {
      return Ok(value.clone());
    }
    variant
      .keyword(name)
      .map(Value::from)
      .ok_or_else(|| ToolError::UnknownAttribute(name.to_string()))
  }
}

impl AsTool for VariantTool {
  fn tool(&self) -> &Tool {
    &self.tool
  }

  fn tool_mut(&mut self) -> &mut Tool {
    &mut self.tool
  }
}
