use std::fs;
use std::path::Path;

use anyhow::Context;
use serde_json::json;
use tracing::info;

use crate::configuration::Configuration;
use crate::script::{Script, ScriptError, ScriptTool};
use crate::target::{FileTarget, Source};
use crate::tool::{AsTool, CloneTool, Tool};

/// Copies and writes files as incremental build steps.
///
/// Attributes:
/// - `create_parent_dirs` (bool, default true): create missing directories
///   above a target before writing it.
pub struct FileSysTool {
  tool: Tool,
  configuration: Configuration,
}

impl FileSysTool {
  pub fn new(configuration: Configuration) -> Self {
    let tool = Tool::build(|c| {
      c.declare("create_parent_dirs", true);
    });
    FileSysTool { tool, configuration }
  }

  /// Copy `source` to `target` once the source is available.
  pub fn copy(&self, cx: &Script, source: impl Into<Source>, target: &str) -> Result<FileTarget, ScriptError> {
    let source = source.into();
    let create_dirs = self.tool.bool_attr("create_parent_dirs")?;
    let from = self.configuration.abspath(source.path());
    let to = self.configuration.abspath(target);

    let func = move || -> anyhow::Result<()> {
      prepare_parent(&to, create_dirs)?;
      info!(from = %from.display(), to = %to.display(), "copying file");
      fs::copy(&from, &to).with_context(|| format!("failed to copy {} to {}", from.display(), to.display()))?;
      Ok(())
    };

    let args = json!({ "action": "copy", "create_parent_dirs": create_dirs });
    let output = ScriptTool::new(self.configuration.clone()).run(
      cx,
      func,
      args,
      Some(vec![target.to_string()]),
      std::slice::from_ref(&source),
    )?;
    Ok(first_target(output.into_targets(), target))
  }

  /// Write `contents` to `target`. Changing the contents rebuilds the target.
  pub fn write(&self, cx: &Script, target: &str, contents: impl Into<String>) -> Result<FileTarget, ScriptError> {
    let contents = contents.into();
    let create_dirs = self.tool.bool_attr("create_parent_dirs")?;
    let to = self.configuration.abspath(target);

    let args = json!({ "action": "write", "contents": contents, "create_parent_dirs": create_dirs });
    let func = move || -> anyhow::Result<()> {
      prepare_parent(&to, create_dirs)?;
      info!(to = %to.display(), bytes = contents.len(), "writing file");
      fs::write(&to, contents.as_bytes()).with_context(|| format!("failed to write {}", to.display()))?;
      Ok(())
    };

    let output = ScriptTool::new(self.configuration.clone()).run(cx, func, args, Some(vec![target.to_string()]), &[])?;
    Ok(first_target(output.into_targets(), target))
  }
}

fn prepare_parent(path: &Path, create: bool) -> anyhow::Result<()> {
  if let Some(parent) = path.parent().filter(|_| create) {
    fs::create_dir_all(parent).with_context(|| format!("failed to create {}", parent.display()))?;
  }
  Ok(())
}

pub(super) fn first_target(targets: Vec<FileTarget>, path: &str) -> FileTarget {
  targets
    .into_iter()
    .next()
    .unwrap_or_else(|| FileTarget::existing(path))
}

impl AsTool for FileSysTool {
  fn tool(&self) -> &Tool {
    &self.tool
  }

  fn tool_mut(&mut self) -> &mut Tool {
    &mut self.tool
  }
}

impl CloneTool for FileSysTool {
  fn construct_default(&self) -> Self {
    FileSysTool::new(self.configuration.clone())
  }
}
