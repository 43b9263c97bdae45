use std::path::Path;

use super::{Script, ScriptError, ScriptProxy, ScriptResult};
use crate::configuration::Configuration;
use crate::engine::Engine;
use crate::tool::{AsTool, CloneTool, Tool, Value};
use crate::util::OneOrMany;
use crate::variant::{Keywords, Variant};

/// How [`ScriptTool::get`] picks the configuration and variant a script runs
/// under.
#[derive(Debug, Clone, Default)]
pub struct GetOptions {
  pub keywords: Keywords,
  /// Run in the caller's configuration, narrowing the caller's variant.
  /// Defaults to true when neither `config_script` nor
  /// `config_script_name` is set.
  pub use_context: Option<bool>,
  /// Config script to run the script under, relative to the current
  /// configuration.
  pub config_script: Option<String>,
  /// Name of the config script to search for upward from the script.
  pub config_script_name: Option<String>,
}

impl GetOptions {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn keyword(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
    self.keywords.insert(name.into(), value.into());
    self
  }

  pub fn keywords(mut self, keywords: Keywords) -> Self {
    self.keywords = keywords;
    self
  }

  pub fn use_context(mut self, use_context: bool) -> Self {
    self.use_context = Some(use_context);
    self
  }

  pub fn config_script(mut self, path: impl Into<String>) -> Self {
    self.config_script = Some(path.into());
    self
  }

  pub fn config_script_name(mut self, name: impl Into<String>) -> Self {
    self.config_script_name = Some(name.into());
    self
  }

  fn resolves_in_context(&self) -> bool {
    self
      .use_context
      .unwrap_or(self.config_script.is_none() && self.config_script_name.is_none())
  }
}

/// Script orchestration for build descriptions.
///
/// Every operation takes the calling script's context explicitly; the tool
/// itself only remembers the configuration it was created for.
pub struct ScriptTool {
  tool: Tool,
  configuration: Configuration,
}

impl ScriptTool {
  pub fn new(configuration: Configuration) -> Self {
    ScriptTool {
      tool: Tool::new(),
      configuration,
    }
  }

  pub fn configuration(&self) -> &Configuration {
    &self.configuration
  }

  pub fn engine(&self) -> Result<Engine, ScriptError> {
    self.configuration.engine()
  }

  pub fn path<'a>(&self, cx: &'a Script) -> &'a Path {
    cx.path()
  }

  pub fn dir<'a>(&self, cx: &'a Script) -> &'a Path {
    cx.dir()
  }

  pub fn variant<'a>(&self, cx: &'a Script) -> &'a Variant {
    cx.variant()
  }

  /// Publish a result other scripts can import with
  /// [`get_result`](Self::get_result).
  pub fn set_result(&self, cx: &Script, name: impl Into<String>, value: impl Into<Value>) {
    cx.set_result(name, value);
  }

  /// A placeholder for the result `name` of `script`. Nothing runs until the
  /// placeholder is resolved.
  pub fn get_result(&self, cx: &Script, script: &str, name: impl Into<String>) -> Result<ScriptResult, ScriptError> {
    Ok(self.get(cx, script, GetOptions::new())?.get_result(name))
  }

  /// A lazy handle to `script` run under the configuration and variant
  /// `options` select.
  ///
  /// The choice between the caller's configuration and an independent one is
  /// made now. Variant lookup and scheduling happen when the handle is
  /// executed; the caller's task then completes only after the script's.
  pub fn get(&self, cx: &Script, script: &str, options: GetOptions) -> Result<ScriptProxy, ScriptError> {
    if script.is_empty() {
      return Err(ScriptError::InvalidScriptPath(script.to_string()));
    }
    let configuration = self.configuration.clone();
    let script = script.to_string();
    let caller = cx.clone();

    if options.resolves_in_context() {
      let base = cx.variant().clone();
      let keywords = options.keywords;
      return Ok(ScriptProxy::new(move || {
        let variant = configuration.find_variant(&keywords, Some(&base))?;
        let started = configuration.execute(&script, &variant)?;
        Ok(hold_caller(&caller, started))
      }));
    }

    Ok(ScriptProxy::new(move || {
      let engine = configuration.engine()?;
      let path = configuration.abspath(&script);
      let target = match &options.config_script {
        Some(config_script) => engine.get_configuration(configuration.abspath(config_script))?,
        None => {
          let name = options
            .config_script_name
            .clone()
            .unwrap_or_else(|| engine.config().config_script_name.clone());
          engine.find_configuration(&path, &name)?
        }
      };
      let variant = target.find_variant(&options.keywords, None)?;
      let started = target.execute(&path, &variant)?;
      Ok(hold_caller(&caller, started))
    }))
  }

  /// Prefix path(s) with the calling script's directory.
  pub fn cwd(&self, cx: &Script, paths: impl Into<OneOrMany<String>>) -> OneOrMany<String> {
    cx.cwd(paths)
  }

  /// Run other scripts' declarations inside the calling script.
  pub fn include(&self, cx: &Script, scripts: impl Into<OneOrMany<String>>) -> Result<(), ScriptError> {
    cx.include(scripts)
  }

  /// Start other scripts in the caller's configuration, with the caller's
  /// variant narrowed by `keywords`.
  ///
  /// The caller's task completes only after the started scripts have.
  pub fn execute(
    &self,
    cx: &Script,
    scripts: impl Into<OneOrMany<String>>,
    keywords: &Keywords,
  ) -> Result<OneOrMany<Script>, ScriptError> {
    let scripts = scripts.into();
    if let Some(bad) = scripts.clone().into_vec().into_iter().find(String::is_empty) {
      return Err(ScriptError::InvalidScriptPath(bad));
    }

    let configuration = cx.configuration();
    let variant = configuration.find_variant(keywords, Some(cx.variant()))?;
    scripts.try_map(|path| {
      let script = configuration.execute(&path, &variant)?;
      Ok(hold_caller(cx, script))
    })
  }
}

/// Keep `caller` from completing before `started` has.
fn hold_caller(caller: &Script, started: Script) -> Script {
  if let Some(task) = started.task() {
    caller.complete_after(task);
  }
  started
}

impl AsTool for ScriptTool {
  fn tool(&self) -> &Tool {
    &self.tool
  }

  fn tool_mut(&mut self) -> &mut Tool {
    &mut self.tool
  }
}

impl CloneTool for ScriptTool {
  fn construct_default(&self) -> Self {
    ScriptTool::new(self.configuration.clone())
  }
}
