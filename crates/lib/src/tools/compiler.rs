//! A gcc/clang style C and C++ compiler.
//!
//! Every build step goes through [`ScriptTool::run`], with the full command
//! line as its build argument, so changing a flag rebuilds exactly the steps
//! whose command changed. Object files are compiled with `-MD`; the headers
//! the compiler reports are recorded as discovered inputs, so editing a
//! header rebuilds the objects that include it.

use std::fs;
use std::path::Path;
use std::process::Command;

use anyhow::Context;
use serde_json::json;
use tracing::info;

use super::filesys::first_target;
use super::process::check_output;
use super::types::CompilerError;
use crate::configuration::Configuration;
use crate::path::{base_name_without_extension, extension, force_extension, force_prefix_suffix, join};
use crate::platform::os::Os;
use crate::script::{Script, ScriptError, ScriptTool};
use crate::target::{FileTarget, Source, get_paths_and_tasks};
use crate::tool::{AsTool, CloneTool, MemoKey, Tool, ToolError, Value};
use crate::util::OneOrMany;

/// Source language of a translation unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
  C,
  Cpp,
}

impl Language {
  /// The name the compiler's `-x` option takes.
  pub fn as_str(&self) -> &'static str {
    match self {
      Language::C => "c",
      Language::Cpp => "c++",
    }
  }

  pub fn from_name(name: &str) -> Option<Self> {
    match name {
      "c" => Some(Language::C),
      "c++" | "cpp" => Some(Language::Cpp),
      _ => None,
    }
  }

  /// Guess from a source file's extension.
  pub fn from_source(path: &str) -> Option<Self> {
    match extension(path) {
      ".c" => Some(Language::C),
      ".cpp" | ".cc" | ".cxx" | ".c++" | ".C" => Some(Language::Cpp),
      _ => None,
    }
  }
}

/// Compiles, archives and links with a gcc/clang style toolchain.
///
/// Attributes:
/// - `cc` (string, default `cc`): compiler driver, also used to link.
/// - `ar` (string, default `ar`): archiver for static libraries.
/// - `language` (none, `c` or `c++`): overrides the guess from extensions.
/// - `optimisation` (`none`, `partial` or `full`).
/// - `debug_symbols`, `warnings_as_errors`, `position_independent` (bool).
/// - `warning_level` (none or 0-2): `-w`, `-Wall`, `-Wall -Wextra`.
/// - `defines`, `include_paths`, `forced_includes` (lists).
/// - `c_flags`, `cpp_flags` (lists): extra flags per language.
/// - `link_flags`, `library_paths`, `libraries` (lists): link inputs.
///   A library containing a path separator is passed as a file, others
///   become `-l` options.
/// - `object_suffix`, `library_prefix`, `library_suffix`, `module_prefix`,
///   `module_suffix`, `program_suffix` (strings): output naming, with host
///   defaults.
pub struct CompilerTool {
  tool: Tool,
  configuration: Configuration,
}

impl CompilerTool {
  pub fn new(configuration: Configuration) -> Self {
    let os = Os::current();
    let module_suffix = match os {
      Os::Windows => ".dll",
      Os::MacOs => ".dylib",
      _ => ".so",
    };
    let tool = Tool::build(|c| {
      c.declare("cc", "cc");
      c.declare("ar", "ar");
      c.declare("language", Value::None);
      c.declare("optimisation", "none");
      c.declare("debug_symbols", false);
      c.declare("warning_level", Value::None);
      c.declare("warnings_as_errors", false);
      c.declare("position_independent", false);
      for list in [
        "defines",
        "include_paths",
        "forced_includes",
        "c_flags",
        "cpp_flags",
        "link_flags",
        "library_paths",
        "libraries",
      ] {
        c.declare(list, Value::List(Vec::new()));
      }
      c.declare("object_suffix", ".o");
      c.declare("library_prefix", "lib");
      c.declare("library_suffix", ".a");
      c.declare("module_prefix", if os == Os::Windows { "" } else { "lib" });
      c.declare("module_suffix", module_suffix);
      c.declare("program_suffix", os.exe_suffix());
    });
    CompilerTool { tool, configuration }
  }

  /// Append `value` to the list attribute `name`.
  pub fn push(&mut self, name: &str, value: &str) -> Result<(), ScriptError> {
    let pushed = self.tool.update(name, |list| {
      list.as_list_mut().map(|items| items.push(Value::from(value))).is_some()
    })?;
    if !pushed {
      return Err(ToolError::WrongType {
        name: name.to_string(),
        expected: "list",
        found: self.tool.attr(name)?.kind(),
      }
      .into());
    }
    Ok(())
  }

  /// The language `source` is compiled as.
  pub fn language_for(&self, source: &str) -> Result<Language, ScriptError> {
    let language = match self.tool.attr("language")? {
      Value::None => Language::from_source(source),
      Value::Str(name) => Some(Language::from_name(name).ok_or_else(|| invalid("language", name))?),
      other => return Err(invalid("language", &other.to_string()).into()),
    };
    language.ok_or_else(|| CompilerError::UnknownLanguage(source.to_string()).into())
  }

  /// Compiler invocation up to, but not including, the per-object options.
  pub fn compile_args(&self, language: Language) -> Result<Vec<String>, ScriptError> {
    self
      .tool
      .try_memoise(MemoKey::new("compile_args").arg(language.as_str()), || {
        let tool = &self.tool;
        let mut args = vec![
          tool.str_attr("cc")?.to_string(),
          "-c".to_string(),
          "-x".to_string(),
          language.as_str().to_string(),
        ];
        args.extend(optimisation_flags(tool.str_attr("optimisation")?)?);
        if tool.bool_attr("debug_symbols")? {
          args.push("-g".to_string());
        }
        args.extend(warning_flags(tool.attr("warning_level")?)?);
        if tool.bool_attr("warnings_as_errors")? {
          args.push("-Werror".to_string());
        }
        if tool.bool_attr("position_independent")? {
          args.push("-fPIC".to_string());
        }
        args.extend(strings(tool, "defines")?.into_iter().map(|d| format!("-D{}", d)));
        args.extend(strings(tool, "include_paths")?.into_iter().map(|p| format!("-I{}", p)));
        for header in strings(tool, "forced_includes")? {
          args.push("-include".to_string());
          args.push(header);
        }
        args.extend(strings(
          tool,
          match language {
            Language::C => "c_flags",
            Language::Cpp => "cpp_flags",
          },
        )?);
        Ok(args)
      })
  }

  /// Archiver invocation for a static library, before the output path.
  pub fn library_args(&self) -> Result<Vec<String>, ScriptError> {
    self.tool.try_memoise(MemoKey::new("library_args"), || {
      Ok(vec![self.tool.str_attr("ar")?.to_string(), "rcs".to_string()])
    })
  }

  /// Link invocation before the output and input paths. `shared` links a
  /// loadable module instead of a program.
  pub fn link_args(&self, shared: bool) -> Result<Vec<String>, ScriptError> {
    self.tool.try_memoise(MemoKey::new("link_args").arg(shared), || {
      let tool = &self.tool;
      let mut args = vec![tool.str_attr("cc")?.to_string()];
      if shared {
        args.push("-shared".to_string());
      }
      if tool.str_attr("optimisation")? == "full" {
        args.push("-flto".to_string());
      }
      if tool.bool_attr("debug_symbols")? {
        args.push("-g".to_string());
      }
      args.extend(strings(tool, "link_flags")?);
      args.extend(strings(tool, "library_paths")?.into_iter().map(|p| format!("-L{}", p)));
      Ok(args)
    })
  }

  /// Library options placed after the linked objects.
  fn library_inputs(&self) -> Result<Vec<String>, ScriptError> {
    Ok(
      strings(&self.tool, "libraries")?
        .into_iter()
        .map(|lib| if lib.contains(['/', '\\']) { lib } else { format!("-l{}", lib) })
        .collect(),
    )
  }

  /// Compile `source` into the object file `target`. The object suffix is
  /// added when missing.
  pub fn object(&self, cx: &Script, target: &str, source: impl Into<Source>) -> Result<FileTarget, ScriptError> {
    let source = source.into();
    let language = self.language_for(source.path())?;
    let target = force_extension(target, self.tool.str_attr("object_suffix")?);
    let depfile = format!("{}.d", target);

    let mut command = self.compile_args(language)?;
    command.extend([
      "-MD".to_string(),
      "-MF".to_string(),
      depfile.clone(),
      "-o".to_string(),
      target.clone(),
      source.path().to_string(),
    ]);

    let cwd = self.configuration.base_dir().to_path_buf();
    let args = json!({ "action": "compile", "command": command });
    let output = cwd.join(&target);
    let func = move || -> anyhow::Result<Vec<String>> {
      spawn(&command, &cwd, &output)?;
      let depfile = cwd.join(&depfile);
      let text = fs::read_to_string(&depfile).with_context(|| format!("failed to read {}", depfile.display()))?;
      Ok(parse_depfile(&text))
    };

    let built = ScriptTool::new(self.configuration.clone()).run_scanned(
      cx,
      func,
      args,
      Some(vec![target.clone()]),
      std::slice::from_ref(&source),
    )?;
    Ok(first_target(built.into_targets(), &target))
  }

  /// Compile each of `sources` into `object_dir`, naming each object after
  /// its source.
  pub fn objects(&self, cx: &Script, object_dir: &str, sources: &[Source]) -> Result<Vec<FileTarget>, ScriptError> {
    let suffix = self.tool.str_attr("object_suffix")?.to_string();
    sources
      .iter()
      .map(|source| {
        let name = format!("{}{}", base_name_without_extension(source.path()), suffix);
        let target = join([OneOrMany::One(object_dir.to_string()), OneOrMany::One(name)])
          .into_vec()
          .pop()
          .unwrap_or_default();
        self.object(cx, &target, source.clone())
      })
      .collect()
  }

  /// Archive `sources` into a static library. The library prefix and suffix
  /// are added unless `target` already has the suffix.
  pub fn library(&self, cx: &Script, target: &str, sources: &[Source]) -> Result<FileTarget, ScriptError> {
    let target = force_prefix_suffix(
      target,
      self.tool.str_attr("library_prefix")?,
      self.tool.str_attr("library_suffix")?,
    );
    let (inputs, _) = get_paths_and_tasks(sources);
    let mut command = self.library_args()?;
    command.push(target.clone());
    command.extend(inputs);
    self.step(cx, "archive", command, &target, sources)
  }

  /// Link `sources` into an executable. The program suffix is added when
  /// missing.
  pub fn program(&self, cx: &Script, target: &str, sources: &[Source]) -> Result<FileTarget, ScriptError> {
    let target = force_extension(target, self.tool.str_attr("program_suffix")?);
    let command = self.link_command(false, &target, sources)?;
    self.step(cx, "link", command, &target, sources)
  }

  /// Link `sources` into a loadable module (a shared library).
  pub fn module(&self, cx: &Script, target: &str, sources: &[Source]) -> Result<FileTarget, ScriptError> {
    let target = force_prefix_suffix(
      target,
      self.tool.str_attr("module_prefix")?,
      self.tool.str_attr("module_suffix")?,
    );
    let command = self.link_command(true, &target, sources)?;
    self.step(cx, "link_module", command, &target, sources)
  }

  fn link_command(&self, shared: bool, target: &str, sources: &[Source]) -> Result<Vec<String>, ScriptError> {
    let (inputs, _) = get_paths_and_tasks(sources);
    let mut command = self.link_args(shared)?;
    command.push("-o".to_string());
    command.push(target.to_string());
    command.extend(inputs);
    command.extend(self.library_inputs()?);
    Ok(command)
  }

  /// Run `command` to produce `target` once `sources` are built.
  fn step(
    &self,
    cx: &Script,
    action: &'static str,
    command: Vec<String>,
    target: &str,
    sources: &[Source],
  ) -> Result<FileTarget, ScriptError> {
    let args = json!({ "action": action, "command": command });
    let cwd = self.configuration.base_dir().to_path_buf();
    let output = cwd.join(target);
    let func = move || -> anyhow::Result<()> {
      // ar adds to an existing archive rather than replacing it
      if action == "archive" && output.exists() {
        fs::remove_file(&output).with_context(|| format!("failed to remove {}", output.display()))?;
      }
      spawn(&command, &cwd, &output)
    };
    let built =
      ScriptTool::new(self.configuration.clone()).run(cx, func, args, Some(vec![target.to_string()]), sources)?;
    Ok(first_target(built.into_targets(), target))
  }
}

/// Parse the make rule a compiler writes with `-MD`, returning the
/// prerequisites. Escaped spaces are kept inside names.
pub fn parse_depfile(text: &str) -> Vec<String> {
  let joined = text.replace("\\\r\n", " ").replace("\\\n", " ");
  let mut deps = Vec::new();
  for rule in joined.lines() {
    let Some(colon) = rule.find(": ").or_else(|| rule.strip_suffix(':').map(str::len)) else {
      continue;
    };
    let mut current = String::new();
    let mut chars = rule[colon + 1..].chars().peekable();
    while let Some(c) = chars.next() {
      match c {
        '\\' if chars.peek() == Some(&' ') => {
          current.push(' ');
          chars.next();
        }
        c if c.is_whitespace() => {
          if !current.is_empty() {
            deps.push(std::mem::take(&mut current));
          }
        }
        c => current.push(c),
      }
    }
    if !current.is_empty() {
      deps.push(current);
    }
  }
  deps
}

fn spawn(command: &[String], cwd: &Path, output: &Path) -> anyhow::Result<()> {
  let Some((program, args)) = command.split_first() else {
    anyhow::bail!("empty command for {}", output.display());
  };
  if let Some(parent) = output.parent() {
    fs::create_dir_all(parent).with_context(|| format!("failed to create {}", parent.display()))?;
  }
  info!(output = %output.display(), "{}", command.join(" "));
  let mut process = Command::new(program);
  process.args(args).current_dir(cwd);
  check_output(&mut process, &command.join(" "))
}

fn strings(tool: &Tool, name: &str) -> Result<Vec<String>, ToolError> {
  Ok(tool.list_attr(name)?.iter().map(Value::to_string).collect())
}

fn invalid(name: &str, value: &str) -> CompilerError {
  CompilerError::InvalidSetting {
    name: name.to_string(),
    value: value.to_string(),
  }
}

fn optimisation_flags(level: &str) -> Result<Vec<String>, CompilerError> {
  let flags: &[&str] = match level {
    "none" => &["-O0"],
    "partial" => &["-O2"],
    "full" => &["-O3", "-flto"],
    other => return Err(invalid("optimisation", other)),
  };
  Ok(flags.iter().map(|f| f.to_string()).collect())
}

fn warning_flags(level: &Value) -> Result<Vec<String>, CompilerError> {
  let flags: &[&str] = match level {
    Value::None => &[],
    Value::Int(0) => &["-w"],
    Value::Int(1) => &["-Wall"],
    Value::Int(2) => &["-Wall", "-Wextra"],
    other => return Err(invalid("warning_level", &other.to_string())),
  };
  Ok(flags.iter().map(|f| f.to_string()).collect())
}

impl AsTool for CompilerTool {
  fn tool(&self) -> &Tool {
    &self.tool
  }

  fn tool_mut(&mut self) -> &mut Tool {
    &mut self.tool
  }
}

impl CloneTool for CompilerTool {
  fn construct_default(&self) -> Self {
    CompilerTool::new(self.configuration.clone())
  }
}
