use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::Command;

use serde_json::json;
use tracing::info;

use crate::configuration::Configuration;
use crate::path::expand_vars;
use crate::script::{RunOutput, Script, ScriptError, ScriptTool};
use crate::target::Source;
use crate::tool::{AsTool, CloneTool, MemoKey, Tool, Value};

use super::process::check_output;

/// Runs shell commands as incremental build steps.
///
/// Attributes:
/// - `shell` (string or none): shell to run commands with. `none` uses
///   `/bin/sh` on Unix and PowerShell on Windows.
/// - `env` (map): variables set for the command. Values may reference other
///   entries as `$NAME` or `${NAME}`; the same references in the command
///   itself are expanded before it runs.
pub struct ShellTool {
  tool: Tool,
  configuration: Configuration,
}

impl ShellTool {
  pub fn new(configuration: Configuration) -> Self {
    let tool = Tool::build(|c| {
      c.declare("shell", Value::None);
      c.declare("env", Value::Map(BTreeMap::new()));
    });
    ShellTool { tool, configuration }
  }

  /// Set an environment variable for subsequent commands.
  pub fn set_env(&mut self, name: &str, value: &str) -> Result<(), ScriptError> {
    self.tool.update("env", |env| {
      if let Some(map) = env.as_map_mut() {
        map.insert(Value::from(name), Value::from(value));
      }
    })?;
    Ok(())
  }

  /// The `env` attribute with references between entries expanded.
  pub fn environment(&self) -> Result<BTreeMap<String, String>, ScriptError> {
    self.tool.try_memoise(MemoKey::new("environment"), || {
      let raw: BTreeMap<String, String> = self
        .tool
        .map_attr("env")?
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
      Ok(raw.iter().map(|(k, v)| (k.clone(), expand_vars(v, &raw))).collect())
    })
  }

  /// `cmd` with environment references expanded.
  pub fn command_line(&self, cmd: &str) -> Result<String, ScriptError> {
    self.tool.try_memoise(MemoKey::new("command_line").arg(cmd), || {
      Ok(expand_vars(cmd, &self.environment()?))
    })
  }

  /// Run `cmd` in the calling script's directory, once `sources` are
  /// available and only when `targets` are out of date.
  pub fn command(
    &self,
    cx: &Script,
    cmd: &str,
    targets: Option<Vec<String>>,
    sources: &[Source],
  ) -> Result<RunOutput, ScriptError> {
    let command = self.command_line(cmd)?;
    let env = self.environment()?;
    let shell = match self.tool.attr("shell")? {
      Value::None => None,
      other => Some(other.to_string()),
    };
    let cwd = cx.dir().to_path_buf();

    let args = json!({ "command": command, "shell": shell, "env": env });
    let func = move || run_shell(&command, shell.as_deref(), &env, cwd);
    ScriptTool::new(self.configuration.clone()).run(cx, func, args, targets, sources)
  }
}

fn run_shell(cmd: &str, shell: Option<&str>, env: &BTreeMap<String, String>, cwd: PathBuf) -> anyhow::Result<()> {
  let (shell_cmd, shell_args) = get_shell(shell);
  info!(cmd = %cmd, "executing command");

  let mut command = Command::new(&shell_cmd);
  command.args(&shell_args).arg(cmd).current_dir(&cwd).envs(env);
  check_output(&mut command, cmd)
}

/// Get the shell command and the arguments that pass it a command string.
fn get_shell(override_shell: Option<&str>) -> (String, Vec<String>) {
  if let Some(shell) = override_shell {
    let args = if shell.contains("powershell") || shell.contains("pwsh") {
      vec!["-NoProfile".to_string(), "-Command".to_string()]
    } else if shell.contains("cmd") {
      vec!["/C".to_string()]
    } else {
      vec!["-c".to_string()]
    };
    return (shell.to_string(), args);
  }

  #[cfg(unix)]
  {
    ("/bin/sh".to_string(), vec!["-c".to_string()])
  }

  #[cfg(windows)]
  {
    (
      "powershell.exe".to_string(),
      vec![
        "-NoProfile".to_string(),
        "-ExecutionPolicy".to_string(),
        "Bypass".to_string(),
        "-Command".to_string(),
      ],
    )
  }
}

impl AsTool for ShellTool {
  fn tool(&self) -> &Tool {
    &self.tool
  }

  fn tool_mut(&mut self) -> &mut Tool {
    &mut self.tool
  }
}

impl CloneTool for ShellTool {
  fn construct_default(&self) -> Self {
    ShellTool::new(self.configuration.clone())
  }
}
