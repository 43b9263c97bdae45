//! The `cake` global table.
//!
//! Registered fresh for every script execution and bound to that execution's
//! [`Script`]:
//! - `cake.path`, `cake.dir` - the script's absolute path and directory
//! - `cake.variant` - keyword lookup on the script's variant
//! - `cake.host` - `os`, `arch` and `platform` of the machine
//! - `cake.paths` - path helpers
//! - `cake.cwd(paths)` - prefix path(s) with the script's directory
//! - `cake.include(scripts)` - run other scripts' declarations here
//! - `cake.execute(scripts, keywords)` - start scripts in this configuration
//! - `cake.get(script, opts)` / `cake.get_result(script, name)` - lazy handles
//! - `cake.set_result(name, value)` - publish a result
//! - `cake.add_variant(keywords)` - register a variant (config scripts)
//! - `cake.copy`, `cake.write`, `cake.shell`, `cake.compile` - incremental
//!   build steps

use std::rc::Rc;

use mlua::prelude::*;

use super::convert::{
  keywords_from_lua, lua_to_value, script_path_from_lua, script_paths_from_lua, source_from_lua, sources_from_lua,
  strings_from_lua, strings_to_lua,
};
use super::handles::{LuaScriptProxy, LuaScriptResult, LuaTarget, LuaVariant};
use super::helpers;
use crate::platform::Host;
use crate::script::{GetOptions, Script, ScriptTool};
use crate::tool::AsTool;
use crate::target::Source;
use crate::tools::{CompilerTool, FileSysTool, ShellTool};
use crate::variant::Variant;

/// Register the `cake` global for `script`.
pub fn register_globals(lua: &Lua, script: Script) -> LuaResult<()> {
  let cake = lua.create_table()?;

  cake.set("path", script.path().to_string_lossy().into_owned())?;
  cake.set("dir", script.dir().to_string_lossy().into_owned())?;
  cake.set("variant", LuaVariant::new(script.variant().clone()))?;

  let host = lua.create_table()?;
  for (name, value) in Host::current().keywords() {
    host.set(name, value)?;
  }
  cake.set("host", host)?;

  cake.set("paths", helpers::path::create_path_helpers(lua)?)?;

  let cx = Rc::new(script);
  let tool = Rc::new(ScriptTool::new(cx.configuration().clone()));

  register_script_functions(lua, &cake, &cx, &tool)?;
  register_build_steps(lua, &cake, &cx)?;

  lua.globals().set("cake", cake)?;
  Ok(())
}

fn register_script_functions(lua: &Lua, cake: &LuaTable, cx: &Rc<Script>, tool: &Rc<ScriptTool>) -> LuaResult<()> {
  let (c, t) = (cx.clone(), tool.clone());
  cake.set(
    "cwd",
    lua.create_function(move |lua, paths: LuaValue| strings_to_lua(lua, t.cwd(&c, strings_from_lua(paths)?)))?,
  )?;

  let (c, t) = (cx.clone(), tool.clone());
  cake.set(
    "include",
    lua.create_function(move |_, scripts: LuaValue| {
      t.include(&c, script_paths_from_lua(scripts)?).map_err(LuaError::external)
    })?,
  )?;

  // cake.execute(scripts, keywords) - returns the absolute path(s) started
  let (c, t) = (cx.clone(), tool.clone());
  cake.set(
    "execute",
    lua.create_function(move |lua, (scripts, keywords): (LuaValue, Option<LuaTable>)| {
      let keywords = keywords_from_lua(keywords)?;
      let started = t
        .execute(&c, script_paths_from_lua(scripts)?, &keywords)
        .map_err(LuaError::external)?;
      strings_to_lua(lua, started.map(|s| s.path().to_string_lossy().into_owned()))
    })?,
  )?;

  let (c, t) = (cx.clone(), tool.clone());
  cake.set(
    "get",
    lua.create_function(move |_, (script, opts): (LuaValue, Option<LuaTable>)| {
      let script = script_path_from_lua(script)?;
      let options = get_options_from_lua(opts)?;
      let proxy = t.get(&c, &script, options).map_err(LuaError::external)?;
      Ok(LuaScriptProxy(proxy))
    })?,
  )?;

  let (c, t) = (cx.clone(), tool.clone());
  cake.set(
    "get_result",
    lua.create_function(move |_, (script, name): (LuaValue, String)| {
      let script = script_path_from_lua(script)?;
      let result = t.get_result(&c, &script, name).map_err(LuaError::external)?;
      Ok(LuaScriptResult(result))
    })?,
  )?;

  let (c, t) = (cx.clone(), tool.clone());
  cake.set(
    "set_result",
    lua.create_function(move |_, (name, value): (String, LuaValue)| {
      t.set_result(&c, name, lua_to_value(value)?);
      Ok(())
    })?,
  )?;

  let c = cx.clone();
  cake.set(
    "add_variant",
    lua.create_function(move |_, keywords: LuaTable| {
      let variant = Variant::from_keywords(keywords_from_lua(Some(keywords))?);
      c.configuration().add_variant(variant);
      Ok(())
    })?,
  )?;

  Ok(())
}

fn register_build_steps(lua: &Lua, cake: &LuaTable, cx: &Rc<Script>) -> LuaResult<()> {
  let c = cx.clone();
  cake.set(
    "copy",
    lua.create_function(move |_, (source, target): (LuaValue, String)| {
      let files = FileSysTool::new(c.configuration().clone());
      let target = files
        .copy(&c, source_from_lua(source)?, &target)
        .map_err(LuaError::external)?;
      Ok(LuaTarget(target))
    })?,
  )?;

  let c = cx.clone();
  cake.set(
    "write",
    lua.create_function(move |_, (target, contents): (String, String)| {
      let files = FileSysTool::new(c.configuration().clone());
      let target = files.write(&c, &target, contents).map_err(LuaError::external)?;
      Ok(LuaTarget(target))
    })?,
  )?;

  // cake.shell{ command, targets?, sources?, env?, shell? } - returns the targets
  let c = cx.clone();
  cake.set(
    "shell",
    lua.create_function(move |lua, opts: LuaTable| {
      let command: String = opts.get("command")?;
      let targets = match opts.get::<LuaValue>("targets")? {
        LuaValue::Nil => None,
        value => Some(strings_from_lua(value)?.into_vec()),
      };
      let sources = sources_from_lua(opts.get("sources")?)?;

      let mut shell = ShellTool::new(c.configuration().clone());
      if let Some(name) = opts.get::<Option<String>>("shell")? {
        shell.tool_mut().set("shell", name).map_err(LuaError::external)?;
      }
      if let Some(env) = opts.get::<Option<LuaTable>>("env")? {
        for pair in env.pairs::<String, String>() {
          let (name, value) = pair?;
          shell.set_env(&name, &value).map_err(LuaError::external)?;
        }
      }

      let output = shell
        .command(&c, &command, targets, &sources)
        .map_err(LuaError::external)?;
      lua.create_sequence_from(output.into_targets().into_iter().map(LuaTarget))
    })?,
  )?;

  // cake.compile{ sources, object_dir?, program | library | module?, <compiler attributes>.. }
  // returns the linked target, or the objects when nothing is linked
  let c = cx.clone();
  cake.set(
    "compile",
    lua.create_function(move |lua, opts: LuaTable| {
      let mut compiler = CompilerTool::new(c.configuration().clone());
      let mut sources = Vec::new();
      let mut object_dir = String::new();
      let mut link = None;
      for pair in opts.pairs::<String, LuaValue>() {
        let (key, value) = pair?;
        match key.as_str() {
          "sources" => sources = sources_from_lua(value)?,
          "object_dir" => object_dir = String::from_lua(value, lua)?,
          "program" | "library" | "module" => link = Some((key, String::from_lua(value, lua)?)),
          _ => compiler
            .tool_mut()
            .set(&key, lua_to_value(value)?)
            .map_err(LuaError::external)?,
        }
      }

      let objects = compiler
        .objects(&c, &object_dir, &sources)
        .map_err(LuaError::external)?;
      let Some((kind, target)) = link else {
        return Ok(LuaValue::Table(
          lua.create_sequence_from(objects.into_iter().map(LuaTarget))?,
        ));
      };
      let inputs: Vec<Source> = objects.into_iter().map(Source::from).collect();
      let built = match kind.as_str() {
        "library" => compiler.library(&c, &target, &inputs),
        "module" => compiler.module(&c, &target, &inputs),
        _ => compiler.program(&c, &target, &inputs),
      }
      .map_err(LuaError::external)?;
      LuaTarget(built).into_lua(lua)
    })?,
  )?;

  Ok(())
}

fn get_options_from_lua(opts: Option<LuaTable>) -> LuaResult<GetOptions> {
  let Some(opts) = opts else {
    return Ok(GetOptions::new());
  };
  Ok(GetOptions {
    keywords: keywords_from_lua(opts.get("keywords")?)?,
    use_context: opts.get("use_context")?,
    config_script: opts.get("config_script")?,
    config_script_name: opts.get("config_script_name")?,
  })
}
