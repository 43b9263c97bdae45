use mlua::prelude::*;

use crate::lua::globals;
use crate::script::Script;

/// Create a Lua state for one execution of `script`.
///
/// `require` searches the script's directory first, and the `cake` global is
/// bound to `script`.
pub fn create_runtime(script: &Script) -> LuaResult<Lua> {
  let lua = Lua::new();
  let dir = script.dir().to_string_lossy().into_owned();
  let package = lua.globals().get::<LuaTable>("package")?;
  let package_path = package.get::<String>("path")?;
  package.set("path", format!("{dir}/?.lua;{dir}/?/init.lua;{}", package_path))?;

  globals::register_globals(&lua, script.clone())?;

  Ok(lua)
}

/// Run `source` as the chunk named after `script`'s path.
pub fn exec_source(lua: &Lua, script: &Script, source: &str) -> LuaResult<()> {
  lua
    .load(source)
    .set_name(format!("@{}", script.path().display()))
    .exec()
}
