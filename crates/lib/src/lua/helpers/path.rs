use mlua::prelude::*;

use crate::lua::convert::{strings_from_lua, strings_to_lua};
use crate::path;

/// Create the `cake.paths` table.
pub fn create_path_helpers(lua: &Lua) -> LuaResult<LuaTable> {
  let paths = lua.create_table()?;

  // cake.paths.join(...) - cross product; list arguments multiply the result
  paths.set(
    "join",
    lua.create_function(|lua, segments: LuaMultiValue| {
      let segments = segments
        .into_iter()
        .map(strings_from_lua)
        .collect::<LuaResult<Vec<_>>>()?;
      strings_to_lua(lua, path::join(segments))
    })?,
  )?;

  paths.set(
    "dirname",
    lua.create_function(|_, p: String| Ok(path::dir_name(&p).to_string()))?,
  )?;

  paths.set(
    "basename",
    lua.create_function(|_, p: String| Ok(path::base_name(&p).to_string()))?,
  )?;

  // cake.paths.extension(path) - extension including the dot, or ""
  paths.set(
    "extension",
    lua.create_function(|_, p: String| Ok(path::extension(&p).to_string()))?,
  )?;

  paths.set(
    "has_extension",
    lua.create_function(|_, p: String| Ok(path::has_extension(&p)))?,
  )?;

  // The remaining helpers map over lists, keeping the argument's shape.
  paths.set(
    "strip_extension",
    lua.create_function(|lua, p: LuaValue| {
      let stripped = strings_from_lua(p)?.map(|p| path::strip_extension(&p).to_string());
      strings_to_lua(lua, stripped)
    })?,
  )?;

  paths.set(
    "base_name_without_extension",
    lua.create_function(|lua, p: LuaValue| {
      let names = strings_from_lua(p)?.map(|p| path::base_name_without_extension(&p).to_string());
      strings_to_lua(lua, names)
    })?,
  )?;

  paths.set(
    "add_prefix",
    lua.create_function(|lua, (p, prefix): (LuaValue, String)| {
      let prefixed = strings_from_lua(p)?.map(|p| path::add_prefix(&p, &prefix));
      strings_to_lua(lua, prefixed)
    })?,
  )?;

  paths.set(
    "force_extension",
    lua.create_function(|lua, (p, ext): (LuaValue, String)| {
      let forced = strings_from_lua(p)?.map(|p| path::force_extension(&p, &ext));
      strings_to_lua(lua, forced)
    })?,
  )?;

  paths.set(
    "force_prefix_suffix",
    lua.create_function(|lua, (p, prefix, suffix): (LuaValue, String, String)| {
      let forced = strings_from_lua(p)?.map(|p| path::force_prefix_suffix(&p, &prefix, &suffix));
      strings_to_lua(lua, forced)
    })?,
  )?;

  paths.set(
    "common_path",
    lua.create_function(|_, (a, b): (String, String)| Ok(path::common_path(&a, &b).to_string()))?,
  )?;

  // cake.paths.normalize(path) - resolve . and .. without touching the file system
  paths.set(
    "normalize",
    lua.create_function(|_, p: String| {
      Ok(path::normalize(std::path::Path::new(&p)).to_string_lossy().into_owned())
    })?,
  )?;

  paths.set(
    "is_absolute",
    lua.create_function(|_, p: String| Ok(std::path::Path::new(&p).is_absolute()))?,
  )?;

  Ok(paths)
}
