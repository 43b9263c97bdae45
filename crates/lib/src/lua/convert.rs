//! Conversions between Lua values and tool values.

use mlua::prelude::*;

use super::handles::LuaTarget;
use crate::script::ScriptError;
use crate::target::Source;
use crate::tool::Value;
use crate::util::OneOrMany;
use crate::variant::Keywords;

pub fn value_to_lua(lua: &Lua, value: &Value) -> LuaResult<LuaValue> {
  match value {
    Value::None => Ok(LuaValue::Nil),
    Value::Bool(b) => Ok(LuaValue::Boolean(*b)),
    Value::Int(i) => Ok(LuaValue::Integer(*i)),
    Value::Str(s) => Ok(LuaValue::String(lua.create_string(s)?)),
    Value::List(items) => sequence_to_lua(lua, items.iter()),
    Value::Set(items) => sequence_to_lua(lua, items.iter()),
    Value::Map(map) => {
      let table = lua.create_table()?;
      for (k, v) in map {
        table.set(value_to_lua(lua, k)?, value_to_lua(lua, v)?)?;
      }
      Ok(LuaValue::Table(table))
    }
    Value::Target(target) => Ok(LuaValue::UserData(lua.create_userdata(LuaTarget(target.clone()))?)),
    Value::Shared(_) => Err(LuaError::external("shared values cannot be passed to Lua")),
  }
}

fn sequence_to_lua<'a>(lua: &Lua, items: impl Iterator<Item = &'a Value>) -> LuaResult<LuaValue> {
  let table = lua.create_table()?;
  for (i, item) in items.enumerate() {
    table.raw_set(i + 1, value_to_lua(lua, item)?)?;
  }
  Ok(LuaValue::Table(table))
}

/// Convert a Lua value into a [`Value`].
///
/// Tables whose keys are exactly `1..n` become lists; any other table becomes
/// a map. Floats with no fractional part become integers, other floats are
/// kept as their string form.
pub fn lua_to_value(value: LuaValue) -> LuaResult<Value> {
  match value {
    LuaValue::Nil => Ok(Value::None),
    LuaValue::Boolean(b) => Ok(Value::Bool(b)),
    LuaValue::Integer(i) => Ok(Value::Int(i)),
    LuaValue::Number(n) if n.fract() == 0.0 && n.abs() < i64::MAX as f64 => Ok(Value::Int(n as i64)),
    LuaValue::Number(n) => Ok(Value::Str(n.to_string())),
    LuaValue::String(s) => Ok(Value::Str(s.to_str()?.to_string())),
    LuaValue::Table(table) => table_to_value(&table),
    LuaValue::UserData(ud) if ud.is::<LuaTarget>() => Ok(Value::Target(ud.borrow::<LuaTarget>()?.0.clone())),
    other => Err(LuaError::external(format!(
      "cannot use a Lua {} as a build value",
      other.type_name()
    ))),
  }
}

fn table_to_value(table: &LuaTable) -> LuaResult<Value> {
  let len = table.raw_len();
  let count = table.pairs::<LuaValue, LuaValue>().count();
  if count == len {
    let items = table
      .sequence_values::<LuaValue>()
      .map(|item| lua_to_value(item?))
      .collect::<LuaResult<Vec<_>>>()?;
    return Ok(Value::List(items));
  }

  let mut map = std::collections::BTreeMap::new();
  for pair in table.pairs::<LuaValue, LuaValue>() {
    let (k, v) = pair?;
    map.insert(lua_to_value(k)?, lua_to_value(v)?);
  }
  Ok(Value::Map(map))
}

/// A string, or a list of strings.
pub fn strings_from_lua(value: LuaValue) -> LuaResult<OneOrMany<String>> {
  match value {
    LuaValue::String(s) => Ok(OneOrMany::One(s.to_str()?.to_string())),
    LuaValue::Table(table) => Ok(OneOrMany::Many(
      table.sequence_values::<String>().collect::<LuaResult<Vec<_>>>()?,
    )),
    other => Err(LuaError::external(format!(
      "expected a string or a list of strings, got {}",
      other.type_name()
    ))),
  }
}

pub fn strings_to_lua(lua: &Lua, strings: OneOrMany<String>) -> LuaResult<LuaValue> {
  match strings {
    OneOrMany::One(s) => Ok(LuaValue::String(lua.create_string(&s)?)),
    OneOrMany::Many(items) => Ok(LuaValue::Table(lua.create_sequence_from(items)?)),
  }
}

/// A script path. Only strings are accepted; numbers are not coerced.
pub fn script_path_from_lua(value: LuaValue) -> LuaResult<String> {
  match value {
    LuaValue::String(s) => Ok(s.to_str()?.to_string()),
    other => Err(LuaError::external(ScriptError::InvalidScriptPath(format!(
      "<{}>",
      other.type_name()
    )))),
  }
}

/// A script path, or a list of them.
pub fn script_paths_from_lua(value: LuaValue) -> LuaResult<OneOrMany<String>> {
  match value {
    LuaValue::Table(table) => Ok(OneOrMany::Many(
      table
        .sequence_values::<LuaValue>()
        .map(|item| script_path_from_lua(item?))
        .collect::<LuaResult<Vec<_>>>()?,
    )),
    other => Ok(OneOrMany::One(script_path_from_lua(other)?)),
  }
}

/// Sources: a path, a target, or a list of either. `nil` is no sources.
pub fn sources_from_lua(value: LuaValue) -> LuaResult<Vec<Source>> {
  match value {
    LuaValue::Nil => Ok(Vec::new()),
    LuaValue::Table(table) => table
      .sequence_values::<LuaValue>()
      .map(|item| source_from_lua(item?))
      .collect(),
    other => Ok(vec![source_from_lua(other)?]),
  }
}

pub fn source_from_lua(value: LuaValue) -> LuaResult<Source> {
  match value {
    LuaValue::String(s) => Ok(Source::Path(s.to_str()?.to_string())),
    LuaValue::UserData(ud) if ud.is::<LuaTarget>() => Ok(Source::Target(ud.borrow::<LuaTarget>()?.0.clone())),
    other => Err(LuaError::external(format!(
      "expected a path or a target, got {}",
      other.type_name()
    ))),
  }
}

/// Variant keywords from a table of names to strings, numbers or booleans.
pub fn keywords_from_lua(table: Option<LuaTable>) -> LuaResult<Keywords> {
  let mut keywords = Keywords::new();
  let Some(table) = table else {
    return Ok(keywords);
  };
  for pair in table.pairs::<String, LuaValue>() {
    let (name, value) = pair?;
    let value = match value {
      LuaValue::String(s) => s.to_str()?.to_string(),
      LuaValue::Integer(i) => i.to_string(),
      LuaValue::Number(n) => n.to_string(),
      LuaValue::Boolean(b) => b.to_string(),
      other => {
        return Err(LuaError::external(format!(
          "keyword '{}' must be a string, number or boolean, got {}",
          name,
          other.type_name()
        )));
      }
    };
    keywords.insert(name, value);
  }
  Ok(keywords)
}
