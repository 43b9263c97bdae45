//! Userdata handed to Lua scripts.

use mlua::prelude::*;

use super::convert::value_to_lua;
use crate::script::{ScriptProxy, ScriptResult};
use crate::target::FileTarget;
use crate::variant::{Variant, VariantTool};

/// A file produced (or to be produced) by a build step.
#[derive(Debug, Clone)]
pub struct LuaTarget(pub FileTarget);

impl LuaUserData for LuaTarget {
  fn add_fields<F: LuaUserDataFields<Self>>(fields: &mut F) {
    fields.add_field_method_get("path", |_, this| Ok(this.0.path.clone()));
  }

  fn add_methods<M: LuaUserDataMethods<Self>>(methods: &mut M) {
    methods.add_meta_method(mlua::MetaMethod::ToString, |_, this, ()| Ok(this.0.path.clone()));
  }
}

/// `cake.variant`: read-only keyword lookup. Unknown keywords are errors.
pub struct LuaVariant {
  variant: Variant,
  tool: VariantTool,
}

impl LuaVariant {
  pub fn new(variant: Variant) -> Self {
    LuaVariant {
      variant,
      tool: VariantTool::new(),
    }
  }
}

impl LuaUserData for LuaVariant {
  fn add_methods<M: LuaUserDataMethods<Self>>(methods: &mut M) {
    methods.add_meta_method(mlua::MetaMethod::Index, |lua, this, key: String| {
      let value = this.tool.lookup(&this.variant, &key).map_err(LuaError::external)?;
      value_to_lua(lua, &value)
    });

    methods.add_meta_method(mlua::MetaMethod::NewIndex, |_, _this, (key, _): (String, LuaValue)| {
      Err::<(), _>(LuaError::external(format!("variant keyword '{}' is read-only", key)))
    });

    methods.add_meta_method(mlua::MetaMethod::ToString, |_, this, ()| Ok(this.variant.to_string()));
  }
}

/// Lazy handle returned by `cake.get`.
pub struct LuaScriptProxy(pub ScriptProxy);

impl LuaUserData for LuaScriptProxy {
  fn add_methods<M: LuaUserDataMethods<Self>>(methods: &mut M) {
    // Starts the script; returns its absolute path.
    methods.add_method("execute", |_, this, ()| {
      let script = this.0.execute().map_err(LuaError::external)?;
      Ok(script.path().to_string_lossy().into_owned())
    });

    methods.add_method("wait", |_, this, ()| {
      let script = this.0.execute().map_err(LuaError::external)?;
      script.wait_blocking().map_err(LuaError::external)
    });

    methods.add_method("get_result", |_, this, name: String| {
      Ok(LuaScriptResult(this.0.get_result(name)))
    });
  }
}

/// Lazy handle returned by `cake.get_result` and `proxy:get_result`.
pub struct LuaScriptResult(pub ScriptResult);

impl LuaUserData for LuaScriptResult {
  fn add_fields<F: LuaUserDataFields<Self>>(fields: &mut F) {
    fields.add_field_method_get("name", |_, this| Ok(this.0.name().to_string()));
  }

  fn add_methods<M: LuaUserDataMethods<Self>>(methods: &mut M) {
    // Runs the producing script if needed and blocks until it finishes.
    methods.add_method("get", |lua, this, ()| {
      let value = this.0.resolve_blocking().map_err(LuaError::external)?;
      value_to_lua(lua, &value)
    });
  }
}
