use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::anyhow;
use tracing::trace;

use crate::lua::runtime;
use crate::script::{Script, ScriptBody, ScriptError, ScriptLoader};
use crate::util::lock;

/// Loads scripts from Lua files on disk.
///
/// A file is read once per loader; every execution still gets its own Lua
/// state.
#[derive(Default)]
pub struct LuaScriptLoader {
  sources: Mutex<HashMap<PathBuf, Arc<LuaScript>>>,
}

impl LuaScriptLoader {
  pub fn new() -> Self {
    Self::default()
  }
}

impl ScriptLoader for LuaScriptLoader {
  fn exists(&self, path: &Path) -> bool {
    path.is_file()
  }

  fn load(&self, path: &Path) -> Result<Arc<dyn ScriptBody>, ScriptError> {
    if let Some(script) = lock(&self.sources).get(path) {
      return Ok(script.clone());
    }

    let source = std::fs::read_to_string(path).map_err(|source| {
      if source.kind() == std::io::ErrorKind::NotFound {
        ScriptError::ScriptNotFound(path.to_path_buf())
      } else {
        ScriptError::Io {
          path: path.to_path_buf(),
          source,
        }
      }
    })?;
    trace!(path = %path.display(), bytes = source.len(), "loaded script source");

    let script = Arc::new(LuaScript { source });
    lock(&self.sources).insert(path.to_path_buf(), script.clone());
    Ok(script)
  }
}

struct LuaScript {
  source: String,
}

impl ScriptBody for LuaScript {
  fn execute(&self, script: &Script) -> anyhow::Result<()> {
    let lua = runtime::create_runtime(script).map_err(|err| anyhow!("{}", err))?;
    runtime::exec_source(&lua, script, &self.source).map_err(|err| anyhow!("{}", err))
  }
}
