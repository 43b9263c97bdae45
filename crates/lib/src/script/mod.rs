//! Scripts: build descriptions executed as tasks.
//!
//! A [`Script`] is the explicit context of one script execution. The
//! [`ScriptTool`] is what build descriptions use to reach other scripts:
//! lazily through [`ScriptProxy`] and [`ScriptResult`], eagerly through
//! `execute`, inline through `include`, and it provides `run`, the
//! incremental-build primitive.

mod context;
mod loader;
mod proxy;
mod run;
mod tool;
pub mod types;

pub(crate) use context::ScriptState;
pub use context::Script;
pub use loader::{ScriptBody, ScriptLoader, ScriptRegistry};
pub use proxy::{ScriptProxy, ScriptResult};
pub use run::RunOutput;
pub use tool::{GetOptions, ScriptTool};
pub use types::ScriptError;
