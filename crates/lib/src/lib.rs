//! cake-lib: the core of the cake build tool
//!
//! Build descriptions are scripts. A script runs once per (path, variant)
//! pair inside a configuration, declares build steps through tools, and
//! publishes results other scripts can import. Build steps only run when
//! their dependency records say the targets are out of date.
//!
//! - `Tool`: attribute-locked objects with memoised queries
//! - `Script`: one execution's context, results and task
//! - `ScriptTool::run`: the incremental-build primitive
//! - `Configuration`: variants, script latching and dependency records
//! - `Engine`: tasks, concurrency and configuration discovery

pub mod configuration;
pub mod consts;
pub mod depinfo;
pub mod engine;
pub mod lua;
pub mod path;
pub mod platform;
pub mod script;
pub mod target;
pub mod tool;
pub mod tools;
pub mod util;
pub mod variant;
