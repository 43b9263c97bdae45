//! The attribute-locked object model every build action is built on.
//!
//! A [`Tool`] holds named [`Value`]s. Names are declared while the tool is
//! open; afterwards only declared names may be assigned, and every assignment
//! clears the tool's memoisation cache. Build actions embed a `Tool` and
//! implement [`AsTool`] (and [`CloneTool`] when they can be cloned into a
//! variant-specific derivative).

mod memo;
mod object;
pub mod types;
mod value;

pub use memo::MemoKey;
pub use object::{AsTool, CloneTool, Construct, Tool};
pub use types::ToolError;
pub use value::{Shared, Value};
