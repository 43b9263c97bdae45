//! Built-in build actions.

mod compiler;
mod filesys;
mod process;
mod shell;
mod types;

pub use compiler::{CompilerTool, Language, parse_depfile};
pub use filesys::FileSysTool;
pub use shell::ShellTool;
pub use types::CompilerError;
