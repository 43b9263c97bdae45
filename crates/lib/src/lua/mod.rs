//! Lua build descriptions.
//!
//! Scripts are plain Lua files. Every execution runs in a fresh Lua state
//! with a `cake` global bound to the executing [`Script`](crate::script::Script).
//!
//! # Submodules
//!
//! - [`convert`] - Moving values between Lua and [`Value`](crate::tool::Value)
//! - [`globals`] - The `cake` table
//! - [`handles`] - Userdata for targets, variants and lazy script handles
//! - [`helpers`] - Helper tables exposed under `cake`
//! - [`loader`] - [`LuaScriptLoader`], the file-backed script loader
//! - [`runtime`] - Lua state setup

pub mod convert;
pub mod globals;
pub mod handles;
pub mod helpers;
pub mod loader;
pub mod runtime;

pub use loader::LuaScriptLoader;
