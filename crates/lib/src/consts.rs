//! Crate-wide constants.

/// Application name, used for directory names and user-facing output.
pub const APP_NAME: &str = "cake";

/// File name searched for when a script needs its configuration located.
pub const DEFAULT_CONFIG_SCRIPT_NAME: &str = "config.cake";

/// Directory (relative to a configuration's base directory) holding dependency records.
pub const DEPENDENCY_DIR: &str = ".cake/deps";

/// Version of the on-disk dependency record format.
///
/// Bump whenever `DependencyInfo` changes shape; records written with another
/// version are treated as stale rather than parsed best-effort.
pub const DEPENDENCY_INFO_VERSION: u32 = 1;

/// Number of hex characters kept from a SHA-256 digest when naming records.
pub const OBJ_HASH_PREFIX_LEN: usize = 20;
