//! Host platform utility functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::env;
use std::path::PathBuf;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Environment variable pointing at the root of the software checkout. The
/// `params` and `sessions` directories are resolved relative to it.
pub const SW_ROOT_ENV_VAR: &str = "SAR_SW_ROOT";

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Get the software root directory from the environment.
pub fn get_sw_root() -> Result<PathBuf, env::VarError> {
    env::var(SW_ROOT_ENV_VAR).map(PathBuf::from)
}

/// Get the name of the machine we are running on, if it can be determined.
///
/// Only used for the startup banner, so failures just give `None`.
pub fn get_hostname() -> Option<String> {
    if let Ok(h) = env::var("HOSTNAME") {
        return Some(h)
    }

    std::fs::read_to_string("/etc/hostname")
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
