//! Host platform utility functions

use std::path::PathBuf;

/// Name of the environment variable holding the software root directory.
pub const SW_ROOT_ENV_VAR: &str = "PAL_SW_ROOT";

/// Get the root directory of the software, which contains the `params` and `sessions`
/// directories.
pub fn get_pal_sw_root() -> Result<PathBuf, std::env::VarError> {
    std::env::var(SW_ROOT_ENV_VAR).map(PathBuf::from)
}
