//! Host platform (linux for example) utility functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::env;
use std::path::PathBuf;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Environment variable pointing at the root of the software installation.
///
/// Parameter files are found in `$HEXA_SW_ROOT/params` and sessions are
/// created in `$HEXA_SW_ROOT/sessions`.
pub const SW_ROOT_ENV_VAR: &str = "HEXA_SW_ROOT";

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Basic information on the platform this executable is running on.
#[derive(Debug, Clone)]
pub struct HostInfo {
    pub os: &'static str,
    pub arch: &'static str,
    pub family: &'static str,
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Get the software root directory from the environment.
pub fn get_sw_root() -> Result<PathBuf, env::VarError> {
    env::var(SW_ROOT_ENV_VAR).map(PathBuf::from)
}

/// Retrieve information on the host platform.
pub fn get_host_info() -> HostInfo {
    HostInfo {
        os: env::consts::OS,
        arch: env::consts::ARCH,
        family: env::consts::FAMILY,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_host_info() {
        let info = get_host_info();
        assert_eq!(info.os, env::consts::OS);
        assert!(!info.arch.is_empty());
    }
}
