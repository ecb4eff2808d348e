//! Host environment utility functions

use std::path::PathBuf;
use thiserror::Error;

/// Name of the environment variable which points at the software root.
pub const SW_ROOT_ENV_VAR: &str = "HIGHWAY_SW_ROOT";

/// Errors associated with the host environment.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("The software root environment variable (HIGHWAY_SW_ROOT) is not set")]
    SwRootNotSet
}

/// Get the root directory of the highway software tree.
///
/// The root anchors the `params`, `data`, and `sessions` directories and is
/// pointed at by the `HIGHWAY_SW_ROOT` environment variable.
pub fn get_highway_sw_root() -> Result<PathBuf, HostError> {
    match std::env::var(SW_ROOT_ENV_VAR) {
        Ok(p) => Ok(PathBuf::from(p)),
        Err(_) => Err(HostError::SwRootNotSet)
    }
}
