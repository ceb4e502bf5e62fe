//! Snapshot store configuration.

use std::env;
use std::path::PathBuf;

/// Default snapshot file name
pub const DEFAULT_STATE_PATH: &str = "derby_state.json";

/// Snapshot store configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Path of the JSON snapshot file
    pub state_path: PathBuf,
}

impl StoreConfig {
    /// Create configuration from environment variables
    ///
    /// Expected environment variables:
    /// - `DERBY_STATE_PATH`: snapshot file (default: `derby_state.json`)
    pub fn from_env() -> Self {
        Self {
            state_path: env::var("DERBY_STATE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_STATE_PATH)),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            state_path: PathBuf::from(DEFAULT_STATE_PATH),
        }
    }
}
