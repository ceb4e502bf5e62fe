//! CLI configuration management.
//!
//! Consolidates environment reads and command-line overrides.

use derby_master::store::StoreConfig;
use std::path::PathBuf;

/// Complete CLI configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliConfig {
    /// Snapshot store configuration
    pub store: StoreConfig,
}

impl CliConfig {
    /// Load configuration from the environment, applying overrides
    ///
    /// # Arguments
    ///
    /// * `state_path_override` - Snapshot path from `--state`
    pub fn from_env(state_path_override: Option<PathBuf>) -> Self {
        let mut store = StoreConfig::from_env();
        if let Some(path) = state_path_override {
            store.state_path = path;
        }
        Self { store }
    }
}
