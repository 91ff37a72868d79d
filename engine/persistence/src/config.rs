//! Configuration for the persistence layer

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where group state lives between market events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    /// Process memory only; state is lost on exit
    Memory,
    /// One JSON file per group under `data_dir/groups`
    Local,
}

/// Configuration for the persistence layer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistenceConfig {
    /// Base directory for persistence files
    pub data_dir: PathBuf,

    /// Storage backend
    pub backend: StoreBackend,

    /// Pretty-print stored JSON (easier to inspect by hand)
    pub pretty: bool,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self { data_dir: PathBuf::from("./data"), backend: StoreBackend::Memory, pretty: false }
    }
}

impl PersistenceConfig {
    /// Create a new local-file configuration with custom data directory
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self { data_dir: data_dir.into(), backend: StoreBackend::Local, ..Default::default() }
    }

    /// Get the group state directory path
    pub fn groups_dir(&self) -> PathBuf {
        self.data_dir.join("groups")
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.backend == StoreBackend::Local && self.data_dir.as_os_str().is_empty() {
            return Err("data_dir must be set for the local backend".to_string());
        }

        Ok(())
    }
}
