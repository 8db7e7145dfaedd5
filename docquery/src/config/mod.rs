// Store configuration - parsed from a YAML file

use crate::error::{DocQueryError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default location of the configuration file, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "config/store.yaml";

/// Path value selecting an in-memory store
pub const IN_MEMORY: &str = ":memory:";

const DEFAULT_DATABASE: &str = "default";

/// Where the store lives and which database namespace to use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    pub path: PathBuf,
    #[serde(default = "default_database")]
    pub database: String,
}

fn default_database() -> String {
    DEFAULT_DATABASE.to_string()
}

impl StoreConfig {
    pub fn new(path: impl Into<PathBuf>, database: impl Into<String>) -> Self {
        StoreConfig {
            path: path.into(),
            database: database.into(),
        }
    }

    pub fn in_memory() -> Self {
        StoreConfig::new(IN_MEMORY, DEFAULT_DATABASE)
    }

    pub fn is_in_memory(&self) -> bool {
        self.path.as_os_str() == IN_MEMORY
    }

    /// Load a config file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            DocQueryError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_yaml_str(&content)
    }

    /// Parse a YAML config string.
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let config: StoreConfig = serde_yaml::from_str(content)?;
        if config.database.is_empty() {
            return Err(DocQueryError::Config("database must not be empty".into()));
        }
        Ok(config)
    }
}
