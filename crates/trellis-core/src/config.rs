use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::ModelError;
use crate::DEFAULT_PATH;

/// Resolver tuning, loaded from `trellis.toml` when present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Safety bound on walk depth before a cycle is assumed.
    #[serde(default = "default_cycle_limit", rename = "cycle-limit")]
    pub cycle_limit: usize,

    /// Path resolved when the caller names none.
    #[serde(default = "default_path_name", rename = "default-path")]
    pub default_path: String,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            cycle_limit: default_cycle_limit(),
            default_path: default_path_name(),
        }
    }
}

fn default_cycle_limit() -> usize {
    1000
}

fn default_path_name() -> String {
    DEFAULT_PATH.to_string()
}

impl ResolverConfig {
    /// Load configuration from a TOML file, or return defaults if the file
    /// doesn't exist.
    pub fn load(path: &Path) -> Result<Self, ModelError> {
        if !path.is_file() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|e| ModelError::ConfigIo {
            path: path.display().to_string(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| ModelError::ConfigParse {
            path: path.display().to_string(),
            source: e,
        })
    }
}
