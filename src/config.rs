//! Engine configuration.
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Upper bound on the depth of any tree walk (clone, loop detection,
    /// serialization, upward validation).
    pub max_depth: usize,
    /// Run loop detection over every root when a snapshot is loaded.
    pub verify_on_load: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { max_depth: 4096, verify_on_load: true }
    }
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }
}
