//! Engine configuration, read from YAML.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tb_model::GridConfig;

use crate::error::EngineResult;

/// ```yaml
/// grid: { nx: 200, ny: 200 }
/// step_pause_ms: 5
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Resolution of every derived per-cell array.
    pub grid: GridConfig,
    /// Sleep between steps while running. Zero steps flat out.
    pub step_pause_ms: u64,
}

impl EngineConfig {
    pub fn from_yaml_str(text: &str) -> EngineResult<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn load(path: &Path) -> EngineResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    pub fn step_pause(&self) -> Duration {
        Duration::from_millis(self.step_pause_ms)
    }
}
