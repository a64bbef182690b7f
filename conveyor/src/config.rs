//! Pipeline configuration.

use crate::errors::{ConveyorError, ConveyorResult};
use crate::sequence::DEFAULT_CAPACITY;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Upper bound accepted for [`PipelineConfig::link_capacity`].
pub const MAX_LINK_CAPACITY: usize = 4096;

/// Environment variable overriding [`PipelineConfig::link_capacity`].
pub const ENV_LINK_CAPACITY: &str = "CONVEYOR_LINK_CAPACITY";

/// Environment variable overriding [`PipelineConfig::name`].
pub const ENV_PIPELINE_NAME: &str = "CONVEYOR_PIPELINE_NAME";

/// Settings applied when wiring a pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Name attached to the pipeline's tracing span.
    pub name: String,
    /// Slots in every relay output. Bounds the in-flight items per hop.
    pub link_capacity: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            name: "pipeline".to_string(),
            link_capacity: DEFAULT_CAPACITY,
        }
    }
}

impl PipelineConfig {
    /// Load a configuration from a JSON file. Missing fields take defaults.
    pub fn from_json_file(path: &Path) -> ConveyorResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        serde_json::from_str(&raw).map_err(|e| {
            ConveyorError::Config(format!("failed to parse {}: {}", path.display(), e))
        })
    }

    /// Apply `CONVEYOR_*` environment overrides.
    pub fn with_env_overrides(self) -> ConveyorResult<Self> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> ConveyorResult<Self> {
        if let Some(raw) = lookup(ENV_LINK_CAPACITY) {
            self.link_capacity = raw.trim().parse().map_err(|e| {
                ConveyorError::Config(format!(
                    "{} must be an integer, got {:?}: {}",
                    ENV_LINK_CAPACITY, raw, e
                ))
            })?;
        }
        if let Some(name) = lookup(ENV_PIPELINE_NAME) {
            self.name = name;
        }
        Ok(self)
    }

    /// Reject values the engine cannot honour.
    pub fn sanitize(&self) -> ConveyorResult<()> {
        if self.name.trim().is_empty() {
            return Err(ConveyorError::InvalidConfig(
                "pipeline name must not be empty".into(),
            ));
        }
        if self.link_capacity == 0 || self.link_capacity > MAX_LINK_CAPACITY {
            return Err(ConveyorError::InvalidConfig(format!(
                "link_capacity must be between 1 and {}, got {}",
                MAX_LINK_CAPACITY, self.link_capacity
            )));
        }
        Ok(())
    }
}
