// SPDX-License-Identifier: MIT OR Apache-2.0
//! Graph configuration.
//!
//! Stored as RON, e.g.
//!
//! ```ron
//! (
//!     operators: (fill_mode: aspect_fill, bypass_transform: true),
//!     resources: (schedule_on_push: false),
//! )
//! ```

use crate::param::FillMode;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Settings applied to a whole graph
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Defaults for operator-built blends
    pub operators: OperatorConfig,
    /// Resource frame handling
    pub resources: ResourceConfig,
}

/// Placement used by blends created through [`crate::operators`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OperatorConfig {
    /// Fill mode of new blends
    pub fill_mode: FillMode,
    /// Whether new blends skip their own transform
    pub bypass_transform: bool,
}

impl Default for OperatorConfig {
    fn default() -> Self {
        Self {
            fill_mode: FillMode::AspectFit,
            bypass_transform: true,
        }
    }
}

/// Resource frame handling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceConfig {
    /// Emit a render schedule request whenever a frame is pushed
    pub schedule_on_push: bool,
}

impl Default for ResourceConfig {
    fn default() -> Self {
        Self { schedule_on_push: true }
    }
}

impl GraphConfig {
    /// Deserialize from RON format
    pub fn from_ron(s: &str) -> Result<Self, ConfigError> {
        Ok(ron::from_str(s)?)
    }

    /// Serialize to RON format
    pub fn to_ron(&self) -> Result<String, ConfigError> {
        Ok(ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())?)
    }

    /// Load configuration from a RON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let config = Self::from_ron(&contents)?;
        tracing::info!("Loaded graph config from {}", path.display());
        Ok(config)
    }
}

/// Error when loading configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// RON could not be parsed
    #[error("Parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),

    /// RON could not be written
    #[error("Serialization error: {0}")]
    Serialize(#[from] ron::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config = GraphConfig::from_ron("(operators: (fill_mode: pixel))").unwrap();
        assert_eq!(config.operators.fill_mode, FillMode::Pixel);
        assert!(config.operators.bypass_transform);
        assert!(config.resources.schedule_on_push);
    }

    #[test]
    fn test_config_round_trip() {
        let mut config = GraphConfig::default();
        config.resources.schedule_on_push = false;
        let ron = config.to_ron().unwrap();
        assert_eq!(GraphConfig::from_ron(&ron).unwrap(), config);
    }

    #[test]
    fn test_invalid_config() {
        assert!(matches!(
            GraphConfig::from_ron("(operators: 3)"),
            Err(ConfigError::Parse(_))
        ));
    }
}
