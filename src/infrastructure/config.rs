//! Configuration management

use crate::executor::ExecutorConfig;
use crate::pipeline::{PipelineError, Target};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Application configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Backend to interpret declarations with
    pub target: Target,
    /// Log level
    pub log_level: String,
    /// Local executor settings
    pub executor: ExecutorConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            target: Target::Gitlab,
            log_level: "info".to_string(),
            executor: ExecutorConfig::default(),
        }
    }
}

impl Config {
    /// Parses a YAML document; missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Config`] if the document is not valid.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, PipelineError> {
        serde_yaml::from_str(yaml).map_err(|e| PipelineError::Config(e.to_string()))
    }

    /// Reads and parses a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Config`] if the file cannot be read or parsed.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, PipelineError> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| PipelineError::Config(format!("{}: {e}", path.display())))?;
        Self::from_yaml_str(&yaml)
    }
}
