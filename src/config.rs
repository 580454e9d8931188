//! Run configuration.
//!
//! Settings for a `run` can come from a JSON file; command-line flags
//! override whatever the file sets.
//!
//! ```json
//! { "max_cycles": 100000, "trace": false, "format": "json", "output": "report.txt" }
//! ```

use crate::cpu::ReportFormat;
use serde::{Serialize, Deserialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Settings for running a program.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    /// Stop after this many instructions; unlimited when unset.
    #[serde(default)]
    pub max_cycles: Option<u64>,

    /// Log every executed instruction.
    #[serde(default)]
    pub trace: bool,

    /// Report format.
    #[serde(default)]
    pub format: ReportFormat,

    /// Write reports here instead of stdout.
    #[serde(default)]
    pub output: Option<PathBuf>,
}

impl RunConfig {
    /// Parse a configuration from JSON text.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Load a configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::Io(e.to_string()))?;
        Self::from_json(&text)
    }
}

/// Errors that can occur while reading a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("invalid configuration: {0}")]
    Parse(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RunConfig::from_json("{}").unwrap();
        assert_eq!(config, RunConfig::default());
        assert_eq!(config.format, ReportFormat::Text);
        assert_eq!(config.max_cycles, None);
    }

    #[test]
    fn test_full_config() {
        let config = RunConfig::from_json(
            r#"{ "max_cycles": 500, "trace": true, "format": "json", "output": "out.txt" }"#,
        )
        .unwrap();

        assert_eq!(config.max_cycles, Some(500));
        assert!(config.trace);
        assert_eq!(config.format, ReportFormat::Json);
        assert_eq!(config.output, Some(PathBuf::from("out.txt")));
    }

    #[test]
    fn test_unknown_field_rejected() {
        assert!(matches!(
            RunConfig::from_json(r#"{ "max_cylces": 5 }"#),
            Err(ConfigError::Parse(_))
        ));
    }
}
