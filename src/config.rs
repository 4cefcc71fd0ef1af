//! Analysis configuration
//!
//! Layout constants of the engine's on-disk artifacts (edge record width, block file
//! naming, log extension) are carried here and handed to each component at
//! construction instead of living in process-wide constants.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Settings shared by the scanners and analyzers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Bytes per edge record in a block file (two 4-byte vertex ids)
    pub edge_bytes: u64,
    /// Unit used when comparing block size distributions (1024 = KB)
    pub size_unit_bytes: u64,
    /// Block files are named `{block_prefix}-{row}-{col}`
    pub block_prefix: String,
    /// Extension of run log files, without the dot
    pub log_extension: String,
    /// Number of logarithmic histogram bins
    pub histogram_bins: usize,
    /// Logging setup for the binaries
    pub logging: LoggingConfig,
}

impl AnalysisConfig {
    pub const DEFAULT_EDGE_BYTES: u64 = 8;
    pub const DEFAULT_SIZE_UNIT_BYTES: u64 = 1024;

    /// Load a configuration from a JSON file. Missing fields take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: AnalysisConfig = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the layout values are usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.edge_bytes == 0 {
            return Err(ConfigError::Invalid("edge_bytes must be positive".into()));
        }
        if self.size_unit_bytes == 0 {
            return Err(ConfigError::Invalid(
                "size_unit_bytes must be positive".into(),
            ));
        }
        if self.block_prefix.is_empty() {
            return Err(ConfigError::Invalid("block_prefix must not be empty".into()));
        }
        Ok(())
    }

    pub fn with_edge_bytes(mut self, edge_bytes: u64) -> Self {
        self.edge_bytes = edge_bytes;
        self
    }

    pub fn with_size_unit_bytes(mut self, size_unit_bytes: u64) -> Self {
        self.size_unit_bytes = size_unit_bytes;
        self
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            edge_bytes: Self::DEFAULT_EDGE_BYTES,
            size_unit_bytes: Self::DEFAULT_SIZE_UNIT_BYTES,
            block_prefix: "block".to_string(),
            log_extension: "log".to_string(),
            histogram_bins: 50,
            logging: LoggingConfig::default(),
        }
    }
}

/// Logging setup used by `logging::init_logging`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset
    pub level: String,
    /// Emit JSON lines on stderr instead of the human-readable format
    pub json: bool,
    /// Also write daily-rotated JSON logs into this directory
    pub log_dir: Option<PathBuf>,
    /// Maximum number of rotated log files kept in `log_dir`
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            log_dir: None,
            max_files: 7,
        }
    }
}
