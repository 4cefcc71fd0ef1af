//! Run log parsing
//!
//! Reads engine run logs into sparse `MetricRecord`s. Logs may contain stray binary
//! output from the engine's pipe buffering, so decoding is lossy and a bad line is
//! never fatal.

use crate::config::AnalysisConfig;
use crate::metrics::{MetricLineClassifier, MetricRecord};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

/// Log directory errors
#[derive(Error, Debug)]
pub enum LogDirError {
    #[error("Log directory not found: {0}")]
    DirectoryNotFound(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// One parsed log file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedLog {
    /// File name without directory, used to derive the run key
    pub file_name: String,
    pub record: MetricRecord,
}

/// Parses run logs with a `MetricLineClassifier`.
#[derive(Debug, Clone)]
pub struct LogRunParser {
    classifier: MetricLineClassifier,
    extension: String,
}

impl LogRunParser {
    pub fn new(config: &AnalysisConfig) -> Self {
        Self {
            classifier: MetricLineClassifier::new(),
            extension: config.log_extension.clone(),
        }
    }

    /// Parse in-memory log text. A metric seen more than once keeps its last value.
    pub fn parse_str(&self, text: &str) -> MetricRecord {
        let mut record = MetricRecord::default();
        for line in text.lines() {
            if let Some((metric, value)) = self.classifier.classify(line) {
                record.set(metric, value);
            }
        }
        record
    }

    /// Parse one log file. Invalid UTF-8 is replaced rather than rejected.
    pub fn parse_file(&self, path: impl AsRef<Path>) -> Result<MetricRecord, std::io::Error> {
        let bytes = std::fs::read(path.as_ref())?;
        let text = String::from_utf8_lossy(&bytes);
        let record = self.parse_str(&text);
        debug!(
            path = %path.as_ref().display(),
            metrics = record.iter().count(),
            "Parsed run log"
        );
        Ok(record)
    }

    /// Parse every log file in `dir`, ordered by file name.
    ///
    /// Files that cannot be read are logged and skipped.
    pub fn parse_directory(&self, dir: impl AsRef<Path>) -> Result<Vec<ParsedLog>, LogDirError> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(LogDirError::DirectoryNotFound(dir.to_path_buf()));
        }

        let mut paths: Vec<PathBuf> = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            let is_log = path
                .extension()
                .map(|ext| ext == self.extension.as_str())
                .unwrap_or(false);
            if path.is_file() && is_log {
                paths.push(path);
            }
        }
        paths.sort();

        let mut parsed = Vec::with_capacity(paths.len());
        for path in paths {
            let file_name = match path.file_name() {
                Some(name) => name.to_string_lossy().into_owned(),
                None => continue,
            };
            match self.parse_file(&path) {
                Ok(record) => parsed.push(ParsedLog { file_name, record }),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skipping unreadable run log");
                }
            }
        }

        Ok(parsed)
    }
}

impl Default for LogRunParser {
    fn default() -> Self {
        Self::new(&AnalysisConfig::default())
    }
}
