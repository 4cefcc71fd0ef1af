//! grid_eval: Run-log aggregation and partition-quality analysis for grid graph engines
//!
//! Core library for turning engine run logs into averaged end-to-end timing tables and
//! for measuring how evenly a P×P grid partitioning spreads edges across block files.

pub mod aggregate;
pub mod blocks;
pub mod config;
pub mod degrees;
pub mod distribution;
pub mod log_parser;
pub mod logging;
pub mod metrics;
pub mod quality;
pub mod run_key;

pub use aggregate::{AggregateReport, AggregatedRow, RunAggregator};
pub use blocks::{BlockCoordinate, BlockFileScanner, BlockInspection, BlockScan, BlockStat};
pub use config::AnalysisConfig;
pub use distribution::{DistributionComparator, DistributionComparison, SizeDistribution};
pub use log_parser::LogRunParser;
pub use metrics::{MetricLineClassifier, MetricRecord, TimingMetric};
pub use quality::{PartitionQualityAnalyzer, PartitionQualityReport};
pub use run_key::{Phase, RunKey};

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Partitioning strategy that produced a grid or a run log.
///
/// Ordering follows the report sort order: baseline rows come first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Method {
    /// Fixed vertex-range partitioning
    Baseline,
    /// Degree-balanced vertex ranges
    DegreeAware,
}

impl Method {
    pub const ALL: [Method; 2] = [Method::Baseline, Method::DegreeAware];

    /// Token used in log file names and serialized tables.
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Baseline => "baseline",
            Method::DegreeAware => "degree_aware",
        }
    }

    /// Label used by chart and table presentation.
    pub fn display_name(&self) -> &'static str {
        match self {
            Method::Baseline => "Baseline",
            Method::DegreeAware => "Degree-based",
        }
    }

    /// Whether preprocessing for this method includes a degree calculation phase.
    pub fn computes_degrees(&self) -> bool {
        matches!(self, Method::DegreeAware)
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Method {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "baseline" => Ok(Method::Baseline),
            // "dv" is the token older experiment scripts wrote
            "degree_aware" | "dv" => Ok(Method::DegreeAware),
            other => Err(other.to_string()),
        }
    }
}

/// Arithmetic mean, `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}
