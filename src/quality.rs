//! Partition quality analysis
//!
//! Measures load imbalance of a grid partition as the total absolute deviation of
//! per-block edge counts from the ideal `total_edges / P²`. Every cell counts,
//! including empty ones.

use crate::blocks::BlockScan;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Load-balance statistics of one partition directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartitionQualityReport {
    pub p: u32,
    pub total_blocks: u64,
    pub ideal_edges_per_block: f64,
    /// Σ |actual − ideal| over all P² blocks
    pub total_absolute_deviation: f64,
    /// Sum of the scanned block edge counts
    pub verified_total_edges: u64,
    /// Edge count the caller expected the grid to hold
    pub expected_total_edges: u64,
    pub non_empty_blocks: u64,
    /// False when the scanned sum disagrees with the expected total
    pub verified: bool,
}

impl PartitionQualityReport {
    /// Mean absolute deviation per block.
    pub fn mean_absolute_deviation(&self) -> f64 {
        if self.total_blocks == 0 {
            return 0.0;
        }
        self.total_absolute_deviation / self.total_blocks as f64
    }

    /// Fraction of blocks that hold at least one edge.
    pub fn occupancy(&self) -> f64 {
        if self.total_blocks == 0 {
            return 0.0;
        }
        self.non_empty_blocks as f64 / self.total_blocks as f64
    }
}

/// Which way the degree-aware partition moved relative to the baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BalanceVerdict {
    MoreBalanced,
    LessBalanced,
    EquallyBalanced,
}

/// Deviation comparison between a baseline and a degree-aware partition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityComparison {
    pub baseline_deviation: f64,
    pub other_deviation: f64,
    /// (baseline − other) / baseline × 100, or 0 when the baseline deviation is 0
    pub deviation_reduction_pct: f64,
    pub verdict: BalanceVerdict,
    pub both_verified: bool,
}

/// Computes `PartitionQualityReport`s.
#[derive(Debug, Clone, Copy, Default)]
pub struct PartitionQualityAnalyzer;

impl PartitionQualityAnalyzer {
    pub fn new() -> Self {
        Self
    }

    /// Analyze a scan against the externally known edge count.
    ///
    /// A mismatch between the scanned sum and `expected_total_edges` does not abort the
    /// analysis; the report comes back with `verified == false`.
    pub fn analyze(&self, scan: &BlockScan, expected_total_edges: u64) -> PartitionQualityReport {
        let p = scan.p();
        let total_blocks = p as u64 * p as u64;
        let ideal = if total_blocks == 0 {
            0.0
        } else {
            expected_total_edges as f64 / total_blocks as f64
        };

        let mut total_absolute_deviation = 0.0;
        let mut verified_total_edges = 0u64;
        let mut non_empty_blocks = 0u64;
        for stat in scan.stats() {
            total_absolute_deviation += (stat.edges as f64 - ideal).abs();
            verified_total_edges += stat.edges;
            if stat.edges > 0 {
                non_empty_blocks += 1;
            }
        }

        let verified = verified_total_edges == expected_total_edges;
        if !verified {
            warn!(
                directory = %scan.directory().display(),
                scanned = verified_total_edges,
                expected = expected_total_edges,
                "Sum of block edges does not match the expected total"
            );
        }

        PartitionQualityReport {
            p,
            total_blocks,
            ideal_edges_per_block: ideal,
            total_absolute_deviation,
            verified_total_edges,
            expected_total_edges,
            non_empty_blocks,
            verified,
        }
    }

    /// Compare a degree-aware partition against the baseline.
    pub fn compare(
        &self,
        baseline: &PartitionQualityReport,
        other: &PartitionQualityReport,
    ) -> QualityComparison {
        let b = baseline.total_absolute_deviation;
        let o = other.total_absolute_deviation;
        let deviation_reduction_pct = if b > 0.0 { (b - o) / b * 100.0 } else { 0.0 };
        let verdict = if o < b {
            BalanceVerdict::MoreBalanced
        } else if o > b {
            BalanceVerdict::LessBalanced
        } else {
            BalanceVerdict::EquallyBalanced
        };

        QualityComparison {
            baseline_deviation: b,
            other_deviation: o,
            deviation_reduction_pct,
            verdict,
            both_verified: baseline.verified && other.verified,
        }
    }
}
