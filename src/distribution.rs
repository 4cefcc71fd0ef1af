//! Block size distribution comparison
//!
//! Compares the shape of two partitions' block size distributions, independent of
//! which coordinate holds which size. The two grids may use different P.

use crate::blocks::BlockScan;
use crate::config::{AnalysisConfig, ConfigError};
use serde::{Deserialize, Serialize};

/// Order statistics of one partition's block sizes, in the comparator's unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SizeDistribution {
    pub p: u32,
    /// Block sizes sorted ascending, including empty blocks
    pub sorted_sizes: Vec<f64>,
    pub mean: f64,
    /// Population standard deviation
    pub std_dev: f64,
    pub min: f64,
    pub median: f64,
    pub max: f64,
    pub gini: f64,
}

impl SizeDistribution {
    /// Describe an arbitrary sequence of sizes.
    pub fn from_sizes(p: u32, sizes: impl IntoIterator<Item = f64>) -> Self {
        let mut sorted: Vec<f64> = sizes.into_iter().collect();
        sorted.sort_by(|a, b| a.total_cmp(b));

        let (mean, std_dev) = population_mean_std(&sorted);
        Self {
            p,
            mean,
            std_dev,
            min: sorted.first().copied().unwrap_or(0.0),
            median: median_sorted(&sorted),
            max: sorted.last().copied().unwrap_or(0.0),
            gini: gini_coefficient(&sorted),
            sorted_sizes: sorted,
        }
    }

    /// Sizes greater than zero, ascending.
    pub fn positive_sizes(&self) -> impl Iterator<Item = f64> + '_ {
        self.sorted_sizes.iter().copied().filter(|s| *s > 0.0)
    }
}

/// Baseline vs degree-aware size distributions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionComparison {
    /// Bytes per reported size unit
    pub unit_bytes: u64,
    pub baseline: SizeDistribution,
    pub other: SizeDistribution,
    /// (baseline_std − other_std) / baseline_std × 100, or 0 when baseline_std is 0
    pub reduction_pct: f64,
}

/// Shared log-spaced histogram of two size distributions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogHistogram {
    /// `bins + 1` ascending edges; the last bin is closed on the right
    pub edges: Vec<f64>,
    pub baseline_counts: Vec<u64>,
    pub other_counts: Vec<u64>,
}

/// Compares block size distributions in a common unit.
#[derive(Debug, Clone)]
pub struct DistributionComparator {
    unit_bytes: u64,
}

impl DistributionComparator {
    /// Comparator reporting sizes in units of `config.size_unit_bytes`, which must be
    /// positive.
    pub fn new(config: &AnalysisConfig) -> Result<Self, ConfigError> {
        if config.size_unit_bytes == 0 {
            return Err(ConfigError::Invalid(
                "size_unit_bytes must be positive".into(),
            ));
        }
        Ok(Self {
            unit_bytes: config.size_unit_bytes,
        })
    }

    pub fn unit_bytes(&self) -> u64 {
        self.unit_bytes
    }

    pub fn describe(&self, scan: &BlockScan) -> SizeDistribution {
        let unit = self.unit_bytes as f64;
        SizeDistribution::from_sizes(
            scan.p(),
            scan.stats().iter().map(|s| s.bytes as f64 / unit),
        )
    }

    pub fn compare(&self, baseline: &BlockScan, other: &BlockScan) -> DistributionComparison {
        let baseline = self.describe(baseline);
        let other = self.describe(other);
        let reduction_pct = if baseline.std_dev > 0.0 {
            (baseline.std_dev - other.std_dev) / baseline.std_dev * 100.0
        } else {
            0.0
        };

        DistributionComparison {
            unit_bytes: self.unit_bytes,
            baseline,
            other,
            reduction_pct,
        }
    }

    /// Histogram both distributions over shared logarithmic bins.
    ///
    /// Empty blocks are left out since they have no place on a log axis. Returns `None`
    /// when `bins` is 0 or neither distribution has a positive size.
    pub fn histogram(
        &self,
        baseline: &SizeDistribution,
        other: &SizeDistribution,
        bins: usize,
    ) -> Option<LogHistogram> {
        if bins == 0 {
            return None;
        }
        let positives = baseline.positive_sizes().chain(other.positive_sizes());
        let (min, max) = positives.fold(None, |acc: Option<(f64, f64)>, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })?;

        let edges = log_edges(min, max, bins);
        Some(LogHistogram {
            baseline_counts: bin_counts(&edges, baseline.positive_sizes()),
            other_counts: bin_counts(&edges, other.positive_sizes()),
            edges,
        })
    }
}

impl Default for DistributionComparator {
    fn default() -> Self {
        Self {
            unit_bytes: AnalysisConfig::DEFAULT_SIZE_UNIT_BYTES,
        }
    }
}

fn population_mean_std(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values
        .iter()
        .map(|v| {
            let diff = v - mean;
            diff * diff
        })
        .sum::<f64>()
        / n;
    (mean, var.sqrt())
}

fn median_sorted(sorted: &[f64]) -> f64 {
    match sorted.len() {
        0 => 0.0,
        n if n % 2 == 1 => sorted[n / 2],
        n => (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0,
    }
}

fn gini_coefficient(sorted: &[f64]) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let n = sorted.len() as f64;
    let sum: f64 = sorted.iter().sum();
    if sum == 0.0 {
        return 0.0;
    }
    let mut cum = 0.0;
    for (i, v) in sorted.iter().enumerate() {
        cum += (i as f64 + 1.0) * v;
    }
    (2.0 * cum) / (n * sum) - (n + 1.0) / n
}

fn log_edges(min: f64, max: f64, bins: usize) -> Vec<f64> {
    let lo = min.log10();
    let hi = max.log10();
    let step = (hi - lo) / bins as f64;
    let mut edges: Vec<f64> = (0..=bins)
        .map(|i| 10f64.powf(lo + step * i as f64))
        .collect();
    // Pin the ends so the extremes fall inside the range despite rounding
    edges[0] = min;
    edges[bins] = max;
    edges
}

fn bin_counts(edges: &[f64], values: impl Iterator<Item = f64>) -> Vec<u64> {
    let bins = edges.len() - 1;
    let last_edge = edges[bins];
    let mut counts = vec![0u64; bins];
    for v in values {
        if v < edges[0] || v > last_edge {
            continue;
        }
        let idx = if v >= last_edge {
            bins - 1
        } else {
            edges.partition_point(|e| *e <= v) - 1
        };
        counts[idx.min(bins - 1)] += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::BlockFileScanner;
    use tempfile::TempDir;

    #[test]
    fn test_from_sizes_statistics() {
        let d = SizeDistribution::from_sizes(2, vec![4.0, 0.0, 2.0, 2.0]);
        assert_eq!(d.sorted_sizes, vec![0.0, 2.0, 2.0, 4.0]);
        assert_eq!(d.mean, 2.0);
        // population variance (4 + 0 + 0 + 4) / 4 = 2
        assert!((d.std_dev - 2f64.sqrt()).abs() < 1e-12);
        assert_eq!(d.min, 0.0);
        assert_eq!(d.median, 2.0);
        assert_eq!(d.max, 4.0);
    }

    #[test]
    fn test_gini_bounds() {
        let even = SizeDistribution::from_sizes(2, vec![5.0; 4]);
        assert!(even.gini.abs() < 1e-12);
        let skewed = SizeDistribution::from_sizes(2, vec![0.0, 0.0, 0.0, 8.0]);
        assert!((skewed.gini - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_compare_from_scans_in_kb() {
        let base_dir = TempDir::new().unwrap();
        let dv_dir = TempDir::new().unwrap();
        std::fs::write(base_dir.path().join("block-0-0"), vec![0u8; 4096]).unwrap();
        for (r, c) in [(0, 0), (0, 1), (1, 0), (1, 1)] {
            std::fs::write(
                dv_dir.path().join(format!("block-{}-{}", r, c)),
                vec![0u8; 1024],
            )
            .unwrap();
        }

        let scanner = BlockFileScanner::default();
        let base = scanner.scan(base_dir.path(), 2).unwrap();
        let dv = scanner.scan(dv_dir.path(), 2).unwrap();

        let cmp = DistributionComparator::default().compare(&base, &dv);
        assert_eq!(cmp.baseline.sorted_sizes, vec![0.0, 0.0, 0.0, 4.0]);
        assert_eq!(cmp.other.sorted_sizes, vec![1.0; 4]);
        assert!(cmp.baseline.std_dev > 0.0);
        assert_eq!(cmp.other.std_dev, 0.0);
        assert_eq!(cmp.reduction_pct, 100.0);
    }

    #[test]
    fn test_zero_baseline_std_gives_zero_reduction() {
        let temp_dir = TempDir::new().unwrap();
        let other_dir = TempDir::new().unwrap();
        std::fs::write(other_dir.path().join("block-0-0"), vec![0u8; 800]).unwrap();

        let scanner = BlockFileScanner::default();
        let empty = scanner.scan(temp_dir.path(), 3).unwrap();
        let other = scanner.scan(other_dir.path(), 2).unwrap();

        let cmp = DistributionComparator::default().compare(&empty, &other);
        assert_eq!(cmp.baseline.std_dev, 0.0);
        assert_eq!(cmp.reduction_pct, 0.0);
        assert_eq!(cmp.baseline.p, 3);
        assert_eq!(cmp.other.p, 2);
    }

    #[test]
    fn test_unit_must_be_positive() {
        let config = AnalysisConfig::default().with_size_unit_bytes(0);
        assert!(matches!(
            DistributionComparator::new(&config),
            Err(ConfigError::Invalid(_))
        ));
        let mb = AnalysisConfig::default().with_size_unit_bytes(1 << 20);
        assert_eq!(DistributionComparator::new(&mb).unwrap().unit_bytes(), 1 << 20);
    }

    #[test]
    fn test_histogram_shared_log_bins() {
        let comparator = DistributionComparator::default();
        let base = SizeDistribution::from_sizes(2, vec![0.0, 1.0, 5.0, 100.0]);
        let dv = SizeDistribution::from_sizes(2, vec![20.0, 20.0, 50.0, 0.0]);

        let hist = comparator.histogram(&base, &dv, 2).unwrap();
        assert_eq!(hist.edges.len(), 3);
        assert_eq!(hist.edges[0], 1.0);
        assert_eq!(hist.edges[2], 100.0);
        assert!((hist.edges[1] - 10.0).abs() < 1e-9);
        // zeros excluded; 100.0 falls in the closed last bin
        assert_eq!(hist.baseline_counts, vec![2, 1]);
        assert_eq!(hist.other_counts, vec![0, 3]);
    }

    #[test]
    fn test_histogram_degenerate_inputs() {
        let comparator = DistributionComparator::default();
        let empty = SizeDistribution::from_sizes(1, vec![0.0]);
        assert!(comparator.histogram(&empty, &empty, 10).is_none());

        let single = SizeDistribution::from_sizes(1, vec![3.0]);
        assert!(comparator.histogram(&single, &single, 0).is_none());
        let hist = comparator.histogram(&single, &empty, 4).unwrap();
        assert_eq!(hist.baseline_counts, vec![0, 0, 0, 1]);
        assert_eq!(hist.other_counts, vec![0, 0, 0, 0]);
    }
}
