//! Block file scanning
//!
//! A P×P grid partition is stored as one file per cell, `block-{i}-{j}`, holding a flat
//! sequence of fixed-width edge records. The edge count of a cell is its file size
//! divided by the record width; a missing file is an empty cell.

use crate::config::{AnalysisConfig, ConfigError};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Block scanning errors
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Grid directory not found: {0}")]
    DirectoryNotFound(PathBuf),

    #[error("Invalid grid dimension: {0}")]
    InvalidGridDimension(u32),

    #[error("Edge records of {0} bytes cannot hold two u32 vertex ids")]
    RecordTooNarrow(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Position of a block in the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockCoordinate {
    pub row: u32,
    pub col: u32,
}

impl BlockCoordinate {
    pub fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }

    /// All P² coordinates in row-major order.
    pub fn grid(p: u32) -> impl Iterator<Item = BlockCoordinate> {
        (0..p).flat_map(move |row| (0..p).map(move |col| BlockCoordinate { row, col }))
    }

    /// Row-major index within a P×P grid.
    pub fn index(&self, p: u32) -> usize {
        self.row as usize * p as usize + self.col as usize
    }
}

impl std::fmt::Display for BlockCoordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// Size of one block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockStat {
    pub coordinate: BlockCoordinate,
    /// Whether the block file exists
    pub present: bool,
    /// File size in bytes, 0 when absent
    pub bytes: u64,
    /// Whole edge records in the file
    pub edges: u64,
}

/// Per-block sizes of one partition directory, row-major.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockScan {
    directory: PathBuf,
    p: u32,
    edge_bytes: u64,
    stats: Vec<BlockStat>,
}

impl BlockScan {
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn p(&self) -> u32 {
        self.p
    }

    pub fn edge_bytes(&self) -> u64 {
        self.edge_bytes
    }

    pub fn stats(&self) -> &[BlockStat] {
        &self.stats
    }

    pub fn edge_counts(&self) -> Vec<u64> {
        self.stats.iter().map(|s| s.edges).collect()
    }

    pub fn byte_sizes(&self) -> Vec<u64> {
        self.stats.iter().map(|s| s.bytes).collect()
    }

    pub fn total_edges(&self) -> u64 {
        self.stats.iter().map(|s| s.edges).sum()
    }

    pub fn get(&self, row: u32, col: u32) -> Option<&BlockStat> {
        if row >= self.p || col >= self.p {
            return None;
        }
        self.stats.get(BlockCoordinate::new(row, col).index(self.p))
    }

    /// Blocks whose size is not a whole number of edge records.
    pub fn misaligned_blocks(&self) -> usize {
        self.stats
            .iter()
            .filter(|s| s.bytes % self.edge_bytes != 0)
            .count()
    }
}

/// One decoded edge record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub src: u32,
    pub dst: u32,
}

/// Edge counts of the same block in two partitions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BlockDelta {
    pub coordinate: BlockCoordinate,
    pub baseline_edges: u64,
    pub other_edges: u64,
    /// other − baseline
    pub difference: i64,
    /// Relative to the baseline block; `None` when the baseline block is empty
    pub percent_change: Option<f64>,
}

/// One block of two partitions side by side, with the first few edges of each.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockInspection {
    pub delta: BlockDelta,
    pub baseline_path: PathBuf,
    pub other_path: PathBuf,
    pub baseline_sample: Vec<Edge>,
    pub other_sample: Vec<Edge>,
}

/// Scans partition directories.
#[derive(Debug, Clone)]
pub struct BlockFileScanner {
    edge_bytes: u64,
    prefix: String,
}

impl BlockFileScanner {
    pub const DEFAULT_SAMPLE_EDGES: usize = 5;

    /// Scanner for the configured record width and block naming.
    ///
    /// A zero record width or an empty prefix is rejected rather than replaced.
    pub fn new(config: &AnalysisConfig) -> Result<Self, ConfigError> {
        if config.edge_bytes == 0 {
            return Err(ConfigError::Invalid("edge_bytes must be positive".into()));
        }
        if config.block_prefix.is_empty() {
            return Err(ConfigError::Invalid("block_prefix must not be empty".into()));
        }
        Ok(Self {
            edge_bytes: config.edge_bytes,
            prefix: config.block_prefix.clone(),
        })
    }

    pub fn block_path(&self, dir: &Path, coordinate: BlockCoordinate) -> PathBuf {
        dir.join(format!("{}-{}-{}", self.prefix, coordinate.row, coordinate.col))
    }

    /// Size every block of a P×P grid.
    ///
    /// Lookups run in parallel; the result is always in row-major order.
    pub fn scan(&self, dir: impl AsRef<Path>, p: u32) -> Result<BlockScan, ScanError> {
        let dir = dir.as_ref();
        if p == 0 {
            return Err(ScanError::InvalidGridDimension(p));
        }
        if !dir.is_dir() {
            warn!(directory = %dir.display(), "Grid directory not found");
            return Err(ScanError::DirectoryNotFound(dir.to_path_buf()));
        }

        info!(directory = %dir.display(), p, blocks = p as u64 * p as u64, "Scanning grid");

        let coordinates: Vec<BlockCoordinate> = BlockCoordinate::grid(p).collect();
        let stats = coordinates
            .par_iter()
            .map(|coordinate| self.stat_block(dir, *coordinate))
            .collect::<Result<Vec<BlockStat>, ScanError>>()?;

        let scan = BlockScan {
            directory: dir.to_path_buf(),
            p,
            edge_bytes: self.edge_bytes,
            stats,
        };

        let misaligned = scan.misaligned_blocks();
        if misaligned > 0 {
            warn!(
                directory = %dir.display(),
                misaligned,
                edge_bytes = self.edge_bytes,
                "Block sizes not a multiple of the edge record width; trailing bytes ignored"
            );
        }
        debug!(
            directory = %dir.display(),
            total_edges = scan.total_edges(),
            "Grid scan complete"
        );

        Ok(scan)
    }

    fn stat_block(&self, dir: &Path, coordinate: BlockCoordinate) -> Result<BlockStat, ScanError> {
        let path = self.block_path(dir, coordinate);
        match std::fs::metadata(&path) {
            Ok(meta) => Ok(BlockStat {
                coordinate,
                present: true,
                bytes: meta.len(),
                edges: meta.len() / self.edge_bytes,
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(BlockStat {
                coordinate,
                present: false,
                bytes: 0,
                edges: 0,
            }),
            Err(e) => Err(ScanError::Io(e)),
        }
    }

    /// Decode up to `limit` edges from the start of a block.
    ///
    /// Records are two little-endian `u32` vertex ids. An absent block yields no edges;
    /// a truncated trailing record is ignored.
    pub fn read_edges(
        &self,
        dir: impl AsRef<Path>,
        coordinate: BlockCoordinate,
        limit: usize,
    ) -> Result<Vec<Edge>, ScanError> {
        let path = self.block_path(dir.as_ref(), coordinate);
        let file = match File::open(&path) {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(ScanError::Io(e)),
        };

        if self.edge_bytes < 8 {
            return Err(ScanError::RecordTooNarrow(self.edge_bytes));
        }
        let record_len = self.edge_bytes as usize;

        let mut reader = BufReader::new(file);
        let mut buf = vec![0u8; record_len];
        let mut edges = Vec::with_capacity(limit.min(1024));
        while edges.len() < limit {
            match reader.read_exact(&mut buf) {
                Ok(()) => edges.push(Edge {
                    src: u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]),
                    dst: u32::from_le_bytes([buf[4], buf[5], buf[6], buf[7]]),
                }),
                Err(e) if e.kind() == ErrorKind::UnexpectedEof => break,
                Err(e) => return Err(ScanError::Io(e)),
            }
        }
        Ok(edges)
    }

    /// Compare one block of two scanned grids and sample up to `sample` edges of each.
    ///
    /// Returns `Ok(None)` when the coordinate lies outside either grid.
    pub fn inspect_block(
        &self,
        baseline: &BlockScan,
        other: &BlockScan,
        coordinate: BlockCoordinate,
        sample: usize,
    ) -> Result<Option<BlockInspection>, ScanError> {
        let Some(delta) = compare_block(baseline, other, coordinate) else {
            warn!(
                %coordinate,
                baseline_p = baseline.p(),
                other_p = other.p(),
                "Block outside grid"
            );
            return Ok(None);
        };
        let baseline_sample = self.read_edges(baseline.directory(), coordinate, sample)?;
        let other_sample = self.read_edges(other.directory(), coordinate, sample)?;

        Ok(Some(BlockInspection {
            delta,
            baseline_path: self.block_path(baseline.directory(), coordinate),
            other_path: self.block_path(other.directory(), coordinate),
            baseline_sample,
            other_sample,
        }))
    }
}

impl Default for BlockFileScanner {
    fn default() -> Self {
        let config = AnalysisConfig::default();
        Self {
            edge_bytes: config.edge_bytes,
            prefix: config.block_prefix,
        }
    }
}

/// Compare one block across two scans.
///
/// Returns `None` when the coordinate lies outside either grid.
pub fn compare_block(
    baseline: &BlockScan,
    other: &BlockScan,
    coordinate: BlockCoordinate,
) -> Option<BlockDelta> {
    let base = baseline.get(coordinate.row, coordinate.col)?;
    let cand = other.get(coordinate.row, coordinate.col)?;
    let difference = cand.edges as i64 - base.edges as i64;
    let percent_change = if base.edges > 0 {
        Some(difference as f64 / base.edges as f64 * 100.0)
    } else {
        None
    };
    Some(BlockDelta {
        coordinate,
        baseline_edges: base.edges,
        other_edges: cand.edges,
        difference,
        percent_change,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_block(dir: &Path, row: u32, col: u32, bytes: usize) {
        std::fs::write(dir.join(format!("block-{}-{}", row, col)), vec![0u8; bytes]).unwrap();
    }

    #[test]
    fn test_grid_is_row_major() {
        let coords: Vec<(u32, u32)> = BlockCoordinate::grid(2).map(|c| (c.row, c.col)).collect();
        assert_eq!(coords, vec![(0, 0), (0, 1), (1, 0), (1, 1)]);
        assert_eq!(BlockCoordinate::new(1, 0).index(2), 2);
    }

    #[test]
    fn test_scan_counts_absent_blocks_as_empty() {
        let temp_dir = TempDir::new().unwrap();
        write_block(temp_dir.path(), 0, 0, 800);
        write_block(temp_dir.path(), 1, 0, 1600);
        write_block(temp_dir.path(), 1, 1, 400);

        let scan = BlockFileScanner::default().scan(temp_dir.path(), 2).unwrap();
        assert_eq!(scan.edge_counts(), vec![100, 0, 200, 50]);
        assert_eq!(scan.total_edges(), 350);
        assert!(!scan.get(0, 1).unwrap().present);
        assert!(scan.get(2, 0).is_none());
        assert_eq!(scan.misaligned_blocks(), 0);
    }

    #[test]
    fn test_scan_floors_partial_records() {
        let temp_dir = TempDir::new().unwrap();
        write_block(temp_dir.path(), 0, 0, 20);

        let scan = BlockFileScanner::default().scan(temp_dir.path(), 1).unwrap();
        assert_eq!(scan.edge_counts(), vec![2]);
        assert_eq!(scan.byte_sizes(), vec![20]);
        assert_eq!(scan.misaligned_blocks(), 1);
    }

    #[test]
    fn test_scan_custom_edge_width() {
        let temp_dir = TempDir::new().unwrap();
        write_block(temp_dir.path(), 0, 0, 120);

        let config = AnalysisConfig::default().with_edge_bytes(12);
        let scan = BlockFileScanner::new(&config)
            .unwrap()
            .scan(temp_dir.path(), 1)
            .unwrap();
        assert_eq!(scan.edge_counts(), vec![10]);
    }

    #[test]
    fn test_invalid_layout_rejected() {
        let zero_width = AnalysisConfig::default().with_edge_bytes(0);
        assert!(matches!(
            BlockFileScanner::new(&zero_width),
            Err(ConfigError::Invalid(_))
        ));

        let mut no_prefix = AnalysisConfig::default();
        no_prefix.block_prefix.clear();
        assert!(BlockFileScanner::new(&no_prefix).is_err());
    }

    #[test]
    fn test_scan_errors() {
        let temp_dir = TempDir::new().unwrap();
        let scanner = BlockFileScanner::default();
        assert!(matches!(
            scanner.scan(temp_dir.path(), 0),
            Err(ScanError::InvalidGridDimension(0))
        ));
        assert!(matches!(
            scanner.scan(temp_dir.path().join("missing"), 2),
            Err(ScanError::DirectoryNotFound(_))
        ));
    }

    #[test]
    fn test_read_edges_little_endian() {
        let temp_dir = TempDir::new().unwrap();
        let mut bytes = Vec::new();
        for (src, dst) in [(1u32, 2u32), (70000, 3), (4, 0xdead_beef)] {
            bytes.extend_from_slice(&src.to_le_bytes());
            bytes.extend_from_slice(&dst.to_le_bytes());
        }
        bytes.extend_from_slice(&[9, 9, 9]);
        std::fs::write(temp_dir.path().join("block-0-1"), bytes).unwrap();

        let scanner = BlockFileScanner::default();
        let edges = scanner
            .read_edges(temp_dir.path(), BlockCoordinate::new(0, 1), 10)
            .unwrap();
        assert_eq!(edges.len(), 3);
        assert_eq!(edges[1], Edge { src: 70000, dst: 3 });
        assert_eq!(edges[2].dst, 0xdead_beef);

        let first = scanner
            .read_edges(temp_dir.path(), BlockCoordinate::new(0, 1), 1)
            .unwrap();
        assert_eq!(first, vec![Edge { src: 1, dst: 2 }]);

        let absent = scanner
            .read_edges(temp_dir.path(), BlockCoordinate::new(1, 1), 5)
            .unwrap();
        assert!(absent.is_empty());
    }

    #[test]
    fn test_compare_block() {
        let base_dir = TempDir::new().unwrap();
        let dv_dir = TempDir::new().unwrap();
        write_block(base_dir.path(), 0, 0, 800);
        write_block(dv_dir.path(), 0, 0, 400);
        write_block(dv_dir.path(), 0, 1, 80);

        let scanner = BlockFileScanner::default();
        let base = scanner.scan(base_dir.path(), 2).unwrap();
        let dv = scanner.scan(dv_dir.path(), 2).unwrap();

        let delta = compare_block(&base, &dv, BlockCoordinate::new(0, 0)).unwrap();
        assert_eq!(delta.difference, -50);
        assert_eq!(delta.percent_change, Some(-50.0));

        let delta = compare_block(&base, &dv, BlockCoordinate::new(0, 1)).unwrap();
        assert_eq!(delta.difference, 10);
        assert_eq!(delta.percent_change, None);

        assert!(compare_block(&base, &dv, BlockCoordinate::new(5, 5)).is_none());
    }

    #[test]
    fn test_inspect_block_samples_edges() {
        let base_dir = TempDir::new().unwrap();
        let dv_dir = TempDir::new().unwrap();
        let mut bytes = Vec::new();
        for v in 0u32..8 {
            bytes.extend_from_slice(&v.to_le_bytes());
            bytes.extend_from_slice(&(v + 100).to_le_bytes());
        }
        std::fs::write(base_dir.path().join("block-1-0"), &bytes).unwrap();
        std::fs::write(dv_dir.path().join("block-1-0"), &bytes[..16]).unwrap();

        let scanner = BlockFileScanner::default();
        let base = scanner.scan(base_dir.path(), 2).unwrap();
        let dv = scanner.scan(dv_dir.path(), 3).unwrap();

        let inspection = scanner
            .inspect_block(&base, &dv, BlockCoordinate::new(1, 0), 5)
            .unwrap()
            .unwrap();
        assert_eq!(inspection.delta.baseline_edges, 8);
        assert_eq!(inspection.delta.other_edges, 2);
        assert_eq!(inspection.delta.percent_change, Some(-75.0));
        assert_eq!(inspection.baseline_sample.len(), 5);
        assert_eq!(inspection.baseline_sample[4], Edge { src: 4, dst: 104 });
        assert_eq!(
            inspection.other_sample,
            vec![Edge { src: 0, dst: 100 }, Edge { src: 1, dst: 101 }]
        );
        assert!(inspection.other_path.ends_with("block-1-0"));

        // Row 2 exists only in the 3×3 grid
        assert!(scanner
            .inspect_block(&base, &dv, BlockCoordinate::new(2, 0), 5)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_read_edges_needs_full_record() {
        let temp_dir = TempDir::new().unwrap();
        write_block(temp_dir.path(), 0, 0, 16);
        let config = AnalysisConfig::default().with_edge_bytes(4);
        let scanner = BlockFileScanner::new(&config).unwrap();
        assert!(matches!(
            scanner.read_edges(temp_dir.path(), BlockCoordinate::new(0, 0), 1),
            Err(ScanError::RecordTooNarrow(4))
        ));
    }
}
