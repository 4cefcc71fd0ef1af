//! Degree file verification
//!
//! The degree-aware partitioner writes per-vertex out- and in-degrees next to its grid
//! as flat little-endian `u32` arrays. Both arrays must describe the same vertex set
//! and each must sum to the graph's edge count.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

pub const OUT_DEGREE_FILE: &str = "out_degree_preprocess.data";
pub const IN_DEGREE_FILE: &str = "in_degree_preprocess.data";

/// Degree file errors
#[derive(Error, Debug)]
pub enum DegreeError {
    #[error("Degree file not found: {0}")]
    Missing(PathBuf),

    #[error("Degree file {path} has {len} bytes, not a multiple of 4")]
    Truncated { path: PathBuf, len: u64 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Vertex count and degree sum of one degree array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DegreeArraySummary {
    pub vertices: u64,
    pub degree_sum: u64,
    pub max_degree: u32,
}

/// Summary of a grid directory's degree files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DegreeSummary {
    pub out_degree: DegreeArraySummary,
    pub in_degree: DegreeArraySummary,
    /// Same vertex count in both files and equal degree sums
    pub consistent: bool,
}

impl DegreeSummary {
    /// Whether both degree sums equal the graph's edge count.
    pub fn matches_edges(&self, total_edges: u64) -> bool {
        self.out_degree.degree_sum == total_edges && self.in_degree.degree_sum == total_edges
    }
}

/// Read and summarize a single degree array.
pub fn summarize_file(path: impl AsRef<Path>) -> Result<DegreeArraySummary, DegreeError> {
    let path = path.as_ref();
    let bytes = match std::fs::read(path) {
        Ok(b) => b,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(DegreeError::Missing(path.to_path_buf()))
        }
        Err(e) => return Err(DegreeError::Io(e)),
    };
    if bytes.len() % 4 != 0 {
        return Err(DegreeError::Truncated {
            path: path.to_path_buf(),
            len: bytes.len() as u64,
        });
    }

    let mut degree_sum = 0u64;
    let mut max_degree = 0u32;
    for chunk in bytes.chunks_exact(4) {
        let degree = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        degree_sum += degree as u64;
        max_degree = max_degree.max(degree);
    }

    Ok(DegreeArraySummary {
        vertices: (bytes.len() / 4) as u64,
        degree_sum,
        max_degree,
    })
}

/// Summarize both degree files of a degree-aware grid directory.
pub fn summarize(dir: impl AsRef<Path>) -> Result<DegreeSummary, DegreeError> {
    let dir = dir.as_ref();
    let out_degree = summarize_file(dir.join(OUT_DEGREE_FILE))?;
    let in_degree = summarize_file(dir.join(IN_DEGREE_FILE))?;

    let consistent =
        out_degree.vertices == in_degree.vertices && out_degree.degree_sum == in_degree.degree_sum;
    if consistent {
        info!(
            directory = %dir.display(),
            vertices = out_degree.vertices,
            degree_sum = out_degree.degree_sum,
            "Degree files consistent"
        );
    } else {
        warn!(
            directory = %dir.display(),
            out_vertices = out_degree.vertices,
            in_vertices = in_degree.vertices,
            out_sum = out_degree.degree_sum,
            in_sum = in_degree.degree_sum,
            "Degree files disagree"
        );
    }

    Ok(DegreeSummary {
        out_degree,
        in_degree,
        consistent,
    })
}
