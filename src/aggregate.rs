//! Run aggregation
//!
//! Groups parsed run logs by configuration, averages repeated trials and joins each
//! PageRank configuration with the preprocessing run it depends on, producing one
//! end-to-end timing row per (dataset, method, P, memory budget).

use crate::config::AnalysisConfig;
use crate::log_parser::ParsedLog;
use crate::metrics::{MetricRecord, TimingMetric};
use crate::run_key::{RunKey, RunNameError, RunNameParser};
use crate::Method;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{info, warn};

/// Aggregation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AggregationError {
    #[error("No run logs with a recognizable file name")]
    NoRuns,
}

/// One end-to-end timing row, in seconds.
///
/// Serialized with the column names the spreadsheet and chart collaborators expect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedRow {
    #[serde(rename = "Dataset")]
    pub dataset: String,
    #[serde(rename = "Method")]
    pub method: Method,
    #[serde(rename = "P")]
    pub parallelism: u32,
    #[serde(rename = "Memory(GB)")]
    pub memory_gb: u32,
    #[serde(rename = "T_End_to_End(s)")]
    pub end_to_end: f64,
    #[serde(rename = "T_Pre_Total(s)")]
    pub pre_total: f64,
    #[serde(rename = "T_PR_Total(s)")]
    pub algo_total: f64,
    #[serde(rename = "T_Pre_DegCalc(s)")]
    pub pre_degcalc: f64,
    #[serde(rename = "T_Pre_GridGen(s)")]
    pub pre_gridgen: f64,
    #[serde(rename = "T_PR_DegSetup(s)")]
    pub algo_degsetup: f64,
    #[serde(rename = "T_PR_Iter(s)")]
    pub algo_iter: f64,
    /// Preprocessing logs averaged into this row (0 when none was found)
    pub preprocess_trials: usize,
    /// PageRank logs averaged into this row
    pub pagerank_trials: usize,
}

impl AggregatedRow {
    /// Combine averaged preprocessing and PageRank metrics.
    ///
    /// Baseline preprocessing has no degree calculation phase, so any degree
    /// calculation time recorded for it is excluded.
    pub fn compose(
        key: &RunKey,
        preprocess: &MetricRecord,
        pagerank: &MetricRecord,
        preprocess_trials: usize,
        pagerank_trials: usize,
    ) -> Self {
        let pre_degcalc = if key.method.computes_degrees() {
            preprocess.get_or_zero(TimingMetric::PreDegreeCalc)
        } else {
            0.0
        };
        let pre_gridgen = preprocess.get_or_zero(TimingMetric::PreGridGen);
        let algo_degsetup = pagerank.get_or_zero(TimingMetric::PrDegreeSetup);
        let algo_iter = pagerank.get_or_zero(TimingMetric::PrIteration);

        let pre_total = pre_degcalc + pre_gridgen;
        let algo_total = algo_degsetup + algo_iter;

        Self {
            dataset: key.dataset.clone(),
            method: key.method,
            parallelism: key.parallelism,
            memory_gb: key.memory_gb,
            end_to_end: pre_total + algo_total,
            pre_total,
            algo_total,
            pre_degcalc,
            pre_gridgen,
            algo_degsetup,
            algo_iter,
            preprocess_trials,
            pagerank_trials,
        }
    }

    pub fn key(&self) -> RunKey {
        RunKey {
            dataset: self.dataset.clone(),
            method: self.method,
            parallelism: self.parallelism,
            memory_gb: self.memory_gb,
        }
    }
}

/// A log file that did not contribute to the report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedLog {
    pub file_name: String,
    pub reason: RunNameError,
}

/// Baseline vs degree-aware end-to-end time for one configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodComparison {
    pub dataset: String,
    pub parallelism: u32,
    pub memory_gb: u32,
    pub baseline_end_to_end: Option<f64>,
    pub degree_aware_end_to_end: Option<f64>,
    /// baseline / degree-aware; above 1.0 means degree-aware is faster
    pub speedup: Option<f64>,
}

/// Aggregated timing table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateReport {
    /// Sorted by (dataset, method, P, memory budget)
    pub rows: Vec<AggregatedRow>,
    pub skipped: Vec<SkippedLog>,
}

impl AggregateReport {
    pub fn rows_for_dataset<'a>(
        &'a self,
        dataset: &'a str,
    ) -> impl Iterator<Item = &'a AggregatedRow> + 'a {
        self.rows.iter().filter(move |r| r.dataset == dataset)
    }

    /// Datasets present in the table, sorted.
    pub fn datasets(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.rows.iter().map(|r| r.dataset.as_str()).collect();
        names.dedup();
        names
    }

    /// Pivot end-to-end time by method for each (dataset, P, memory budget).
    pub fn method_comparison(&self) -> Vec<MethodComparison> {
        let mut pivot: BTreeMap<(&str, u32, u32), (Option<f64>, Option<f64>)> = BTreeMap::new();
        for row in &self.rows {
            let slot = pivot
                .entry((row.dataset.as_str(), row.parallelism, row.memory_gb))
                .or_default();
            match row.method {
                Method::Baseline => slot.0 = Some(row.end_to_end),
                Method::DegreeAware => slot.1 = Some(row.end_to_end),
            }
        }

        pivot
            .into_iter()
            .map(|((dataset, parallelism, memory_gb), (baseline, degree_aware))| {
                let speedup = match (baseline, degree_aware) {
                    (Some(b), Some(d)) if d > 0.0 => Some(b / d),
                    _ => None,
                };
                MethodComparison {
                    dataset: dataset.to_string(),
                    parallelism,
                    memory_gb,
                    baseline_end_to_end: baseline,
                    degree_aware_end_to_end: degree_aware,
                    speedup,
                }
            })
            .collect()
    }
}

/// Collects parsed run logs and produces the aggregated timing table.
#[derive(Debug)]
pub struct RunAggregator {
    names: RunNameParser,
    runs: BTreeMap<RunKey, Vec<MetricRecord>>,
    skipped: Vec<SkippedLog>,
}

impl RunAggregator {
    /// Aggregator recognizing run logs with the configured extension.
    pub fn new(config: &AnalysisConfig) -> Self {
        Self {
            names: RunNameParser::from_config(config),
            runs: BTreeMap::new(),
            skipped: Vec::new(),
        }
    }

    /// Build an aggregator from already parsed logs.
    pub fn from_logs<'a>(
        config: &AnalysisConfig,
        logs: impl IntoIterator<Item = &'a ParsedLog>,
    ) -> Self {
        let mut aggregator = Self::new(config);
        for log in logs {
            // Rejected names are kept in `skipped`
            aggregator.add(&log.file_name, log.record).ok();
        }
        aggregator
    }

    /// Add one log's metrics under the key derived from its file name.
    ///
    /// A file name that does not identify a run is recorded as skipped and reported.
    pub fn add(&mut self, file_name: &str, record: MetricRecord) -> Result<RunKey, RunNameError> {
        match self.names.parse(file_name) {
            Ok(key) => {
                self.runs.entry(key.clone()).or_default().push(record);
                Ok(key)
            }
            Err(reason) => {
                info!(file = %file_name, reason = %reason, "Skipping run log");
                self.skipped.push(SkippedLog {
                    file_name: file_name.to_string(),
                    reason: reason.clone(),
                });
                Err(reason)
            }
        }
    }

    /// Number of distinct configurations collected so far.
    pub fn run_count(&self) -> usize {
        self.runs.len()
    }

    pub fn skipped(&self) -> &[SkippedLog] {
        &self.skipped
    }

    /// Average trials and compose one row per PageRank configuration.
    pub fn aggregate(&self) -> Result<AggregateReport, AggregationError> {
        if self.runs.is_empty() {
            return Err(AggregationError::NoRuns);
        }

        let mut preprocessing: BTreeMap<&RunKey, (MetricRecord, usize)> = BTreeMap::new();
        for (key, records) in self.runs.iter().filter(|(k, _)| k.is_preprocessing()) {
            preprocessing.insert(key, (MetricRecord::average(records), records.len()));
        }

        let mut rows = Vec::new();
        for (key, records) in self.runs.iter().filter(|(k, _)| !k.is_preprocessing()) {
            let pagerank = MetricRecord::average(records);
            let (preprocess, preprocess_trials) = match preprocessing.get(&key.preprocessing_key()) {
                Some((avg, n)) => (*avg, *n),
                None => {
                    warn!(run = %key, "No preprocessing logs for run; preprocessing time counted as 0");
                    (MetricRecord::default(), 0)
                }
            };
            rows.push(AggregatedRow::compose(
                key,
                &preprocess,
                &pagerank,
                preprocess_trials,
                records.len(),
            ));
        }

        // BTreeMap iteration already yields keys in (dataset, method, P, memory) order
        info!(
            rows = rows.len(),
            preprocessing_groups = preprocessing.len(),
            skipped = self.skipped.len(),
            "Aggregated run logs"
        );

        Ok(AggregateReport {
            rows,
            skipped: self.skipped.clone(),
        })
    }
}

impl Default for RunAggregator {
    fn default() -> Self {
        Self::new(&AnalysisConfig::default())
    }
}
