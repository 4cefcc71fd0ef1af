//! Timing metrics and log line classification
//!
//! The graph engine prints free-form progress lines; only a handful of them carry a
//! phase timing of the form `... <phrase> ... <value> seconds`. This module maps such
//! lines onto a closed set of metrics.

use regex::Regex;
use serde::{Deserialize, Serialize};

/// A timing metric reported by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TimingMetric {
    /// Preprocessing: degree calculation phase (degree-aware only)
    PreDegreeCalc,
    /// Preprocessing: edge grid generation
    PreGridGen,
    /// PageRank: degree computation or degree file load
    PrDegreeSetup,
    /// PageRank: iteration time
    PrIteration,
}

impl TimingMetric {
    pub const ALL: [TimingMetric; 4] = [
        TimingMetric::PreDegreeCalc,
        TimingMetric::PreGridGen,
        TimingMetric::PrDegreeSetup,
        TimingMetric::PrIteration,
    ];

    /// Canonical metric name.
    pub fn name(&self) -> &'static str {
        match self {
            TimingMetric::PreDegreeCalc => "preprocessing-degree-calc-time",
            TimingMetric::PreGridGen => "preprocessing-grid-generation-time",
            TimingMetric::PrDegreeSetup => "pagerank-degree-setup-time",
            TimingMetric::PrIteration => "pagerank-iteration-time",
        }
    }
}

impl std::fmt::Display for TimingMetric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Sparse set of timings extracted from one run log, in seconds.
///
/// A metric the log never mentioned stays `None`; defaults are applied only at
/// aggregation time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pre_degree_calc: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pre_grid_gen: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pr_degree_setup: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pr_iteration: Option<f64>,
}

impl MetricRecord {
    pub fn get(&self, metric: TimingMetric) -> Option<f64> {
        match metric {
            TimingMetric::PreDegreeCalc => self.pre_degree_calc,
            TimingMetric::PreGridGen => self.pre_grid_gen,
            TimingMetric::PrDegreeSetup => self.pr_degree_setup,
            TimingMetric::PrIteration => self.pr_iteration,
        }
    }

    /// Store a value, replacing any earlier one.
    pub fn set(&mut self, metric: TimingMetric, value: f64) {
        *self.slot_mut(metric) = Some(value);
    }

    /// Value of `metric`, or 0.0 when it was never recorded.
    pub fn get_or_zero(&self, metric: TimingMetric) -> f64 {
        self.get(metric).unwrap_or(0.0)
    }

    pub fn is_empty(&self) -> bool {
        TimingMetric::ALL.iter().all(|m| self.get(*m).is_none())
    }

    /// Recorded metrics in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (TimingMetric, f64)> + '_ {
        TimingMetric::ALL
            .iter()
            .filter_map(move |m| self.get(*m).map(|v| (*m, v)))
    }

    /// Per-metric mean over the records that recorded it.
    ///
    /// A record lacking a metric does not count toward that metric's mean; a metric no
    /// record carries stays `None`.
    pub fn average<'a>(records: impl IntoIterator<Item = &'a MetricRecord>) -> MetricRecord {
        let mut sums = [0.0f64; 4];
        let mut counts = [0usize; 4];
        for record in records {
            for (idx, metric) in TimingMetric::ALL.iter().enumerate() {
                if let Some(v) = record.get(*metric) {
                    sums[idx] += v;
                    counts[idx] += 1;
                }
            }
        }

        let mut out = MetricRecord::default();
        for (idx, metric) in TimingMetric::ALL.iter().enumerate() {
            if counts[idx] > 0 {
                out.set(*metric, sums[idx] / counts[idx] as f64);
            }
        }
        out
    }

    fn slot_mut(&mut self, metric: TimingMetric) -> &mut Option<f64> {
        match metric {
            TimingMetric::PreDegreeCalc => &mut self.pre_degree_calc,
            TimingMetric::PreGridGen => &mut self.pre_grid_gen,
            TimingMetric::PrDegreeSetup => &mut self.pr_degree_setup,
            TimingMetric::PrIteration => &mut self.pr_iteration,
        }
    }
}

/// A phrase marker: every needle must occur in the line, in any order.
struct PhraseMarker {
    needles: &'static [&'static str],
    metric: TimingMetric,
}

/// Markers are tried in order; the first one whose needles all occur wins.
///
/// "degree calculation used" and "degree read used" both map to the degree setup
/// metric: the engine either computes degrees or loads them from a previous
/// preprocessing pass, and the two are reported as one phase.
const PHRASE_MARKERS: &[PhraseMarker] = &[
    PhraseMarker {
        needles: &["Phase 1 (Degree Calculation) took"],
        metric: TimingMetric::PreDegreeCalc,
    },
    PhraseMarker {
        needles: &["it takes", "generate edge grid"],
        metric: TimingMetric::PreGridGen,
    },
    PhraseMarker {
        needles: &["degree calculation used"],
        metric: TimingMetric::PrDegreeSetup,
    },
    PhraseMarker {
        needles: &["degree read used"],
        metric: TimingMetric::PrDegreeSetup,
    },
    PhraseMarker {
        needles: &["iterations of pagerank took"],
        metric: TimingMetric::PrIteration,
    },
];

const SECONDS_PATTERN: &str = r"(\d+\.?\d*)\s+seconds";

/// Classifies a single log line into a timing metric.
#[derive(Debug, Clone)]
pub struct MetricLineClassifier {
    seconds: Regex,
}

impl MetricLineClassifier {
    pub fn new() -> Self {
        Self {
            seconds: Regex::new(SECONDS_PATTERN).expect("seconds pattern is valid"),
        }
    }

    /// Classify one line, returning the metric and its value in seconds.
    ///
    /// Lines without a `<number> seconds` value or without a known phrase are rejected.
    pub fn classify(&self, line: &str) -> Option<(TimingMetric, f64)> {
        let caps = self.seconds.captures(line)?;
        let value: f64 = caps.get(1)?.as_str().parse().ok()?;

        PHRASE_MARKERS
            .iter()
            .find(|marker| marker.needles.iter().all(|needle| line.contains(needle)))
            .map(|marker| (marker.metric, value))
    }
}

impl Default for MetricLineClassifier {
    fn default() -> Self {
        Self::new()
    }
}
