//! Run identification from log file names
//!
//! Log files are named `{dataset}_{phase}_{method}_p{P}[_m{GB}gb][_{trial}].{ext}`, where
//! `ext` is the configured log extension. The name is the only place the experiment configuration is recorded, so it is parsed with an
//! explicit grammar and every rejection is reported with its reason.

use crate::config::AnalysisConfig;
use crate::Method;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Engine phase a run log belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Preprocess,
    Pagerank,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Preprocess => write!(f, "preprocess"),
            Phase::Pagerank => write!(f, "pagerank"),
        }
    }
}

/// Identifies one experiment configuration.
///
/// `memory_gb == 0` marks a preprocessing run, for which the memory budget does not
/// apply. Field order is the report sort order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RunKey {
    pub dataset: String,
    pub method: Method,
    pub parallelism: u32,
    pub memory_gb: u32,
}

impl RunKey {
    pub fn is_preprocessing(&self) -> bool {
        self.memory_gb == 0
    }

    pub fn phase(&self) -> Phase {
        if self.is_preprocessing() {
            Phase::Preprocess
        } else {
            Phase::Pagerank
        }
    }

    /// Key of the preprocessing run this configuration depends on.
    pub fn preprocessing_key(&self) -> RunKey {
        RunKey {
            memory_gb: 0,
            ..self.clone()
        }
    }
}

impl std::fmt::Display for RunKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/p{}", self.dataset, self.method, self.parallelism)?;
        if !self.is_preprocessing() {
            write!(f, "/m{}gb", self.memory_gb)?;
        }
        Ok(())
    }
}

/// Reasons a log file name does not identify a run.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunNameError {
    #[error("file name does not match {{dataset}}_{{phase}}_{{method}}_p{{P}}[_m{{GB}}gb][_{{trial}}].{{ext}}")]
    Malformed,

    #[error("unrecognized phase '{0}'")]
    UnknownPhase(String),

    #[error("unrecognized method '{0}'")]
    UnknownMethod(String),

    #[error("parallelism must be positive")]
    ZeroParallelism,

    #[error("number out of range: {0}")]
    NumberOutOfRange(String),

    #[error("pagerank run has no _m<GB>gb memory budget")]
    MissingMemoryBudget,

    #[error("pagerank run has a zero memory budget")]
    ZeroMemoryBudget,
}

// A trailing `_{trial}` number tells repeated runs of one configuration apart and is
// not part of the key.
const RUN_NAME_STEM: &str = r"^(?P<dataset>[^_]+)_(?P<phase>[^_]+)_(?P<method>.+)_p(?P<parallelism>\d+)(?:_m(?P<memory>\d+)gb)?(?:_(?P<trial>\d+))?";

/// Parses run log file names into `RunKey`s.
#[derive(Debug, Clone)]
pub struct RunNameParser {
    pattern: Regex,
}

impl RunNameParser {
    /// Parser for names ending in `.{extension}`.
    pub fn new(extension: &str) -> Self {
        let pattern = format!(r"{}\.{}$", RUN_NAME_STEM, regex::escape(extension));
        Self {
            pattern: Regex::new(&pattern).expect("escaped extension keeps the pattern valid"),
        }
    }

    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self::new(&config.log_extension)
    }

    /// Derive the run key from a file name (without directory).
    pub fn parse(&self, file_name: &str) -> Result<RunKey, RunNameError> {
        let caps = self
            .pattern
            .captures(file_name)
            .ok_or(RunNameError::Malformed)?;

        let phase = match &caps["phase"] {
            "preprocess" => Phase::Preprocess,
            "pagerank" => Phase::Pagerank,
            other => return Err(RunNameError::UnknownPhase(other.to_string())),
        };

        let method: Method = caps["method"]
            .parse()
            .map_err(RunNameError::UnknownMethod)?;

        let parallelism = parse_u32(&caps["parallelism"])?;
        if parallelism == 0 {
            return Err(RunNameError::ZeroParallelism);
        }

        let memory_gb = match phase {
            // A budget in a preprocessing name is ignored; preprocessing is memory-agnostic
            Phase::Preprocess => 0,
            Phase::Pagerank => {
                let raw = caps
                    .name("memory")
                    .ok_or(RunNameError::MissingMemoryBudget)?;
                let memory = parse_u32(raw.as_str())?;
                if memory == 0 {
                    return Err(RunNameError::ZeroMemoryBudget);
                }
                memory
            }
        };

        Ok(RunKey {
            dataset: caps["dataset"].to_string(),
            method,
            parallelism,
            memory_gb,
        })
    }
}

impl Default for RunNameParser {
    fn default() -> Self {
        Self::from_config(&AnalysisConfig::default())
    }
}

fn parse_u32(digits: &str) -> Result<u32, RunNameError> {
    digits
        .parse()
        .map_err(|_| RunNameError::NumberOutOfRange(digits.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(dataset: &str, method: Method, p: u32, m: u32) -> RunKey {
        RunKey {
            dataset: dataset.to_string(),
            method,
            parallelism: p,
            memory_gb: m,
        }
    }

    #[test]
    fn test_parse_pagerank() {
        let parser = RunNameParser::default();
        assert_eq!(
            parser.parse("twitter_pagerank_degree_aware_p16_m32gb.log"),
            Ok(key("twitter", Method::DegreeAware, 16, 32))
        );
        assert_eq!(
            parser.parse("LiveJournal_pagerank_baseline_p4_m8gb.log"),
            Ok(key("LiveJournal", Method::Baseline, 4, 8))
        );
        assert_eq!(
            parser.parse("twitter_pagerank_dv_p16_m2gb.log"),
            Ok(key("twitter", Method::DegreeAware, 16, 2))
        );
    }

    #[test]
    fn test_parse_preprocess() {
        let parser = RunNameParser::default();
        let k = parser.parse("twitter_preprocess_baseline_p16.log").unwrap();
        assert_eq!(k, key("twitter", Method::Baseline, 16, 0));
        assert!(k.is_preprocessing());
        assert_eq!(k.phase(), Phase::Preprocess);

        let k = parser.parse("twitter_preprocess_dv_p16_m8gb.log").unwrap();
        assert_eq!(k.memory_gb, 0);
    }

    #[test]
    fn test_rejections() {
        let parser = RunNameParser::default();
        assert_eq!(parser.parse("notes.log"), Err(RunNameError::Malformed));
        assert_eq!(
            parser.parse("twitter_pagerank_baseline_p16_m32gb.txt"),
            Err(RunNameError::Malformed)
        );
        assert_eq!(
            parser.parse("twitter_bfs_baseline_p16_m32gb.log"),
            Err(RunNameError::UnknownPhase("bfs".into()))
        );
        assert_eq!(
            parser.parse("twitter_pagerank_hybrid_p16_m32gb.log"),
            Err(RunNameError::UnknownMethod("hybrid".into()))
        );
        assert_eq!(
            parser.parse("twitter_pagerank_baseline_p0_m32gb.log"),
            Err(RunNameError::ZeroParallelism)
        );
        assert_eq!(
            parser.parse("twitter_pagerank_baseline_p16.log"),
            Err(RunNameError::MissingMemoryBudget)
        );
        assert_eq!(
            parser.parse("twitter_pagerank_baseline_p16_m0gb.log"),
            Err(RunNameError::ZeroMemoryBudget)
        );
        assert!(matches!(
            parser.parse("twitter_pagerank_baseline_p99999999999_m8gb.log"),
            Err(RunNameError::NumberOutOfRange(_))
        ));
    }

    #[test]
    fn test_configured_extension() {
        let parser = RunNameParser::new("txt");
        assert_eq!(
            parser.parse("tw_pagerank_baseline_p2_m8gb.txt"),
            Ok(key("tw", Method::Baseline, 2, 8))
        );
        assert_eq!(
            parser.parse("tw_pagerank_baseline_p2_m8gb.log"),
            Err(RunNameError::Malformed)
        );
        // The dot in a compound extension is literal
        let parser = RunNameParser::new("out.log");
        assert!(parser.parse("tw_preprocess_dv_p2.out.log").is_ok());
        assert_eq!(
            parser.parse("tw_preprocess_dv_p2.outxlog"),
            Err(RunNameError::Malformed)
        );
    }

    #[test]
    fn test_trial_suffix_is_not_part_of_key() {
        let parser = RunNameParser::default();
        assert_eq!(
            parser.parse("twitter_pagerank_dv_p16_m32gb_2.log"),
            Ok(key("twitter", Method::DegreeAware, 16, 32))
        );
        assert_eq!(
            parser.parse("twitter_preprocess_baseline_p16_3.log"),
            Ok(key("twitter", Method::Baseline, 16, 0))
        );
        assert_eq!(
            parser.parse("twitter_pagerank_baseline_p16_2.log"),
            Err(RunNameError::MissingMemoryBudget)
        );
    }

    #[test]
    fn test_preprocessing_key_and_display() {
        let k = key("twitter", Method::DegreeAware, 16, 32);
        assert_eq!(k.to_string(), "twitter/degree_aware/p16/m32gb");
        let pre = k.preprocessing_key();
        assert_eq!(pre, key("twitter", Method::DegreeAware, 16, 0));
        assert_eq!(pre.to_string(), "twitter/degree_aware/p16");
    }

    #[test]
    fn test_key_ordering() {
        let mut keys = vec![
            key("twitter", Method::Baseline, 16, 8),
            key("LiveJournal", Method::DegreeAware, 4, 8),
            key("LiveJournal", Method::Baseline, 4, 16),
            key("LiveJournal", Method::Baseline, 4, 8),
        ];
        keys.sort();
        assert_eq!(keys[0], key("LiveJournal", Method::Baseline, 4, 8));
        assert_eq!(keys[1], key("LiveJournal", Method::Baseline, 4, 16));
        assert_eq!(keys[2], key("LiveJournal", Method::DegreeAware, 4, 8));
        assert_eq!(keys[3], key("twitter", Method::Baseline, 16, 8));
    }
}
