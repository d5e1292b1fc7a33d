// Reduction configuration
//
// Loaded from JSON; every field has a default so a file only needs to name
// what it changes. Command-line flags are applied on top by the caller.

use crate::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Which reducer a run uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReductionMode {
    /// Fold low-frequency states onto a final state they reach
    #[default]
    Prune,

    /// Collapse low-frequency states into absorbing finals
    FreqPrune,

    /// Merge states of similar frequency
    Merge,
}

impl ReductionMode {
    /// Tag used in report file names
    pub fn tag(&self) -> &'static str {
        match self {
            ReductionMode::Prune => "p",
            ReductionMode::FreqPrune => "fp",
            ReductionMode::Merge => "m",
        }
    }
}

impl std::str::FromStr for ReductionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "prune" | "p" => Ok(ReductionMode::Prune),
            "freq-prune" | "fp" => Ok(ReductionMode::FreqPrune),
            "merge" | "m" => Ok(ReductionMode::Merge),
            other => Err(format!("unknown reduction mode '{}'", other)),
        }
    }
}

/// Where state frequencies come from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrainingSource {
    /// Precomputed `state count` lines
    FrequencyFile(PathBuf),

    /// Newline-delimited training payloads
    Payloads(PathBuf),
}

impl TrainingSource {
    pub fn path(&self) -> &Path {
        match self {
            TrainingSource::FrequencyFile(path) | TrainingSource::Payloads(path) => path,
        }
    }
}

/// Reduction run configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReductionConfig {
    /// Fraction of states to keep
    pub ratio: f64,

    pub mode: ReductionMode,

    /// Minimum similarity for merging
    pub threshold: f64,

    /// Relative frequency above which states are never merged
    pub max_frequency_ratio: f64,

    /// Concurrent evaluation workers
    pub workers: usize,

    pub training: Option<TrainingSource>,

    /// Test payload files for evaluation
    pub test_samples: Vec<PathBuf>,

    /// Reduced automaton output path
    pub output: PathBuf,

    /// Directory for report files
    pub results_dir: PathBuf,
}

impl Default for ReductionConfig {
    fn default() -> Self {
        let cpus = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        Self {
            ratio: 0.2,
            mode: ReductionMode::default(),
            threshold: 0.995,
            max_frequency_ratio: 0.1,
            workers: cpus.saturating_sub(1).max(1),
            training: None,
            test_samples: Vec::new(),
            output: PathBuf::from("output.fa"),
            results_dir: PathBuf::from("results"),
        }
    }
}

impl ReductionConfig {
    /// Load a configuration from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> EngineResult<Self> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| EngineError::Io(path.to_path_buf(), e))?;
        let config: ReductionConfig =
            serde_json::from_str(&content).map_err(|e| EngineError::Json(path.to_path_buf(), e))?;
        debug!(path = %path.display(), mode = ?config.mode, "Loaded reduction config");
        Ok(config)
    }

    /// Reject configurations no reducer can run with
    pub fn validate(&self) -> EngineResult<()> {
        if self.training.is_none() {
            return Err(EngineError::Config(format!(
                "training data is required for {:?} reduction",
                self.mode
            )));
        }
        if !self.ratio.is_finite() || self.ratio <= 0.0 || self.ratio > 1.0 {
            return Err(EngineError::Config(format!(
                "ratio must be in (0, 1], got {}",
                self.ratio
            )));
        }
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(EngineError::Config(format!(
                "threshold must be in [0, 1], got {}",
                self.threshold
            )));
        }
        if !(0.0..=1.0).contains(&self.max_frequency_ratio) {
            return Err(EngineError::Config(format!(
                "max frequency ratio must be in [0, 1], got {}",
                self.max_frequency_ratio
            )));
        }
        if self.workers == 0 {
            return Err(EngineError::Config(
                "at least one worker is required".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn valid_config() -> ReductionConfig {
        ReductionConfig {
            training: Some(TrainingSource::Payloads(PathBuf::from("train.txt"))),
            ..Default::default()
        }
    }

    #[test]
    fn test_default_config() {
        let config = ReductionConfig::default();
        assert_eq!(config.ratio, 0.2);
        assert_eq!(config.threshold, 0.995);
        assert_eq!(config.max_frequency_ratio, 0.1);
        assert_eq!(config.mode, ReductionMode::Prune);
        assert!(config.workers >= 1);
        assert_eq!(config.output, PathBuf::from("output.fa"));
    }

    #[test]
    fn test_mode_tags() {
        assert_eq!(ReductionMode::Prune.tag(), "p");
        assert_eq!(ReductionMode::FreqPrune.tag(), "fp");
        assert_eq!("freq-prune".parse::<ReductionMode>().unwrap(), ReductionMode::FreqPrune);
        assert!("armc".parse::<ReductionMode>().is_err());
    }

    #[test]
    fn test_validate() {
        assert!(valid_config().validate().is_ok());
        assert!(ReductionConfig::default().validate().is_err());

        let invalid = [
            ReductionConfig { ratio: 0.0, ..valid_config() },
            ReductionConfig { ratio: 1.5, ..valid_config() },
            ReductionConfig { threshold: 1.01, ..valid_config() },
            ReductionConfig { max_frequency_ratio: -0.5, ..valid_config() },
            ReductionConfig { workers: 0, ..valid_config() },
        ];
        for config in invalid {
            assert!(matches!(config.validate(), Err(EngineError::Config(_))));
        }
    }

    #[test]
    fn test_merge_requires_training() {
        let config = ReductionConfig {
            mode: ReductionMode::Merge,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("training"));
    }

    #[test]
    fn test_load_partial_json() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"ratio": 0.5, "mode": "merge", "training": {{"frequency_file": "train.freq"}}}}"#
        )
        .unwrap();

        let config = ReductionConfig::load(file.path()).unwrap();
        assert_eq!(config.ratio, 0.5);
        assert_eq!(config.mode, ReductionMode::Merge);
        assert_eq!(
            config.training,
            Some(TrainingSource::FrequencyFile(PathBuf::from("train.freq")))
        );
        assert_eq!(config.threshold, 0.995);
    }

    #[test]
    fn test_load_invalid_json() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        assert!(matches!(
            ReductionConfig::load(file.path()),
            Err(EngineError::Json(_, _))
        ));
    }
}
