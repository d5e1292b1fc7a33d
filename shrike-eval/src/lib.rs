//! Shrike Evaluation
//!
//! Measures how a reduced automaton classifies sample traffic compared to
//! the original one, and writes the per-run error report.

mod evaluator;
mod record;
mod report;

pub use evaluator::{AccuracyEvaluator, EvalConfig, EvalRun};
pub use record::{EvalSummary, SampleRecord};
pub use report::{report_path, Report};

use shrike_automaton::AutomatonError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during evaluation
#[derive(Debug, Error)]
pub enum EvalError {
    #[error("Invalid evaluation configuration: {0}")]
    Config(String),

    #[error("IO error accessing {0:?}: {1}")]
    Io(PathBuf, std::io::Error),

    #[error("Invalid evaluation record at line {line}: {reason}")]
    Record { line: usize, reason: String },

    #[error("Evaluation of {sample:?} failed: {reason}")]
    SampleFailed { sample: PathBuf, reason: String },

    #[error("Evaluation worker failed: {0}")]
    Worker(String),

    #[error("No traffic in the evaluated samples")]
    EmptySamples,

    #[error(transparent)]
    Automaton(#[from] AutomatonError),
}

/// Result type for evaluation operations
pub type EvalResult<T> = Result<T, EvalError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = EvalError::SampleFailed {
            sample: PathBuf::from("day1.txt"),
            reason: "boom".to_string(),
        };
        assert!(err.to_string().contains("day1.txt"));
        assert!(err.to_string().contains("boom"));
    }
}
