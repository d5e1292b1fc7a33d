//! Shrike Reduction Engine
//!
//! Coordinates one reduction run: loads training frequencies, dispatches to
//! exactly one reducer, and evaluates the result against test traffic.

mod config;
mod orchestrator;

pub use config::{ReductionConfig, ReductionMode, TrainingSource};
pub use orchestrator::{Orchestrator, ReductionStatistic, ReductionStats};

use shrike_automaton::AutomatonError;
use shrike_eval::EvalError;
use shrike_reduce::ReduceError;
use std::path::PathBuf;
use thiserror::Error;

/// Engine errors
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Reduction error: {0}")]
    Reduce(#[from] ReduceError),

    #[error("Evaluation error: {0}")]
    Eval(#[from] EvalError),

    #[error("Automaton error: {0}")]
    Automaton(#[from] AutomatonError),

    #[error("IO error accessing {0:?}: {1}")]
    Io(PathBuf, std::io::Error),

    #[error("Invalid configuration file {0:?}: {1}")]
    Json(PathBuf, serde_json::Error),
}

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;
