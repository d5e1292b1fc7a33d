// Shrike Automaton - NFA model shared by the reducers and the evaluator
//
// This crate owns the automaton representation used by every other Shrike
// crate. It handles:
// - States, alphabet, transition function, initial and final states
// - Structural queries (depth, successors, final-state predecessors)
// - Quotient merging through a representative mapping
// - The `.fa` text format
// - Payload simulation and per-state frequency labeling

mod automaton;
mod format;
mod freq;
mod payload;
mod state;

pub use automaton::{Automaton, StateMapping, StateTransitions};
pub use freq::FrequencyMap;
pub use payload::read_payloads;
pub use state::{StateId, Symbol};

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while building, reading or mutating an automaton
#[derive(Debug, Error)]
pub enum AutomatonError {
    #[error("IO error accessing {0:?}: {1}")]
    Io(PathBuf, std::io::Error),

    #[error("Parse error at line {line}: {reason}")]
    Parse { line: usize, reason: String },

    #[error("Unknown state: {0}")]
    UnknownState(StateId),

    #[error("Missing frequency for state {0}")]
    MissingFrequency(StateId),

    #[error("Initial state {0} cannot be removed or merged away")]
    InitialState(StateId),

    #[error("Merge mapping is not idempotent: {state} -> {representative} -> {next}")]
    NonIdempotentMapping {
        state: StateId,
        representative: StateId,
        next: StateId,
    },
}

/// Result type for automaton operations
pub type AutomatonResult<T> = Result<T, AutomatonError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AutomatonError::MissingFrequency(StateId(7));
        assert!(err.to_string().contains('7'));

        let err = AutomatonError::Parse {
            line: 3,
            reason: "bad symbol".to_string(),
        };
        assert!(err.to_string().contains("line 3"));
    }
}
