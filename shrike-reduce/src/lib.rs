// Shrike Reduce - Approximate NFA reduction
//
// This crate implements the reduction engine:
// - Reachability analysis from the initial state
// - Pruning (collapse low-frequency states into absorbing finals, or fold
//   them onto the final state they lead to)
// - Merging of low-traffic states with statistically similar frequencies
// - Union-find merge mappings used to resolve transitive merges

mod merge;
mod prune;
mod reachability;
mod union_find;

pub use merge::{merge, similarity, MergeOutcome, Merger};
pub use prune::{prune, target_count, PruneOutcome, PrunePolicy, Pruner};
pub use reachability::{reachable, remove_unreachable, unreachable};
pub use union_find::{Class, MergeMap};

use shrike_automaton::{AutomatonError, StateId};
use thiserror::Error;

/// Errors that can occur during reduction
#[derive(Debug, Error)]
pub enum ReduceError {
    #[error("Invalid reduction configuration: {0}")]
    Config(String),

    #[error("Reduction infeasible: ranked states exhausted at {reached} states (target: {target})")]
    Infeasible { target: usize, reached: usize },

    #[error("State {0} cannot reach any final state")]
    NoReachableFinal(StateId),

    #[error("Invariant violated: {0}")]
    Invariant(String),

    #[error(transparent)]
    Automaton(#[from] AutomatonError),
}

/// Result type for reduction operations
pub type ReduceResult<T> = Result<T, ReduceError>;
