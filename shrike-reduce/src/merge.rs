// Merging reducer
//
// Fuses low-traffic states with a successor that sees almost the same
// traffic. Candidate pairs come from one breadth-first pass over the
// automaton; pairs are joined transitively with a union-find so that every
// connected cluster collapses onto a single representative.

use crate::reachability::remove_unreachable;
use crate::union_find::MergeMap;
use crate::{ReduceError, ReduceResult};
use ahash::AHashMap;
use shrike_automaton::{Automaton, FrequencyMap, StateId};
use std::collections::VecDeque;
use tracing::{debug, info, trace};

/// Result of a merging run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    /// States eliminated by merging
    pub merged: usize,

    /// Number of clusters that were collapsed
    pub clusters: usize,

    /// Unreachable states deleted before merging
    pub swept: usize,

    /// States left in the automaton
    pub remaining: usize,
}

/// `min / max` of two frequencies, in (0, 1] for non-zero inputs
pub fn similarity(a: u64, b: u64) -> f64 {
    let (low, high) = if a <= b { (a, b) } else { (b, a) };
    if high == 0 {
        return 1.0;
    }
    low as f64 / high as f64
}

/// Similarity-based merging reducer
#[derive(Debug, Clone)]
pub struct Merger {
    threshold: f64,
    max_frequency_ratio: f64,
}

impl Merger {
    pub fn new(threshold: f64, max_frequency_ratio: f64) -> ReduceResult<Self> {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(ReduceError::Config(format!(
                "merge threshold must be in [0, 1], got {}",
                threshold
            )));
        }
        if !(0.0..=1.0).contains(&max_frequency_ratio) {
            return Err(ReduceError::Config(format!(
                "max frequency ratio must be in [0, 1], got {}",
                max_frequency_ratio
            )));
        }

        Ok(Self {
            threshold,
            max_frequency_ratio,
        })
    }

    /// Merge similar states of `automaton` in place
    pub fn merge(&self, automaton: &mut Automaton, freq: &FrequencyMap) -> ReduceResult<MergeOutcome> {
        if freq.is_empty() {
            return Err(ReduceError::Config(
                "merging requires state frequencies".to_string(),
            ));
        }

        let swept = remove_unreachable(automaton)?.len();
        let (pairs, discovery) = self.mergeable_pairs(automaton, freq)?;

        let initial = automaton.initial_state();
        let mut mapping = MergeMap::pinned(initial);
        for &(p, q) in &pairs {
            mapping.union(q, p);
        }

        let classes = mapping.classes();
        for (root, members) in &classes {
            if members.len() < 2 {
                return Err(ReduceError::Invariant(format!(
                    "merge cluster of state {} has a single member",
                    root
                )));
            }
            if *root == initial {
                continue;
            }
            let representative = members
                .iter()
                .copied()
                .min_by_key(|state| discovery.get(state).copied().unwrap_or(usize::MAX))
                .unwrap_or(*root);
            mapping.promote(representative);
            debug!(%representative, size = members.len(), "Merging cluster");
        }

        let merged = automaton.merge_states(&mapping)?;
        if merged != mapping.len() {
            return Err(ReduceError::Invariant(format!(
                "{} states mapped but {} removed",
                mapping.len(),
                merged
            )));
        }

        info!(
            merged,
            swept,
            clusters = classes.len(),
            remaining = automaton.state_count(),
            "Merging complete"
        );

        Ok(MergeOutcome {
            merged,
            clusters: classes.len(),
            swept,
            remaining: automaton.state_count(),
        })
    }

    /// Candidate pairs and the breadth-first discovery index of each state
    fn mergeable_pairs(
        &self,
        automaton: &Automaton,
        freq: &FrequencyMap,
    ) -> ReduceResult<(Vec<(StateId, StateId)>, AHashMap<StateId, usize>)> {
        let initial = automaton.initial_state();
        let max_abs = self.max_frequency_ratio * freq.max() as f64;

        let mut discovery: AHashMap<StateId, usize> = AHashMap::default();
        discovery.insert(initial, 0);
        let mut queue = VecDeque::from([initial]);
        let mut pairs = Vec::new();

        while let Some(p) = queue.pop_front() {
            let successors = automaton.successors(p);
            let freq_p = freq.get(p)?;

            if p != initial && self.is_low_traffic(automaton, p, freq_p, max_abs) {
                for &q in &successors {
                    if q == p || automaton.is_final(q) {
                        continue;
                    }
                    let d = similarity(freq_p, freq.get(q)?);
                    if d > self.threshold {
                        trace!(%p, %q, similarity = d, "Mergeable pair");
                        pairs.push((p, q));
                    }
                }
            }

            for q in successors {
                if !discovery.contains_key(&q) {
                    discovery.insert(q, discovery.len());
                    queue.push_back(q);
                }
            }
        }

        debug!(pairs = pairs.len(), visited = discovery.len(), "Collected merge candidates");
        Ok((pairs, discovery))
    }

    fn is_low_traffic(&self, automaton: &Automaton, state: StateId, freq: u64, max_abs: f64) -> bool {
        !automaton.is_final(state)
            && freq != 0
            && max_abs > 0.0
            && freq as f64 / max_abs <= self.max_frequency_ratio
    }
}

/// Merge similar states of `automaton` in place; returns the merged count
pub fn merge(
    automaton: &mut Automaton,
    freq: &FrequencyMap,
    threshold: f64,
    max_frequency_ratio: f64,
) -> ReduceResult<usize> {
    Merger::new(threshold, max_frequency_ratio)?
        .merge(automaton, freq)
        .map(|outcome| outcome.merged)
}
