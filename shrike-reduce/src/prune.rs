// Pruning reducer
//
// Shrinks an automaton to `round(ratio * states)` states by giving up the
// least traversed states. Two policies:
// - Collapse: low-frequency states become absorbing finals (self-loop on
//   every symbol), states orphaned by that are deleted. The frequency of
//   every deleted state is summed into the error mass, an upper bound on
//   the traffic whose classification can change.
// - Fold: low-frequency non-final states are merged onto a final state
//   they can reach.

use crate::reachability::remove_unreachable;
use crate::union_find::MergeMap;
use crate::{ReduceError, ReduceResult};
use shrike_automaton::{Automaton, FrequencyMap, StateId};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use tracing::{debug, info, trace};

/// Which pruning strategy to apply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PrunePolicy {
    /// Absorbing self-loop finals, orphaned states removed
    #[default]
    Collapse,

    /// Merge onto a reachable final state
    Fold,
}

/// Result of a pruning run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PruneOutcome {
    /// Policy that produced this outcome
    pub policy: PrunePolicy,

    /// Total frequency of removed (or folded) states
    pub error_mass: u64,

    /// Number of states that disappeared
    pub removed: usize,

    /// States left in the automaton
    pub remaining: usize,

    /// Requested state count
    pub target: usize,
}

/// `round(ratio * state_count)` with ties to even
pub fn target_count(ratio: f64, state_count: usize) -> ReduceResult<usize> {
    if !ratio.is_finite() || ratio <= 0.0 || ratio > 1.0 {
        return Err(ReduceError::Config(format!(
            "reduction ratio must be in (0, 1], got {}",
            ratio
        )));
    }
    Ok((ratio * state_count as f64).round_ties_even() as usize)
}

/// Frequency-guided pruning reducer
#[derive(Debug, Clone)]
pub struct Pruner {
    ratio: f64,
    policy: PrunePolicy,
}

impl Pruner {
    pub fn new(ratio: f64) -> Self {
        Self {
            ratio,
            policy: PrunePolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: PrunePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> PrunePolicy {
        self.policy
    }

    /// Prune `automaton` in place
    pub fn prune(&self, automaton: &mut Automaton, freq: &FrequencyMap) -> ReduceResult<PruneOutcome> {
        let original = automaton.state_count();
        let target = target_count(self.ratio, original)?;

        let initial = automaton.initial_state();
        for state in automaton.states().filter(|&state| state != initial) {
            freq.get(state)?;
        }

        let outcome = match self.policy {
            PrunePolicy::Collapse => self.collapse(automaton, freq, target)?,
            PrunePolicy::Fold => self.fold(automaton, freq, target)?,
        };

        info!(
            policy = ?outcome.policy,
            original,
            remaining = outcome.remaining,
            target,
            error_mass = outcome.error_mass,
            "Pruning complete"
        );
        Ok(outcome)
    }

    fn collapse(
        &self,
        automaton: &mut Automaton,
        freq: &FrequencyMap,
        target: usize,
    ) -> ReduceResult<PruneOutcome> {
        if target <= 1 {
            return Err(ReduceError::Config(format!(
                "reduction ratio {} leaves {} states, need more than 1",
                self.ratio, target
            )));
        }

        let original = automaton.state_count();
        let mut error_mass = sweep(automaton, freq)?;

        let initial = automaton.initial_state();
        // ascending frequency, deeper states first on ties
        let ranked = rank(automaton, freq, |state| state != initial, |a, b| {
            a.frequency
                .cmp(&b.frequency)
                .then(b.depth.cmp(&a.depth))
                .then(a.state.cmp(&b.state))
        })?;

        let mut next = 0;
        while automaton.state_count() > target {
            let Some(band) = ranked.get(next).map(|r| r.frequency) else {
                return Err(ReduceError::Infeasible {
                    target,
                    reached: automaton.state_count(),
                });
            };

            let mut absorbed = 0usize;
            while let Some(candidate) = ranked.get(next).filter(|r| r.frequency == band) {
                next += 1;
                if !automaton.is_state(candidate.state) {
                    continue;
                }
                automaton.add_final(candidate.state);
                automaton.set_self_loop(candidate.state)?;
                absorbed += 1;
            }

            error_mass += sweep(automaton, freq)?;
            debug!(
                frequency = band,
                absorbed,
                reachable = automaton.state_count(),
                target,
                "Collapsed frequency band"
            );
        }

        Ok(PruneOutcome {
            policy: PrunePolicy::Collapse,
            error_mass,
            removed: original - automaton.state_count(),
            remaining: automaton.state_count(),
            target,
        })
    }

    fn fold(
        &self,
        automaton: &mut Automaton,
        freq: &FrequencyMap,
        target: usize,
    ) -> ReduceResult<PruneOutcome> {
        let finals = automaton.final_states().len();
        let keep = target as i64 - finals as i64 - 1;
        if keep <= 1 {
            return Err(ReduceError::Config(format!(
                "ratio {} keeps {} non-final states ({} targets, {} finals), need more than 1",
                self.ratio, keep, target, finals
            )));
        }
        let keep = keep as usize;

        let original = automaton.state_count();
        let mut error_mass = sweep(automaton, freq)?;

        let initial = automaton.initial_state();
        // descending frequency, shallow states first on ties
        let ranked = rank(
            automaton,
            freq,
            |state| state != initial && !automaton.is_final(state),
            |a, b| {
                b.frequency
                    .cmp(&a.frequency)
                    .then(a.depth.cmp(&b.depth))
                    .then(a.state.cmp(&b.state))
            },
        )?;

        let mut reaches: BTreeMap<StateId, StateId> = BTreeMap::new();
        for (fin, preds) in automaton.fin_pred() {
            for pred in preds {
                reaches.entry(pred).or_insert(fin);
            }
        }

        let mut mapping = MergeMap::pinned(initial);
        for candidate in ranked.iter().skip(keep) {
            let fin = reaches
                .get(&candidate.state)
                .copied()
                .ok_or(ReduceError::NoReachableFinal(candidate.state))?;
            trace!(state = %candidate.state, %fin, "Folding state");
            mapping.union(candidate.state, fin);
            error_mass += candidate.frequency;
        }

        automaton.merge_states(&mapping)?;
        debug!(folded = mapping.len(), kept = keep.min(ranked.len()), "Folded states");

        Ok(PruneOutcome {
            policy: PrunePolicy::Fold,
            error_mass,
            removed: original - automaton.state_count(),
            remaining: automaton.state_count(),
            target,
        })
    }
}

/// Prune `automaton` in place with the given policy
pub fn prune(
    automaton: &mut Automaton,
    ratio: f64,
    freq: &FrequencyMap,
    policy: PrunePolicy,
) -> ReduceResult<PruneOutcome> {
    Pruner::new(ratio).with_policy(policy).prune(automaton, freq)
}

#[derive(Debug, Clone, Copy)]
struct Ranked {
    state: StateId,
    frequency: u64,
    depth: usize,
}

fn rank<F, C>(automaton: &Automaton, freq: &FrequencyMap, keep: F, order: C) -> ReduceResult<Vec<Ranked>>
where
    F: Fn(StateId) -> bool,
    C: Fn(&Ranked, &Ranked) -> Ordering,
{
    let depth = automaton.state_depth();
    let mut ranked = automaton
        .states()
        .filter(|&state| keep(state))
        .map(|state| {
            Ok(Ranked {
                state,
                frequency: freq.get(state)?,
                depth: depth.get(&state).copied().unwrap_or(usize::MAX),
            })
        })
        .collect::<ReduceResult<Vec<_>>>()?;
    ranked.sort_by(|a, b| order(a, b));
    Ok(ranked)
}

/// Delete every unreachable state and return their total frequency
fn sweep(automaton: &mut Automaton, freq: &FrequencyMap) -> ReduceResult<u64> {
    let dead = remove_unreachable(automaton)?;
    Ok(freq.total(dead.iter().copied())?)
}
