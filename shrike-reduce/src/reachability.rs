// Reachability analysis
//
// Symbol-agnostic breadth-first search from the initial state over the
// current transition function. Only reads the automaton, so it is safe to
// call right after transitions were overwritten.

use crate::ReduceResult;
use shrike_automaton::{Automaton, StateId};
use std::collections::{BTreeSet, VecDeque};
use tracing::trace;

/// States reachable from the initial state
pub fn reachable(automaton: &Automaton) -> BTreeSet<StateId> {
    let initial = automaton.initial_state();
    let mut seen = BTreeSet::from([initial]);
    let mut queue = VecDeque::from([initial]);

    while let Some(state) = queue.pop_front() {
        for next in automaton.successors(state) {
            if seen.insert(next) {
                queue.push_back(next);
            }
        }
    }

    seen
}

/// States of the automaton that the initial state cannot reach
pub fn unreachable(automaton: &Automaton) -> BTreeSet<StateId> {
    let live = reachable(automaton);
    automaton
        .states()
        .filter(|state| !live.contains(state))
        .collect()
}

/// Delete every state the initial state cannot reach and return them
pub fn remove_unreachable(automaton: &mut Automaton) -> ReduceResult<BTreeSet<StateId>> {
    let dead = unreachable(automaton);
    if !dead.is_empty() {
        automaton.remove_states(&dead)?;
        trace!(removed = dead.len(), "Removed unreachable states");
    }
    Ok(dead)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shrike_automaton::Symbol;

    fn s(id: u32) -> StateId {
        StateId(id)
    }

    #[test]
    fn test_reachable_ignores_symbols() {
        let mut aut = Automaton::new(s(0));
        aut.add_transition(s(0), Symbol(1), s(1));
        aut.add_transition(s(0), Symbol(2), s(2));
        aut.add_transition(s(2), Symbol(3), s(3));
        aut.add_transition(s(4), Symbol(1), s(3));

        assert_eq!(reachable(&aut), BTreeSet::from([s(0), s(1), s(2), s(3)]));
        assert_eq!(unreachable(&aut), BTreeSet::from([s(4)]));
    }

    #[test]
    fn test_reachable_handles_cycles() {
        let mut aut = Automaton::new(s(0));
        aut.add_transition(s(0), Symbol(1), s(1));
        aut.add_transition(s(1), Symbol(1), s(0));
        aut.add_transition(s(1), Symbol(2), s(1));

        assert_eq!(reachable(&aut).len(), 2);
        assert!(unreachable(&aut).is_empty());
    }

    #[test]
    fn test_reachable_after_self_loop() {
        let mut aut = Automaton::new(s(0));
        aut.add_transition(s(0), Symbol(1), s(1));
        aut.add_transition(s(1), Symbol(1), s(2));
        aut.add_transition(s(2), Symbol(1), s(3));

        aut.set_self_loop(s(1)).unwrap();

        assert_eq!(reachable(&aut), BTreeSet::from([s(0), s(1)]));
        assert_eq!(unreachable(&aut), BTreeSet::from([s(2), s(3)]));
    }

    #[test]
    fn test_remove_unreachable() {
        let mut aut = Automaton::new(s(0));
        aut.add_transition(s(0), Symbol(1), s(1));
        aut.add_transition(s(4), Symbol(1), s(1));
        aut.add_transition(s(5), Symbol(2), s(4));

        let dead = remove_unreachable(&mut aut).unwrap();

        assert_eq!(dead, BTreeSet::from([s(4), s(5)]));
        assert_eq!(aut.state_count(), 2);
        assert!(remove_unreachable(&mut aut).unwrap().is_empty());
    }

    #[test]
    fn test_initial_always_reachable() {
        let aut = Automaton::new(s(7));
        assert_eq!(reachable(&aut), BTreeSet::from([s(7)]));
    }
}
