// Automaton - NFA state graph
//
// Transition rows are kept in ordered maps so that printing, ranking and
// merging are deterministic for a given input. The key set of
// `transitions` is the state set of the automaton.

use crate::freq::FrequencyMap;
use crate::state::{StateId, Symbol};
use crate::{AutomatonError, AutomatonResult};
use ahash::AHashSet;
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use tracing::{debug, trace};

/// Outgoing transitions of one state: symbol -> destination set
pub type StateTransitions = BTreeMap<Symbol, BTreeSet<StateId>>;

/// Maps every state to the representative it is merged into
///
/// States that are not merged map to themselves. Implementations must be
/// idempotent: the representative of a representative is itself.
pub trait StateMapping {
    /// Representative of `state`
    fn representative(&self, state: StateId) -> StateId;
}

impl StateMapping for BTreeMap<StateId, StateId> {
    fn representative(&self, state: StateId) -> StateId {
        self.get(&state).copied().unwrap_or(state)
    }
}

/// Nondeterministic finite automaton over byte symbols
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Automaton {
    /// Initial state, never removed
    initial: StateId,

    /// Accepting states
    finals: BTreeSet<StateId>,

    /// Symbols used by the automaton
    alphabet: BTreeSet<Symbol>,

    /// Transition function, one row per state
    transitions: BTreeMap<StateId, StateTransitions>,
}

impl Automaton {
    /// Create an automaton holding only its initial state
    pub fn new(initial: StateId) -> Self {
        let mut transitions = BTreeMap::new();
        transitions.insert(initial, StateTransitions::new());

        Self {
            initial,
            finals: BTreeSet::new(),
            alphabet: BTreeSet::new(),
            transitions,
        }
    }

    /// Add a state without transitions. Returns false if it already exists.
    pub fn add_state(&mut self, state: StateId) -> bool {
        match self.transitions.entry(state) {
            Entry::Vacant(entry) => {
                entry.insert(StateTransitions::new());
                true
            }
            Entry::Occupied(_) => false,
        }
    }

    /// Add a symbol to the alphabet
    pub fn add_symbol(&mut self, symbol: Symbol) {
        self.alphabet.insert(symbol);
    }

    /// Add the transition `from -symbol-> to`, creating missing states
    pub fn add_transition(&mut self, from: StateId, symbol: Symbol, to: StateId) {
        self.add_state(to);
        self.alphabet.insert(symbol);
        self.transitions
            .entry(from)
            .or_default()
            .entry(symbol)
            .or_default()
            .insert(to);
    }

    /// Mark a state as accepting, creating it if needed
    pub fn add_final(&mut self, state: StateId) {
        self.add_state(state);
        self.finals.insert(state);
    }

    /// Unmark an accepting state
    pub fn remove_final(&mut self, state: StateId) -> bool {
        self.finals.remove(&state)
    }

    pub fn initial_state(&self) -> StateId {
        self.initial
    }

    pub fn is_state(&self, state: StateId) -> bool {
        self.transitions.contains_key(&state)
    }

    pub fn is_final(&self, state: StateId) -> bool {
        self.finals.contains(&state)
    }

    /// All states in ascending id order
    pub fn states(&self) -> impl Iterator<Item = StateId> + '_ {
        self.transitions.keys().copied()
    }

    pub fn state_count(&self) -> usize {
        self.transitions.len()
    }

    pub fn final_states(&self) -> &BTreeSet<StateId> {
        &self.finals
    }

    pub fn alphabet(&self) -> &BTreeSet<Symbol> {
        &self.alphabet
    }

    /// Outgoing transition row of a state
    pub fn transitions(&self, state: StateId) -> Option<&StateTransitions> {
        self.transitions.get(&state)
    }

    /// Destinations of `state` on `symbol`
    pub fn targets(&self, state: StateId, symbol: Symbol) -> Option<&BTreeSet<StateId>> {
        self.transitions.get(&state).and_then(|row| row.get(&symbol))
    }

    /// Total number of (state, symbol, destination) triples
    pub fn transition_count(&self) -> usize {
        self.transitions
            .values()
            .flat_map(|row| row.values())
            .map(BTreeSet::len)
            .sum()
    }

    /// Destinations of `state` over all symbols, possibly repeated
    pub(crate) fn successor_iter(&self, state: StateId) -> impl Iterator<Item = StateId> + '_ {
        self.transitions
            .get(&state)
            .into_iter()
            .flat_map(|row| row.values())
            .flat_map(|targets| targets.iter().copied())
    }

    /// Destinations of `state` over all symbols
    pub fn successors(&self, state: StateId) -> BTreeSet<StateId> {
        self.successor_iter(state).collect()
    }

    /// Successor sets of every state
    pub fn succ(&self) -> BTreeMap<StateId, BTreeSet<StateId>> {
        self.states()
            .map(|state| (state, self.successors(state)))
            .collect()
    }

    /// Shortest distance from the initial state, for reachable states only
    pub fn state_depth(&self) -> BTreeMap<StateId, usize> {
        let mut depth = BTreeMap::new();
        let mut queue = VecDeque::new();
        depth.insert(self.initial, 0usize);
        queue.push_back((self.initial, 0usize));

        while let Some((state, d)) = queue.pop_front() {
            for next in self.successor_iter(state) {
                if let Entry::Vacant(entry) = depth.entry(next) {
                    entry.insert(d + 1);
                    queue.push_back((next, d + 1));
                }
            }
        }

        depth
    }

    /// For every final state, the states that can reach it in one or more steps
    pub fn fin_pred(&self) -> BTreeMap<StateId, BTreeSet<StateId>> {
        let mut predecessors: BTreeMap<StateId, BTreeSet<StateId>> = BTreeMap::new();
        for (&state, row) in &self.transitions {
            for targets in row.values() {
                for &target in targets {
                    predecessors.entry(target).or_default().insert(state);
                }
            }
        }

        self.finals
            .iter()
            .map(|&fin| {
                let mut seen = BTreeSet::new();
                let mut stack = vec![fin];
                while let Some(state) = stack.pop() {
                    if let Some(preds) = predecessors.get(&state) {
                        for &pred in preds {
                            if seen.insert(pred) {
                                stack.push(pred);
                            }
                        }
                    }
                }
                (fin, seen)
            })
            .collect()
    }

    /// Overwrite every alphabet transition of `state` with a self-loop
    pub fn set_self_loop(&mut self, state: StateId) -> AutomatonResult<()> {
        let row = self
            .transitions
            .get_mut(&state)
            .ok_or(AutomatonError::UnknownState(state))?;

        row.clear();
        for &symbol in &self.alphabet {
            row.insert(symbol, BTreeSet::from([state]));
        }
        trace!(%state, "Replaced transitions with self-loop");
        Ok(())
    }

    /// Delete states together with every transition touching them
    ///
    /// Symbols left without any transition leave the alphabet.
    pub fn remove_states(&mut self, dead: &BTreeSet<StateId>) -> AutomatonResult<usize> {
        if dead.contains(&self.initial) {
            return Err(AutomatonError::InitialState(self.initial));
        }

        let before = self.transitions.len();
        self.transitions.retain(|state, _| !dead.contains(state));
        self.finals.retain(|state| !dead.contains(state));
        for row in self.transitions.values_mut() {
            for targets in row.values_mut() {
                targets.retain(|target| !dead.contains(target));
            }
            row.retain(|_, targets| !targets.is_empty());
        }
        self.alphabet = self
            .transitions
            .values()
            .flat_map(|row| row.keys().copied())
            .collect();

        Ok(before - self.transitions.len())
    }

    /// Replace every state by its representative (quotient automaton)
    ///
    /// Transitions `p -a-> q` become `rep(p) -a-> rep(q)` and a
    /// representative is final when any member of its class was final.
    /// Returns the number of states that disappeared.
    pub fn merge_states<M: StateMapping + ?Sized>(&mut self, mapping: &M) -> AutomatonResult<usize> {
        for &state in self.transitions.keys() {
            let representative = mapping.representative(state);
            if !self.transitions.contains_key(&representative) {
                return Err(AutomatonError::UnknownState(representative));
            }
            let next = mapping.representative(representative);
            if next != representative {
                return Err(AutomatonError::NonIdempotentMapping {
                    state,
                    representative,
                    next,
                });
            }
        }
        if mapping.representative(self.initial) != self.initial {
            return Err(AutomatonError::InitialState(self.initial));
        }

        let before = self.transitions.len();
        let old = std::mem::take(&mut self.transitions);
        for (state, row) in old {
            let merged = self
                .transitions
                .entry(mapping.representative(state))
                .or_default();
            for (symbol, targets) in row {
                merged
                    .entry(symbol)
                    .or_default()
                    .extend(targets.into_iter().map(|t| mapping.representative(t)));
            }
        }
        self.finals = std::mem::take(&mut self.finals)
            .into_iter()
            .map(|state| mapping.representative(state))
            .collect();

        let removed = before - self.transitions.len();
        debug!(removed, remaining = self.transitions.len(), "Merged states");
        Ok(removed)
    }

    fn step(&self, active: &AHashSet<StateId>, symbol: Symbol) -> AHashSet<StateId> {
        active
            .iter()
            .filter_map(|&state| self.targets(state, symbol))
            .flat_map(|targets| targets.iter().copied())
            .collect()
    }

    /// True if a final state becomes active at any point while reading `payload`
    pub fn accepts(&self, payload: &[u8]) -> bool {
        let mut active: AHashSet<StateId> = AHashSet::default();
        active.insert(self.initial);

        if self.is_final(self.initial) {
            return true;
        }

        for &byte in payload {
            active = self.step(&active, Symbol(byte));
            if active.iter().any(|&state| self.is_final(state)) {
                return true;
            }
            if active.is_empty() {
                break;
            }
        }

        false
    }

    /// Count every state that is active at least once while reading `payload`
    pub fn label_states(&self, payload: &[u8], counts: &mut FrequencyMap) {
        let mut visited: AHashSet<StateId> = AHashSet::default();
        let mut active: AHashSet<StateId> = AHashSet::default();
        active.insert(self.initial);
        visited.insert(self.initial);

        for &byte in payload {
            active = self.step(&active, Symbol(byte));
            if active.is_empty() {
                break;
            }
            visited.extend(active.iter().copied());
        }

        for state in visited {
            counts.increment(state);
        }
    }
}
