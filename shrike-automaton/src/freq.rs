// State frequencies
//
// Observed traversal counts per state, either read from a precomputed
// `state count` file or obtained by labeling sample payloads. Lookups of
// absent states fail instead of defaulting to zero.

use crate::automaton::Automaton;
use crate::state::StateId;
use crate::{AutomatonError, AutomatonResult};
use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use tracing::{debug, warn};

/// Mapping state -> observed traversal count
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrequencyMap {
    counts: BTreeMap<StateId, u64>,
}

impl FrequencyMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Label every payload and return the counts of all automaton states
    ///
    /// States that no payload visits get an explicit zero entry.
    pub fn from_payloads<'a, I>(automaton: &Automaton, payloads: I) -> Self
    where
        I: IntoIterator<Item = &'a [u8]>,
    {
        let mut freq: FrequencyMap = automaton.states().map(|state| (state, 0)).collect();
        let mut samples = 0usize;
        for payload in payloads {
            automaton.label_states(payload, &mut freq);
            samples += 1;
        }
        debug!(samples, states = freq.len(), "Labeled payloads");
        freq
    }

    /// Parse `state count` lines; `#` starts a comment
    pub fn parse_str(text: &str, automaton: &Automaton) -> AutomatonResult<Self> {
        let mut freq = FrequencyMap::new();

        for (idx, raw) in text.lines().enumerate() {
            let line = idx + 1;
            let content = raw.split('#').next().unwrap_or("");
            let tokens: Vec<&str> = content.split_whitespace().collect();
            if tokens.is_empty() {
                continue;
            }

            let [state, count] = tokens.as_slice() else {
                return Err(AutomatonError::Parse {
                    line,
                    reason: "expected 'state count'".to_string(),
                });
            };
            let state = state.parse::<StateId>().map_err(|e| AutomatonError::Parse {
                line,
                reason: format!("invalid state '{}': {}", state, e),
            })?;
            let count = count.parse::<u64>().map_err(|e| AutomatonError::Parse {
                line,
                reason: format!("invalid count '{}': {}", count, e),
            })?;
            if !automaton.is_state(state) {
                return Err(AutomatonError::UnknownState(state));
            }
            if freq.counts.insert(state, count).is_some() {
                warn!(%state, line, "Duplicate frequency entry, keeping the last one");
            }
        }

        Ok(freq)
    }

    /// Read a frequency file for `automaton`
    pub fn read<P: AsRef<Path>>(path: P, automaton: &Automaton) -> AutomatonResult<Self> {
        let path = path.as_ref();
        let text =
            fs::read_to_string(path).map_err(|e| AutomatonError::Io(path.to_path_buf(), e))?;
        Self::parse_str(&text, automaton)
    }

    /// Write `state count` lines in ascending state order
    pub fn write<W: Write>(&self, sink: &mut W) -> io::Result<()> {
        for (state, count) in &self.counts {
            writeln!(sink, "{} {}", state, count)?;
        }
        Ok(())
    }

    pub fn insert(&mut self, state: StateId, count: u64) -> Option<u64> {
        self.counts.insert(state, count)
    }

    pub fn increment(&mut self, state: StateId) {
        *self.counts.entry(state).or_insert(0) += 1;
    }

    /// Frequency of `state`; absent states are an error
    pub fn get(&self, state: StateId) -> AutomatonResult<u64> {
        self.counts
            .get(&state)
            .copied()
            .ok_or(AutomatonError::MissingFrequency(state))
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Largest recorded frequency, 0 when empty
    pub fn max(&self) -> u64 {
        self.counts.values().copied().max().unwrap_or(0)
    }

    /// Sum of the frequencies of `states`
    pub fn total<I>(&self, states: I) -> AutomatonResult<u64>
    where
        I: IntoIterator<Item = StateId>,
    {
        states.into_iter().map(|state| self.get(state)).sum()
    }
}

impl FromIterator<(StateId, u64)> for FrequencyMap {
    fn from_iter<T: IntoIterator<Item = (StateId, u64)>>(iter: T) -> Self {
        Self {
            counts: iter.into_iter().collect(),
        }
    }
}
