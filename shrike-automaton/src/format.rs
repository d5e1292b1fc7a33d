// `.fa` text format
//
// Line 1 holds the initial state. A line `p q sym` declares the transition
// p -sym-> q, a line holding a single state declares it final. `#` starts a
// comment and blank lines are ignored. Symbols are written as `0xNN`.

use crate::automaton::Automaton;
use crate::state::{StateId, Symbol};
use crate::{AutomatonError, AutomatonResult};
use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

fn parse_state(token: &str, line: usize) -> AutomatonResult<StateId> {
    token.parse::<StateId>().map_err(|e| AutomatonError::Parse {
        line,
        reason: format!("invalid state '{}': {}", token, e),
    })
}

impl FromStr for Automaton {
    type Err = AutomatonError;

    fn from_str(text: &str) -> AutomatonResult<Self> {
        let mut automaton: Option<Automaton> = None;

        for (idx, raw) in text.lines().enumerate() {
            let line = idx + 1;
            let content = raw.split('#').next().unwrap_or("");
            let tokens: Vec<&str> = content.split_whitespace().collect();
            if tokens.is_empty() {
                continue;
            }

            let Some(aut) = automaton.as_mut() else {
                if tokens.len() != 1 {
                    return Err(AutomatonError::Parse {
                        line,
                        reason: "expected the initial state".to_string(),
                    });
                }
                automaton = Some(Automaton::new(parse_state(tokens[0], line)?));
                continue;
            };

            match tokens.as_slice() {
                [fin] => aut.add_final(parse_state(fin, line)?),
                [from, to, symbol] => {
                    let from = parse_state(from, line)?;
                    let to = parse_state(to, line)?;
                    let symbol = symbol
                        .parse::<Symbol>()
                        .map_err(|reason| AutomatonError::Parse { line, reason })?;
                    aut.add_state(from);
                    aut.add_transition(from, symbol, to);
                }
                _ => {
                    return Err(AutomatonError::Parse {
                        line,
                        reason: format!("expected 1 or 3 fields, found {}", tokens.len()),
                    })
                }
            }
        }

        automaton.ok_or(AutomatonError::Parse {
            line: 0,
            reason: "missing initial state".to_string(),
        })
    }
}

impl fmt::Display for Automaton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.initial_state())?;
        for state in self.states() {
            if let Some(row) = self.transitions(state) {
                for (symbol, targets) in row {
                    for target in targets {
                        writeln!(f, "{} {} {}", state, target, symbol)?;
                    }
                }
            }
        }
        for fin in self.final_states() {
            writeln!(f, "{}", fin)?;
        }
        Ok(())
    }
}

impl Automaton {
    /// Read an automaton from a `.fa` file
    pub fn parse<P: AsRef<Path>>(path: P) -> AutomatonResult<Self> {
        let path = path.as_ref();
        let text =
            fs::read_to_string(path).map_err(|e| AutomatonError::Io(path.to_path_buf(), e))?;
        let automaton: Automaton = text.parse()?;
        debug!(
            path = %path.display(),
            states = automaton.state_count(),
            transitions = automaton.transition_count(),
            "Loaded automaton"
        );
        Ok(automaton)
    }

    /// Write the automaton in `.fa` format
    pub fn print<W: Write>(&self, sink: &mut W) -> io::Result<()> {
        write!(sink, "{}", self)
    }

    /// Write the automaton to a `.fa` file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> AutomatonResult<()> {
        let path = path.as_ref();
        fs::write(path, self.to_string()).map_err(|e| AutomatonError::Io(path.to_path_buf(), e))
    }
}
