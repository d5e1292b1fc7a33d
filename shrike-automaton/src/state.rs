// State and symbol identifiers

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Opaque state identifier, unique within one automaton
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StateId(pub u32);

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for StateId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u32>().map(StateId)
    }
}

impl From<u32> for StateId {
    fn from(id: u32) -> Self {
        StateId(id)
    }
}

/// Alphabet symbol: one payload byte
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Symbol(pub u8);

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:02x}", self.0)
    }
}

impl FromStr for Symbol {
    type Err = String;

    /// Accepts `0xNN` hexadecimal or plain decimal notation
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            Some(hex) => u8::from_str_radix(hex, 16),
            None => s.parse::<u8>(),
        };
        parsed
            .map(Symbol)
            .map_err(|e| format!("invalid symbol '{}': {}", s, e))
    }
}

impl From<u8> for Symbol {
    fn from(byte: u8) -> Self {
        Symbol(byte)
    }
}
