// Payload sample files
//
// One payload per line; a trailing `\r` is stripped and the final empty
// line (if any) is ignored.

use crate::{AutomatonError, AutomatonResult};
use std::fs;
use std::path::Path;

/// Read newline-delimited payloads
pub fn read_payloads<P: AsRef<Path>>(path: P) -> AutomatonResult<Vec<Vec<u8>>> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(|e| AutomatonError::Io(path.to_path_buf(), e))?;
    Ok(split_payloads(&bytes))
}

fn split_payloads(bytes: &[u8]) -> Vec<Vec<u8>> {
    let mut payloads: Vec<Vec<u8>> = bytes
        .split(|&b| b == b'\n')
        .map(|line| line.strip_suffix(b"\r").unwrap_or(line).to_vec())
        .collect();
    if payloads.last().is_some_and(|last| last.is_empty()) {
        payloads.pop();
    }
    payloads
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_payloads() {
        let payloads = split_payloads(b"GET /\r\n\nPOST\n");
        assert_eq!(payloads, vec![b"GET /".to_vec(), Vec::new(), b"POST".to_vec()]);
        assert!(split_payloads(b"").is_empty());
    }

    #[test]
    fn test_read_payloads_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_payloads(dir.path().join("none.txt")).unwrap_err();
        assert!(matches!(err, AutomatonError::Io(..)));
    }
}
