// Evaluation records
//
// One comma-separated line per test sample:
// sample,states,total,original_matches,reduced_matches,false_positives,true_positives
// Aggregation only needs the 3rd, 6th and 7th field, so output of other
// evaluators with the same 7-field layout can be summed as well.

use crate::{EvalError, EvalResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::AddAssign;

const FIELDS: usize = 7;

/// Classification counts of one test sample
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleRecord {
    /// Sample name
    pub sample: String,

    /// State count of the reduced automaton
    pub states: usize,

    /// Payloads in the sample
    pub total: u64,

    /// Payloads matched by the original automaton
    pub original_matches: u64,

    /// Payloads matched by the reduced automaton
    pub reduced_matches: u64,

    /// Matched only by the reduced automaton
    pub false_positives: u64,

    /// Matched by both automata
    pub true_positives: u64,
}

fn field<T: std::str::FromStr>(fields: &[&str], index: usize, line: usize) -> EvalResult<T>
where
    T::Err: fmt::Display,
{
    fields[index].trim().parse::<T>().map_err(|e| EvalError::Record {
        line,
        reason: format!("field {}: {}", index + 1, e),
    })
}

fn split_fields(text: &str, line: usize) -> EvalResult<Vec<&str>> {
    let fields: Vec<&str> = text.split(',').collect();
    if fields.len() != FIELDS {
        return Err(EvalError::Record {
            line,
            reason: format!("expected {} fields, found {}", FIELDS, fields.len()),
        });
    }
    Ok(fields)
}

impl SampleRecord {
    /// Parse a record written by [`SampleRecord`]'s `Display`
    pub fn parse_line(text: &str, line: usize) -> EvalResult<Self> {
        let fields = split_fields(text, line)?;
        Ok(Self {
            sample: fields[0].trim().to_string(),
            states: field(&fields, 1, line)?,
            total: field(&fields, 2, line)?,
            original_matches: field(&fields, 3, line)?,
            reduced_matches: field(&fields, 4, line)?,
            false_positives: field(&fields, 5, line)?,
            true_positives: field(&fields, 6, line)?,
        })
    }
}

impl fmt::Display for SampleRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{},{},{},{},{},{}",
            self.sample,
            self.states,
            self.total,
            self.original_matches,
            self.reduced_matches,
            self.false_positives,
            self.true_positives
        )
    }
}

/// Sum of the counts of all evaluated samples
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvalSummary {
    pub samples: usize,
    pub total: u64,
    pub false_positives: u64,
    pub true_positives: u64,
}

impl EvalSummary {
    /// Sum the 7-field records of an evaluator's output, one per line
    pub fn parse_output(text: &str) -> EvalResult<Self> {
        let mut summary = EvalSummary::default();
        for (idx, raw) in text.lines().enumerate() {
            if raw.trim().is_empty() {
                continue;
            }
            let line = idx + 1;
            let fields = split_fields(raw, line)?;
            summary.samples += 1;
            summary.total += field::<u64>(&fields, 2, line)?;
            summary.false_positives += field::<u64>(&fields, 5, line)?;
            summary.true_positives += field::<u64>(&fields, 6, line)?;
        }
        Ok(summary)
    }

    /// Share of traffic wrongly matched by the reduced automaton
    pub fn real_error(&self) -> EvalResult<f64> {
        if self.total == 0 {
            return Err(EvalError::EmptySamples);
        }
        Ok(self.false_positives as f64 / self.total as f64)
    }

    /// Share of reduced-automaton matches that the original also makes
    pub fn precision(&self) -> Option<f64> {
        let positives = self.true_positives + self.false_positives;
        (positives > 0).then(|| self.true_positives as f64 / positives as f64)
    }

    /// Pruning error mass relative to the evaluated traffic
    pub fn estimated_error(&self, error_mass: u64) -> EvalResult<f64> {
        if self.total == 0 {
            return Err(EvalError::EmptySamples);
        }
        Ok(error_mass as f64 / self.total as f64)
    }
}

impl AddAssign<&SampleRecord> for EvalSummary {
    fn add_assign(&mut self, record: &SampleRecord) {
        self.samples += 1;
        self.total += record.total;
        self.false_positives += record.false_positives;
        self.true_positives += record.true_positives;
    }
}

impl<'a> FromIterator<&'a SampleRecord> for EvalSummary {
    fn from_iter<T: IntoIterator<Item = &'a SampleRecord>>(iter: T) -> Self {
        let mut summary = EvalSummary::default();
        for record in iter {
            summary += record;
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(total: u64, fp: u64, tp: u64) -> SampleRecord {
        SampleRecord {
            sample: "s".to_string(),
            states: 10,
            total,
            original_matches: tp,
            reduced_matches: tp + fp,
            false_positives: fp,
            true_positives: tp,
        }
    }

    #[test]
    fn test_record_line_roundtrip() {
        let rec = record(100, 3, 20);
        let line = rec.to_string();
        assert_eq!(line, "s,10,100,20,23,3,20");
        assert_eq!(SampleRecord::parse_line(&line, 1).unwrap(), rec);
    }

    #[test]
    fn test_record_field_count() {
        let err = SampleRecord::parse_line("a,1,2,3", 4).unwrap_err();
        assert!(matches!(err, EvalError::Record { line: 4, .. }));
        assert!(SampleRecord::parse_line("a,1,x,3,4,5,6", 1).is_err());
    }

    #[test]
    fn test_parse_output_uses_selected_fields() {
        // fields 2, 4 and 5 may hold anything
        let output = "day1.pcap,x,1000,y,z,10,90\n\nday2.pcap,x,500,y,z,5,45\n";
        let summary = EvalSummary::parse_output(output).unwrap();

        assert_eq!(summary.samples, 2);
        assert_eq!(summary.total, 1500);
        assert_eq!(summary.false_positives, 15);
        assert_eq!(summary.true_positives, 135);
        assert!(EvalSummary::parse_output("a,b,c\n").is_err());
    }

    #[test]
    fn test_summary_metrics() {
        let records = [record(100, 2, 18), record(300, 6, 54)];
        let summary: EvalSummary = records.iter().collect();

        assert_eq!(summary.total, 400);
        assert!((summary.real_error().unwrap() - 0.02).abs() < 1e-12);
        assert!((summary.precision().unwrap() - 0.9).abs() < 1e-12);
        assert!((summary.estimated_error(40).unwrap() - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_summary_without_traffic() {
        let summary = EvalSummary::default();
        assert!(matches!(summary.real_error(), Err(EvalError::EmptySamples)));
        assert_eq!(summary.precision(), None);
    }
}
