// Error report
//
// One header line and one value line, values rounded to 4 decimals,
// -1 where a value does not apply.

use crate::record::EvalSummary;
use crate::{EvalError, EvalResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

const HEADER: &str = "#real_error,precision,estimated_error";
const NOT_APPLICABLE: f64 = -1.0;

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

/// Error figures of one reduction run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub real_error: f64,
    pub precision: Option<f64>,
    pub estimated_error: Option<f64>,
}

impl Report {
    /// Build a report; `error_mass` is only known for collapse pruning
    pub fn from_summary(summary: &EvalSummary, error_mass: Option<u64>) -> EvalResult<Self> {
        let real_error = round4(summary.real_error()?);
        let precision = summary.precision().map(round4);
        let estimated_error = match error_mass {
            Some(mass) => Some(round4(summary.estimated_error(mass)?)),
            None => None,
        };

        Ok(Self {
            real_error,
            precision,
            estimated_error,
        })
    }

    pub fn write<P: AsRef<Path>>(&self, path: P) -> EvalResult<()> {
        let path = path.as_ref();
        std::fs::write(path, self.to_string()).map_err(|e| EvalError::Io(path.to_path_buf(), e))
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", HEADER)?;
        writeln!(
            f,
            "{},{},{}",
            self.real_error,
            self.precision.unwrap_or(NOT_APPLICABLE),
            self.estimated_error.unwrap_or(NOT_APPLICABLE)
        )
    }
}

fn base_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// `<dir>/<train>_<input>_<tag>_<ratio>.txt`
pub fn report_path(dir: &Path, train: &Path, input: &Path, policy_tag: &str, ratio: f64) -> PathBuf {
    dir.join(format!(
        "{}_{}_{}_{}.txt",
        base_name(train),
        base_name(input),
        policy_tag,
        ratio
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn summary(total: u64, fp: u64, tp: u64) -> EvalSummary {
        EvalSummary {
            samples: 1,
            total,
            false_positives: fp,
            true_positives: tp,
        }
    }

    #[test]
    fn test_report_rounding() {
        let report = Report::from_summary(&summary(3, 1, 2), Some(1)).unwrap();
        assert_eq!(report.real_error, 0.3333);
        assert_eq!(report.precision, Some(0.6667));
        assert_eq!(report.estimated_error, Some(0.3333));
    }

    #[test]
    fn test_report_format() {
        let report = Report::from_summary(&summary(100, 5, 0), None).unwrap();
        assert_eq!(report.to_string(), "#real_error,precision,estimated_error\n0.05,0,-1\n");

        let report = Report::from_summary(&summary(100, 0, 0), None).unwrap();
        assert_eq!(report.to_string(), "#real_error,precision,estimated_error\n0,-1,-1\n");
    }

    #[test]
    fn test_report_requires_traffic() {
        assert!(Report::from_summary(&summary(0, 0, 0), Some(3)).is_err());
    }

    #[test]
    fn test_report_path() {
        let path = report_path(
            Path::new("results"),
            Path::new("/data/train.txt"),
            Path::new("/nfa/rules.fa"),
            "fp",
            0.2,
        );
        assert_eq!(path, PathBuf::from("results/train.txt_rules.fa_fp_0.2.txt"));
    }

    #[test]
    fn test_report_write() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("report.txt");
        let report = Report::from_summary(&summary(10, 1, 9), Some(2)).unwrap();

        report.write(&path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "#real_error,precision,estimated_error\n0.1,0.9,0.2\n");
    }
}
