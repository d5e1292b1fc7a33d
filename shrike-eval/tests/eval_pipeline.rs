use shrike_automaton::Automaton;
use shrike_eval::{report_path, AccuracyEvaluator, EvalConfig, EvalSummary, Report, SampleRecord};
use std::sync::Arc;
use tempfile::TempDir;

const ORIGINAL: &str = "0\n0 1 0x61\n1 2 0x62\n2 3 0x63\n3\n";
const REDUCED: &str = "0\n0 1 0x61\n1 2 0x62\n2\n";

#[tokio::test]
async fn test_evaluate_and_report() {
    let dir = TempDir::new().unwrap();
    let sample = dir.path().join("day1.txt");
    std::fs::write(&sample, "abc\nabx\nzzz\nabcabc\n").unwrap();

    let original: Automaton = ORIGINAL.parse().unwrap();
    let reduced: Automaton = REDUCED.parse().unwrap();
    let evaluator = AccuracyEvaluator::new(
        Arc::new(original),
        Arc::new(reduced),
        EvalConfig { workers: 2 },
    )
    .unwrap();

    let run = evaluator.evaluate(&[sample.clone()]).await.unwrap();
    assert_eq!(run.records.len(), 1);
    assert_eq!(run.records[0].to_string(), "day1.txt,3,4,2,3,1,2");

    // evaluator output can be summed back from its printed records
    let printed: String = run.records.iter().map(|r| format!("{}\n", r)).collect();
    assert_eq!(EvalSummary::parse_output(&printed).unwrap(), run.summary);
    let parsed = SampleRecord::parse_line(printed.trim(), 1).unwrap();
    assert_eq!(parsed, run.records[0]);

    let report = Report::from_summary(&run.summary, Some(1)).unwrap();
    let path = report_path(dir.path(), &sample, std::path::Path::new("rules.fa"), "fp", 0.5);
    report.write(&path).unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    assert_eq!(text, "#real_error,precision,estimated_error\n0.25,0.6667,0.25\n");
    assert!(path.ends_with("day1.txt_rules.fa_fp_0.5.txt"));
}
