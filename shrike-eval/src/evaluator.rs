// Accuracy Evaluator
//
// Runs the original and the reduced automaton over test samples:
// - One blocking task per sample, at most `workers` at a time
// - Workers only see immutable Arc views of both automata
// - Counts are summed once every worker has finished
// - A failed or panicked worker fails the whole evaluation

use crate::record::{EvalSummary, SampleRecord};
use crate::{EvalError, EvalResult};
use shrike_automaton::{read_payloads, Automaton};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info};

/// Evaluator configuration
#[derive(Debug, Clone)]
pub struct EvalConfig {
    /// Samples evaluated concurrently
    pub workers: usize,
}

impl Default for EvalConfig {
    fn default() -> Self {
        let cpus = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        Self {
            workers: cpus.saturating_sub(1).max(1),
        }
    }
}

/// Records of every sample, in input order, and their sum
#[derive(Debug, Clone, Default)]
pub struct EvalRun {
    pub records: Vec<SampleRecord>,
    pub summary: EvalSummary,
}

/// Compares a reduced automaton against its original on sample traffic
pub struct AccuracyEvaluator {
    original: Arc<Automaton>,
    reduced: Arc<Automaton>,
    semaphore: Arc<Semaphore>,
}

impl AccuracyEvaluator {
    pub fn new(
        original: Arc<Automaton>,
        reduced: Arc<Automaton>,
        config: EvalConfig,
    ) -> EvalResult<Self> {
        if config.workers == 0 {
            return Err(EvalError::Config(
                "at least one worker is required".to_string(),
            ));
        }

        Ok(Self {
            original,
            reduced,
            semaphore: Arc::new(Semaphore::new(config.workers)),
        })
    }

    /// Evaluate every sample file and sum the results
    pub async fn evaluate(&self, samples: &[PathBuf]) -> EvalResult<EvalRun> {
        info!(samples = samples.len(), "Evaluating reduced automaton");

        let mut tasks = JoinSet::new();
        for (index, sample) in samples.iter().cloned().enumerate() {
            let permit = Arc::clone(&self.semaphore)
                .acquire_owned()
                .await
                .map_err(|e| EvalError::Worker(e.to_string()))?;
            let original = Arc::clone(&self.original);
            let reduced = Arc::clone(&self.reduced);

            tasks.spawn_blocking(move || {
                let _permit = permit;
                let result = evaluate_sample(&original, &reduced, &sample);
                (index, sample, result)
            });
        }

        let mut slots: Vec<Option<SampleRecord>> = vec![None; samples.len()];
        let mut failures = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            let (index, sample, result) =
                joined.map_err(|e| EvalError::Worker(format!("worker panicked: {}", e)))?;
            match result {
                Ok(record) => slots[index] = Some(record),
                Err(e) => {
                    error!(sample = %sample.display(), error = %e, "Sample evaluation failed");
                    failures.push((index, sample, e));
                }
            }
        }

        if let Some((_, sample, e)) = failures.into_iter().min_by_key(|(index, _, _)| *index) {
            return Err(EvalError::SampleFailed {
                sample,
                reason: e.to_string(),
            });
        }

        let records: Vec<SampleRecord> = slots.into_iter().flatten().collect();
        let summary: EvalSummary = records.iter().collect();

        info!(
            samples = summary.samples,
            total = summary.total,
            false_positives = summary.false_positives,
            "Evaluation complete"
        );

        Ok(EvalRun { records, summary })
    }
}

/// Classify every payload of one sample with both automata
fn evaluate_sample(
    original: &Automaton,
    reduced: &Automaton,
    sample: &Path,
) -> EvalResult<SampleRecord> {
    let payloads = read_payloads(sample)?;

    let mut record = SampleRecord {
        sample: sample
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| sample.display().to_string()),
        states: reduced.state_count(),
        total: 0,
        original_matches: 0,
        reduced_matches: 0,
        false_positives: 0,
        true_positives: 0,
    };

    for payload in &payloads {
        let expected = original.accepts(payload);
        let actual = reduced.accepts(payload);

        record.total += 1;
        record.original_matches += u64::from(expected);
        record.reduced_matches += u64::from(actual);
        match (expected, actual) {
            (true, true) => record.true_positives += 1,
            (false, true) => record.false_positives += 1,
            _ => {}
        }
    }

    debug!(sample = %record.sample, total = record.total, "Sample evaluated");
    Ok(record)
}
