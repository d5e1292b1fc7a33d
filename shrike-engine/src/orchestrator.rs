// Reduction Orchestrator
//
// One run = frequencies from the training source, one reducer, one
// statistic. Evaluation against test traffic is a separate step so the
// caller decides whether to pay for it.

use crate::config::{ReductionConfig, ReductionMode, TrainingSource};
use crate::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};
use shrike_automaton::{read_payloads, Automaton, FrequencyMap};
use shrike_eval::{report_path, AccuracyEvaluator, EvalConfig, Report};
use shrike_reduce::{Merger, PrunePolicy, Pruner};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Statistic reported by the reducer that ran
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReductionStatistic {
    /// Collapse pruning: frequency of every state given up
    ErrorMass(u64),

    /// Fold pruning: folded states and their total frequency
    Folded { states: usize, mass: u64 },

    /// Merging: eliminated states
    Merged(usize),
}

/// Summary of one reduction run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReductionStats {
    pub mode: ReductionMode,
    pub original_states: usize,
    pub reduced_states: usize,
    pub statistic: ReductionStatistic,
}

impl ReductionStats {
    /// Error mass usable as an error bound, collapse pruning only
    pub fn error_mass(&self) -> Option<u64> {
        match self.statistic {
            ReductionStatistic::ErrorMass(mass) => Some(mass),
            _ => None,
        }
    }
}

/// Drives a single reduction run
pub struct Orchestrator {
    config: ReductionConfig,
}

impl Orchestrator {
    pub fn new(config: ReductionConfig) -> EngineResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ReductionConfig {
        &self.config
    }

    /// Per-state frequencies of `automaton` from the training source
    pub fn frequencies(&self, automaton: &Automaton) -> EngineResult<FrequencyMap> {
        let source = self
            .config
            .training
            .as_ref()
            .ok_or_else(|| EngineError::Config("no training data configured".to_string()))?;

        let freq = match source {
            TrainingSource::FrequencyFile(path) => FrequencyMap::read(path, automaton)?,
            TrainingSource::Payloads(path) => {
                let payloads = read_payloads(path)?;
                FrequencyMap::from_payloads(automaton, payloads.iter().map(Vec::as_slice))
            }
        };

        debug!(source = %source.path().display(), states = freq.len(), "Loaded frequencies");
        Ok(freq)
    }

    /// Reduce `automaton` in place with the configured reducer
    pub fn run(&self, automaton: &mut Automaton) -> EngineResult<ReductionStats> {
        let freq = self.frequencies(automaton)?;
        let original_states = automaton.state_count();

        info!(
            mode = ?self.config.mode,
            ratio = self.config.ratio,
            states = original_states,
            "Starting reduction"
        );

        let statistic = match self.config.mode {
            ReductionMode::Prune | ReductionMode::FreqPrune => {
                let policy = if self.config.mode == ReductionMode::FreqPrune {
                    PrunePolicy::Collapse
                } else {
                    PrunePolicy::Fold
                };
                let outcome = Pruner::new(self.config.ratio)
                    .with_policy(policy)
                    .prune(automaton, &freq)?;
                match policy {
                    PrunePolicy::Collapse => ReductionStatistic::ErrorMass(outcome.error_mass),
                    PrunePolicy::Fold => ReductionStatistic::Folded {
                        states: outcome.removed,
                        mass: outcome.error_mass,
                    },
                }
            }
            ReductionMode::Merge => {
                let outcome = Merger::new(self.config.threshold, self.config.max_frequency_ratio)?
                    .merge(automaton, &freq)?;
                ReductionStatistic::Merged(outcome.merged)
            }
        };

        let stats = ReductionStats {
            mode: self.config.mode,
            original_states,
            reduced_states: automaton.state_count(),
            statistic,
        };

        info!(
            from = stats.original_states,
            to = stats.reduced_states,
            statistic = ?stats.statistic,
            "Reduction complete"
        );

        Ok(stats)
    }

    /// Report file for a run on `input`
    pub fn report_path(&self, input: &Path) -> Option<PathBuf> {
        let training = self.config.training.as_ref()?;
        Some(report_path(
            &self.config.results_dir,
            training.path(),
            input,
            self.config.mode.tag(),
            self.config.ratio,
        ))
    }

    /// Compare `reduced` against `original` on the configured test samples
    pub async fn evaluate(
        &self,
        original: Arc<Automaton>,
        reduced: Arc<Automaton>,
        stats: &ReductionStats,
    ) -> EngineResult<Report> {
        if self.config.test_samples.is_empty() {
            return Err(EngineError::Config(
                "evaluation requires test samples".to_string(),
            ));
        }

        let evaluator = AccuracyEvaluator::new(
            original,
            reduced,
            EvalConfig {
                workers: self.config.workers,
            },
        )?;
        let run = evaluator.evaluate(&self.config.test_samples).await?;
        let report = Report::from_summary(&run.summary, stats.error_mass())?;

        info!(
            real_error = report.real_error,
            precision = ?report.precision,
            estimated_error = ?report.estimated_error,
            "Evaluation report ready"
        );

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shrike_automaton::StateId;
    use tempfile::TempDir;

    /// 0 -a-> 1 -b-> 2 -c-> 3 (final), 0 -x-> 4 -y-> 5 (final)
    const RULES: &str = "0\n0 1 0x61\n1 2 0x62\n2 3 0x63\n0 4 0x78\n4 5 0x79\n3\n5\n";

    fn setup(mode: ReductionMode, ratio: f64) -> (TempDir, Orchestrator) {
        let dir = TempDir::new().unwrap();
        let train = dir.path().join("train.txt");
        std::fs::write(&train, "abc\nabc\nabc\nab\nxy\n").unwrap();

        let config = ReductionConfig {
            ratio,
            mode,
            threshold: 0.5,
            max_frequency_ratio: 1.0,
            workers: 2,
            training: Some(TrainingSource::Payloads(train)),
            results_dir: dir.path().join("results"),
            ..Default::default()
        };
        (dir, Orchestrator::new(config).unwrap())
    }

    #[test]
    fn test_new_validates() {
        assert!(Orchestrator::new(ReductionConfig::default()).is_err());
    }

    #[test]
    fn test_frequencies_from_payloads() {
        let (_dir, orchestrator) = setup(ReductionMode::Prune, 0.5);
        let aut: Automaton = RULES.parse().unwrap();
        let freq = orchestrator.frequencies(&aut).unwrap();

        assert_eq!(freq.get(StateId(0)).unwrap(), 5);
        assert_eq!(freq.get(StateId(2)).unwrap(), 4);
        assert_eq!(freq.get(StateId(3)).unwrap(), 3);
        assert_eq!(freq.get(StateId(5)).unwrap(), 1);
    }

    #[test]
    fn test_freq_prune_reports_error_mass() {
        let (_dir, orchestrator) = setup(ReductionMode::FreqPrune, 0.5);
        let mut aut: Automaton = RULES.parse().unwrap();
        let stats = orchestrator.run(&mut aut).unwrap();

        assert_eq!(stats.original_states, 6);
        assert!(stats.reduced_states <= 3);
        assert!(stats.error_mass().is_some());
        assert_eq!(stats.reduced_states, aut.state_count());
    }

    #[test]
    fn test_merge_reports_merged_count() {
        let (_dir, orchestrator) = setup(ReductionMode::Merge, 0.5);
        let mut aut: Automaton = RULES.parse().unwrap();
        let stats = orchestrator.run(&mut aut).unwrap();

        match stats.statistic {
            ReductionStatistic::Merged(merged) => {
                assert_eq!(stats.original_states - merged, stats.reduced_states)
            }
            other => panic!("unexpected statistic {:?}", other),
        }
        assert_eq!(stats.error_mass(), None);
    }

    #[test]
    fn test_report_path_encodes_run() {
        let (dir, orchestrator) = setup(ReductionMode::FreqPrune, 0.25);
        let path = orchestrator.report_path(Path::new("nfa/rules.fa")).unwrap();
        assert_eq!(path, dir.path().join("results").join("train.txt_rules.fa_fp_0.25.txt"));
    }

    #[tokio::test]
    async fn test_evaluate_requires_samples() {
        let (_dir, orchestrator) = setup(ReductionMode::FreqPrune, 0.5);
        let aut = Arc::new(RULES.parse::<Automaton>().unwrap());
        let stats = ReductionStats {
            mode: ReductionMode::FreqPrune,
            original_states: 6,
            reduced_states: 6,
            statistic: ReductionStatistic::ErrorMass(0),
        };

        let err = orchestrator
            .evaluate(Arc::clone(&aut), aut, &stats)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Config(_)));
    }
}
