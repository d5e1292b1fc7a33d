//! Shrike CLI
//!
//! Command-line interface for approximate NFA reduction.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use shrike_automaton::{read_payloads, Automaton, FrequencyMap};
use shrike_engine::{Orchestrator, ReductionConfig, ReductionMode, TrainingSource};
use shrike_eval::{AccuracyEvaluator, EvalConfig, EvalSummary, Report, SampleRecord};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(name = "shrike")]
#[command(about = "Shrike - Approximate NFA reduction", long_about = None)]
#[command(version)]
struct Cli {
    /// Log level, RUST_LOG takes precedence
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reduce an automaton and optionally evaluate the result
    Reduce {
        /// Automaton to reduce (.fa)
        input: PathBuf,

        /// Reduction ratio
        #[arg(short, long)]
        ratio: Option<f64>,

        /// Reduction mode: prune, freq-prune or merge
        #[arg(long)]
        mode: Option<ReductionMode>,

        /// Merge threshold
        #[arg(short, long)]
        threshold: Option<f64>,

        /// Max relative frequency of a state allowed to be merged
        #[arg(short, long)]
        max_frequency_ratio: Option<f64>,

        /// Precomputed state frequencies
        #[arg(long, conflicts_with = "train")]
        train_freq: Option<PathBuf>,

        /// Training payloads, one per line
        #[arg(long)]
        train: Option<PathBuf>,

        /// Test payload files
        #[arg(long, num_args = 1..)]
        test: Vec<PathBuf>,

        /// Evaluation workers
        #[arg(short = 'n', long)]
        workers: Option<usize>,

        /// Output automaton
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Directory for report files
        #[arg(long)]
        results_dir: Option<PathBuf>,

        /// JSON configuration file, flags override its values
        #[arg(long)]
        config: Option<PathBuf>,

        /// Print reduction statistics as JSON
        #[arg(long)]
        json: bool,
    },

    /// Compute state frequencies from training payloads
    Freq {
        /// Automaton (.fa)
        input: PathBuf,

        /// Training payloads, one per line
        #[arg(long)]
        train: PathBuf,

        /// Output file, stdout if omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Compare a reduced automaton against its original
    Eval {
        /// Original automaton
        original: PathBuf,

        /// Reduced automaton
        reduced: PathBuf,

        /// Test payload files
        #[arg(long, required = true, num_args = 1..)]
        test: Vec<PathBuf>,

        /// Evaluation workers
        #[arg(short = 'n', long)]
        workers: Option<usize>,

        /// Write the per-sample records to this file instead of stdout
        #[arg(long)]
        records: Option<PathBuf>,
    },

    /// Build the error report from saved evaluation records
    Summarize {
        /// Records file, one 7-field record per line
        records: PathBuf,

        /// Error mass of a collapse pruning run, enables the estimated error
        #[arg(long)]
        error_mass: Option<u64>,

        /// Require every field to be numeric, not just the summed ones
        #[arg(long)]
        strict: bool,

        /// Write the report to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(&cli.log_level)?;

    match cli.command {
        Commands::Reduce {
            input,
            ratio,
            mode,
            threshold,
            max_frequency_ratio,
            train_freq,
            train,
            test,
            workers,
            output,
            results_dir,
            config,
            json,
        } => {
            let mut config = match config {
                Some(path) => ReductionConfig::load(&path)?,
                None => ReductionConfig::default(),
            };
            if let Some(ratio) = ratio {
                config.ratio = ratio;
            }
            if let Some(mode) = mode {
                config.mode = mode;
            }
            if let Some(threshold) = threshold {
                config.threshold = threshold;
            }
            if let Some(max_frequency_ratio) = max_frequency_ratio {
                config.max_frequency_ratio = max_frequency_ratio;
            }
            if let Some(path) = train_freq {
                config.training = Some(TrainingSource::FrequencyFile(path));
            }
            if let Some(path) = train {
                config.training = Some(TrainingSource::Payloads(path));
            }
            if !test.is_empty() {
                config.test_samples = test;
            }
            if let Some(workers) = workers {
                config.workers = workers;
            }
            if let Some(output) = output {
                config.output = output;
            }
            if let Some(results_dir) = results_dir {
                config.results_dir = results_dir;
            }
            reduce(input, config, json).await?;
        }
        Commands::Freq {
            input,
            train,
            output,
        } => {
            compute_frequencies(input, train, output)?;
        }
        Commands::Eval {
            original,
            reduced,
            test,
            workers,
            records,
        } => {
            evaluate(original, reduced, test, workers, records).await?;
        }
        Commands::Summarize {
            records,
            error_mass,
            strict,
            output,
        } => {
            let text = std::fs::read_to_string(&records)
                .with_context(|| format!("reading {}", records.display()))?;
            let report = summarize(&text, error_mass, strict)?;
            print_report(&report);
            if let Some(path) = output {
                report.write(&path)?;
                info!(path = %path.display(), "Saved report");
            }
        }
    }

    Ok(())
}

fn setup_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level))?;

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to set tracing subscriber: {}", e))?;

    Ok(())
}

async fn reduce(input: PathBuf, config: ReductionConfig, json: bool) -> Result<()> {
    let orchestrator = Orchestrator::new(config)?;
    let config = orchestrator.config();

    let report_path = if config.test_samples.is_empty() {
        None
    } else {
        orchestrator.report_path(&input)
    };
    if let Some(path) = &report_path {
        if path.exists() {
            warn!(path = %path.display(), "Report already exists, skipping run");
            return Ok(());
        }
    }

    let original = Automaton::parse(&input)?;
    let mut reduced = original.clone();
    let stats = orchestrator.run(&mut reduced)?;

    reduced.save(&config.output)?;
    info!(path = %config.output.display(), "Saved reduced automaton");

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    }

    let Some(path) = report_path else {
        return Ok(());
    };

    let report = orchestrator
        .evaluate(Arc::new(original), Arc::new(reduced), &stats)
        .await?;
    print_report(&report);

    std::fs::create_dir_all(&config.results_dir)
        .with_context(|| format!("creating {}", config.results_dir.display()))?;
    report.write(&path)?;
    info!(path = %path.display(), "Saved report");

    Ok(())
}

fn compute_frequencies(input: PathBuf, train: PathBuf, output: Option<PathBuf>) -> Result<()> {
    let automaton = Automaton::parse(&input)?;
    let payloads = read_payloads(&train)?;
    let freq = FrequencyMap::from_payloads(&automaton, payloads.iter().map(Vec::as_slice));

    info!(
        states = freq.len(),
        payloads = payloads.len(),
        "Computed state frequencies"
    );

    match output {
        Some(path) => {
            let mut file = std::fs::File::create(&path)
                .with_context(|| format!("creating {}", path.display()))?;
            freq.write(&mut file)?;
            file.flush()?;
        }
        None => {
            let stdout = std::io::stdout();
            let mut lock = stdout.lock();
            freq.write(&mut lock)?;
        }
    }

    Ok(())
}

async fn evaluate(
    original: PathBuf,
    reduced: PathBuf,
    test: Vec<PathBuf>,
    workers: Option<usize>,
    records: Option<PathBuf>,
) -> Result<()> {
    let original = Arc::new(Automaton::parse(&original)?);
    let reduced = Arc::new(Automaton::parse(&reduced)?);

    let mut config = EvalConfig::default();
    if let Some(workers) = workers {
        config.workers = workers;
    }

    let evaluator = AccuracyEvaluator::new(original, reduced, config)?;
    let run = evaluator.evaluate(&test).await?;

    match records {
        Some(path) => {
            write_records(&path, &run.records)?;
            info!(path = %path.display(), records = run.records.len(), "Saved records");
        }
        None => {
            for record in &run.records {
                println!("{}", record);
            }
        }
    }
    print_report(&Report::from_summary(&run.summary, None)?);

    Ok(())
}

fn write_records(path: &Path, records: &[SampleRecord]) -> Result<()> {
    let mut file =
        std::fs::File::create(path).with_context(|| format!("creating {}", path.display()))?;
    for record in records {
        writeln!(file, "{}", record)?;
    }
    file.flush()?;
    Ok(())
}

/// Report for a records file produced by `eval --records` or an external evaluator
fn summarize(text: &str, error_mass: Option<u64>, strict: bool) -> Result<Report> {
    let summary = if strict {
        let records = text
            .lines()
            .enumerate()
            .filter(|(_, raw)| !raw.trim().is_empty())
            .map(|(idx, raw)| SampleRecord::parse_line(raw, idx + 1))
            .collect::<Result<Vec<_>, _>>()?;
        records.iter().collect::<EvalSummary>()
    } else {
        EvalSummary::parse_output(text)?
    };
    debug!(samples = summary.samples, total = summary.total, "Summarized records");

    Ok(Report::from_summary(&summary, error_mass)?)
}

fn print_report(report: &Report) {
    println!("real error: {}", report.real_error);
    if let Some(estimated) = report.estimated_error {
        println!("estimated error: {}", estimated);
    }
    if let Some(precision) = report.precision {
        println!("precision: {}", precision);
    }
}
