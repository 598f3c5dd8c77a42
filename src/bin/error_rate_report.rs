use std::fs;
use std::path::{Path, PathBuf};

use asr_metrics::alignment::report::build_report;
use asr_metrics::{
    Granularity, MetricsConfig, MetricsEvaluatorBuilder, Pipeline, Transform, ZeroLengthPolicy,
};
use chrono::Utc;
use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

#[path = "error_rate_report/json_report_formatter.rs"]
mod json_report_formatter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum GranularityChoice {
    Word,
    Character,
}

impl GranularityChoice {
    fn granularity(self) -> Granularity {
        match self {
            Self::Word => Granularity::Word,
            Self::Character => Granularity::Character,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum PolicyChoice {
    Strict,
    Lenient,
    Sentinel,
}

#[derive(Debug, Parser)]
#[command(name = "error_rate_report")]
#[command(about = "Compute WER/MER/WIL/WIP or CER reports for paired transcript files")]
struct Args {
    /// Reference transcripts, one sentence per line.
    #[arg(long, env = "ASR_METRICS_REFERENCE")]
    reference: PathBuf,
    /// Hypothesis transcripts, one sentence per line.
    #[arg(long, env = "ASR_METRICS_HYPOTHESIS")]
    hypothesis: PathBuf,
    /// JSON `MetricsConfig`; command-line flags override its fields.
    #[arg(long, env = "ASR_METRICS_CONFIG")]
    config: Option<PathBuf>,
    #[arg(long, env = "ASR_METRICS_GRANULARITY", value_enum)]
    granularity: Option<GranularityChoice>,
    #[arg(long, env = "ASR_METRICS_POLICY", value_enum)]
    policy: Option<PolicyChoice>,
    /// Value returned for an empty reference under `--policy sentinel`.
    #[arg(long, env = "ASR_METRICS_SENTINEL", default_value_t = f64::INFINITY)]
    sentinel_value: f64,
    /// Treat each file as one long sentence.
    #[arg(long, env = "ASR_METRICS_CONCATENATE", default_value_t = false)]
    concatenate: bool,
    #[arg(long, env = "ASR_METRICS_OUT")]
    out: Option<PathBuf>,
    #[arg(long, env = "ASR_METRICS_LOG", default_value = "warn")]
    log_level: String,
}

fn main() {
    if let Err(err) = run() {
        eprintln!("error_rate_report: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let args = Args::parse();
    init_logging(&args.log_level)?;

    let mut config = match args.config.as_ref() {
        Some(path) => MetricsConfig::load(path).map_err(|err| err.to_string())?,
        None => MetricsConfig::default(),
    };
    if let Some(granularity) = args.granularity {
        config.granularity = granularity.granularity();
    }
    if let Some(policy) = args.policy {
        config.zero_length_policy = match policy {
            PolicyChoice::Strict => ZeroLengthPolicy::Strict,
            PolicyChoice::Lenient => ZeroLengthPolicy::Lenient,
            PolicyChoice::Sentinel => ZeroLengthPolicy::Sentinel(args.sentinel_value),
        };
    }

    let references = read_lines(&args.reference)?;
    let hypotheses = read_lines(&args.hypothesis)?;
    tracing::info!(
        references = references.len(),
        hypotheses = hypotheses.len(),
        granularity = config.granularity.as_str(),
        "loaded transcripts"
    );

    let mut reference_pipeline = config.reference_pipeline().map_err(|err| err.to_string())?;
    let mut hypothesis_pipeline = config.hypothesis_pipeline().map_err(|err| err.to_string())?;
    if args.concatenate {
        reference_pipeline = concatenated(&reference_pipeline)?;
        hypothesis_pipeline = concatenated(&hypothesis_pipeline)?;
    }

    let evaluator = MetricsEvaluatorBuilder::new(config)
        .with_reference_pipeline(reference_pipeline)
        .with_hypothesis_pipeline(hypothesis_pipeline)
        .build()
        .map_err(|err| err.to_string())?;
    let output = evaluator
        .evaluate(references, hypotheses)
        .map_err(|err| err.to_string())?;

    let report = build_report(&output, Utc::now().to_rfc3339());
    if let Some(rate) = report.aggregates.error_rate {
        tracing::info!(
            pairs = report.meta.pair_count,
            error_rate = rate,
            "corpus error rate"
        );
    }

    match args.out.as_ref() {
        Some(path) => json_report_formatter::write_report(path, &report),
        None => json_report_formatter::print_report(&report),
    }
}

fn init_logging(level: &str) -> Result<(), String> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .map_err(|err| format!("invalid log level '{level}': {err}"))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|err| format!("failed to initialize logging: {err}"))
}

fn read_lines(path: &Path) -> Result<Vec<String>, String> {
    let data = fs::read_to_string(path)
        .map_err(|err| format!("Failed to read '{}': {err}", path.display()))?;
    Ok(data.lines().map(str::to_string).collect())
}

fn concatenated(pipeline: &Pipeline) -> Result<Pipeline, String> {
    let transforms = std::iter::once(Transform::reduce_to_single_sentence())
        .chain(pipeline.transforms().iter().cloned())
        .collect();
    Pipeline::new(transforms).map_err(|err| err.to_string())
}
