use crate::alignment::edit_distance::align_sequences;
use crate::alignment::measures::ZeroLengthPolicy;
use crate::config::MetricsConfig;
use crate::error::MetricsError;
use crate::pipeline::builder::MetricsEvaluatorBuilder;
use crate::pipeline::runtime::MetricsEvaluator;
use crate::pipeline::traits::SequenceAligner;
use crate::types::{Alignment, EvaluationOutput, TextInput};

/// Levenshtein alignment with unit costs.
pub struct EditDistanceAligner;

impl SequenceAligner for EditDistanceAligner {
    fn align(&self, reference: &[String], hypothesis: &[String]) -> Alignment {
        align_sequences(reference, hypothesis)
    }
}

fn evaluator(config: MetricsConfig, policy: ZeroLengthPolicy) -> Result<MetricsEvaluator, MetricsError> {
    MetricsEvaluatorBuilder::new(config)
        .with_zero_length_policy(policy)
        .build()
}

/// Aligns word tokens using the default word pipeline.
pub fn process_words(
    reference: impl Into<TextInput>,
    hypothesis: impl Into<TextInput>,
    policy: ZeroLengthPolicy,
) -> Result<EvaluationOutput, MetricsError> {
    evaluator(MetricsConfig::default(), policy)?.evaluate(reference, hypothesis)
}

/// Aligns character tokens using the default character pipeline.
pub fn process_characters(
    reference: impl Into<TextInput>,
    hypothesis: impl Into<TextInput>,
    policy: ZeroLengthPolicy,
) -> Result<EvaluationOutput, MetricsError> {
    evaluator(MetricsConfig::character(), policy)?.evaluate(reference, hypothesis)
}

pub fn wer(
    reference: impl Into<TextInput>,
    hypothesis: impl Into<TextInput>,
    policy: ZeroLengthPolicy,
) -> Result<f64, MetricsError> {
    Ok(process_words(reference, hypothesis, policy)?.measures()?.wer)
}

pub fn mer(
    reference: impl Into<TextInput>,
    hypothesis: impl Into<TextInput>,
    policy: ZeroLengthPolicy,
) -> Result<f64, MetricsError> {
    Ok(process_words(reference, hypothesis, policy)?.measures()?.mer)
}

/// Word information lost. Defined for empty inputs regardless of `policy`.
pub fn wil(
    reference: impl Into<TextInput>,
    hypothesis: impl Into<TextInput>,
    policy: ZeroLengthPolicy,
) -> Result<f64, MetricsError> {
    let out = process_words(reference, hypothesis, policy)?;
    Ok(crate::alignment::measures::wil(&out.corpus.counts))
}

/// Word information preserved. Defined for empty inputs regardless of `policy`.
pub fn wip(
    reference: impl Into<TextInput>,
    hypothesis: impl Into<TextInput>,
    policy: ZeroLengthPolicy,
) -> Result<f64, MetricsError> {
    let out = process_words(reference, hypothesis, policy)?;
    Ok(crate::alignment::measures::wip(&out.corpus.counts))
}

pub fn cer(
    reference: impl Into<TextInput>,
    hypothesis: impl Into<TextInput>,
    policy: ZeroLengthPolicy,
) -> Result<f64, MetricsError> {
    process_characters(reference, hypothesis, policy)?.error_rate()
}
