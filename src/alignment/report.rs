use std::cmp::Ordering;

use serde::Serialize;

use crate::alignment::measures::{self, float_repr, Measures, ZeroLengthPolicy};
use crate::types::{AlignmentChunk, EditCounts, EvaluationOutput, Granularity, PairAlignment};

pub const REPORT_SCHEMA_VERSION: u32 = 1;
const WORST_PAIRS_TOP_N: usize = 20;

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub schema_version: u32,
    pub meta: Meta,
    pub pairs: Vec<PairReport>,
    pub aggregates: AggregateReport,
}

#[derive(Debug, Clone, Serialize)]
pub struct Meta {
    pub generated_at: String,
    pub granularity: Granularity,
    pub zero_length_policy: ZeroLengthPolicy,
    pub pair_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct PairReport {
    pub index: usize,
    pub reference: String,
    pub hypothesis: String,
    pub counts: EditCounts,
    /// WER for word pipelines, CER for character pipelines.
    #[serde(serialize_with = "float_repr::option::serialize")]
    pub error_rate: Option<f64>,
    pub measures: Option<Measures>,
    pub chunks: Vec<AlignmentChunk>,
    pub notes: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AggregateReport {
    pub counts: AggregateCounts,
    pub corpus: EditCounts,
    #[serde(serialize_with = "float_repr::option::serialize")]
    pub error_rate: Option<f64>,
    pub measures: Option<Measures>,
    /// Mean of the defined per-pair error rates, for comparison with the
    /// corpus rate.
    #[serde(serialize_with = "float_repr::option::serialize")]
    pub mean_pair_error_rate: Option<f64>,
    pub worst_pairs: Vec<OutlierEntry>,
    pub notes: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AggregateCounts {
    pub total: u32,
    pub with_error_rate: u32,
    pub without_error_rate: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct OutlierEntry {
    pub index: usize,
    #[serde(serialize_with = "float_repr::serialize")]
    pub value: f64,
}

pub fn compute_pair_report(
    index: usize,
    pair: &PairAlignment,
    granularity: Granularity,
    policy: ZeroLengthPolicy,
) -> PairReport {
    let counts = pair.counts();
    let mut notes = Vec::new();

    if counts.reference_len() == 0 {
        notes.push("empty_reference".to_string());
    }
    if counts.hypothesis_len() == 0 {
        notes.push("empty_hypothesis".to_string());
    }

    let error_rate = match pair_error_rate(&counts, granularity, policy) {
        Ok(value) => Some(value),
        Err(err) => {
            notes.push(format!("error_rate_undefined: {err}"));
            None
        }
    };
    // Word-level measures only make sense for word tokens.
    let measures = match granularity {
        Granularity::Word => Measures::from_counts(&counts, policy).ok(),
        Granularity::Character => None,
    };

    PairReport {
        index,
        reference: join_tokens(&pair.reference, granularity),
        hypothesis: join_tokens(&pair.hypothesis, granularity),
        counts,
        error_rate,
        measures,
        chunks: pair.chunks().to_vec(),
        notes,
    }
}

pub fn aggregate_reports(
    pairs: &[PairReport],
    corpus: EditCounts,
    granularity: Granularity,
    policy: ZeroLengthPolicy,
) -> AggregateReport {
    let mut notes = Vec::new();
    let defined: Vec<f64> = pairs.iter().filter_map(|pair| pair.error_rate).collect();
    let without_error_rate = pairs.len().saturating_sub(defined.len());
    if without_error_rate > 0 {
        notes.push(format!("pairs_without_error_rate={without_error_rate}"));
    }

    let error_rate = match pair_error_rate(&corpus, granularity, policy) {
        Ok(value) => Some(value),
        Err(err) => {
            notes.push(format!("corpus_error_rate_undefined: {err}"));
            None
        }
    };
    let measures = match granularity {
        Granularity::Word => Measures::from_counts(&corpus, policy).ok(),
        Granularity::Character => None,
    };

    AggregateReport {
        counts: AggregateCounts {
            total: to_u32(pairs.len()),
            with_error_rate: to_u32(defined.len()),
            without_error_rate: to_u32(without_error_rate),
        },
        corpus,
        error_rate,
        measures,
        mean_pair_error_rate: mean(&defined),
        worst_pairs: ranked_outliers(pairs, WORST_PAIRS_TOP_N),
        notes,
    }
}

pub fn build_report(output: &EvaluationOutput, generated_at: String) -> Report {
    let pairs: Vec<PairReport> = output
        .pairs
        .iter()
        .enumerate()
        .map(|(index, pair)| {
            compute_pair_report(index, pair, output.granularity, output.zero_length_policy)
        })
        .collect();
    let aggregates = aggregate_reports(
        &pairs,
        output.corpus.counts,
        output.granularity,
        output.zero_length_policy,
    );

    Report {
        schema_version: REPORT_SCHEMA_VERSION,
        meta: Meta {
            generated_at,
            granularity: output.granularity,
            zero_length_policy: output.zero_length_policy,
            pair_count: output.corpus.pair_count,
        },
        pairs,
        aggregates,
    }
}

fn pair_error_rate(
    counts: &EditCounts,
    granularity: Granularity,
    policy: ZeroLengthPolicy,
) -> Result<f64, crate::error::MetricsError> {
    match granularity {
        Granularity::Word => measures::wer(counts, policy),
        Granularity::Character => measures::cer(counts, policy),
    }
}

fn ranked_outliers(pairs: &[PairReport], top_n: usize) -> Vec<OutlierEntry> {
    let mut entries: Vec<OutlierEntry> = pairs
        .iter()
        .filter_map(|pair| {
            pair.error_rate.map(|value| OutlierEntry {
                index: pair.index,
                value,
            })
        })
        .filter(|entry| entry.value > 0.0)
        .collect();

    entries.sort_by(|a, b| {
        b.value
            .partial_cmp(&a.value)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.index.cmp(&b.index))
    });
    entries.truncate(top_n);
    entries
}

fn join_tokens(tokens: &[String], granularity: Granularity) -> String {
    match granularity {
        Granularity::Word => tokens.join(" "),
        Granularity::Character => tokens.concat(),
    }
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

fn to_u32(value: usize) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}
