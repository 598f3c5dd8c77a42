pub mod alignment;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod types;

pub use alignment::measures::{Measures, MetricKind, MetricResult, ZeroLengthPolicy};
pub use alignment::tokenization::{Pipeline, Transform};
pub use config::MetricsConfig;
pub use error::MetricsError;
pub use pipeline::builder::MetricsEvaluatorBuilder;
pub use pipeline::defaults::{cer, mer, process_characters, process_words, wer, wil, wip};
pub use pipeline::runtime::MetricsEvaluator;
pub use pipeline::traits::SequenceAligner;
pub use types::{
    Alignment, AlignmentChunk, CorpusStats, EditCounts, EditOp, EvaluationOutput, Granularity,
    PairAlignment, TextInput, TokenSequence,
};
