use std::iter::Sum;
use std::ops::{Add, AddAssign};

use serde::{Deserialize, Serialize};

use crate::alignment::measures::{self, Measures, MetricKind, MetricResult, ZeroLengthPolicy};
use crate::error::MetricsError;

/// Ordered tokens (words or single characters) of one normalized sentence.
pub type TokenSequence = Vec<String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    #[default]
    Word,
    Character,
}

impl Granularity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Word => "word",
            Self::Character => "character",
        }
    }
}

/// One side of an evaluation: a single utterance or positionally paired utterances.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TextInput {
    Single(String),
    Batch(Vec<String>),
}

impl TextInput {
    pub fn len(&self) -> usize {
        match self {
            Self::Single(_) => 1,
            Self::Batch(sentences) => sentences.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn into_sentences(self) -> Vec<String> {
        match self {
            Self::Single(sentence) => vec![sentence],
            Self::Batch(sentences) => sentences,
        }
    }
}

impl From<&str> for TextInput {
    fn from(value: &str) -> Self {
        Self::Single(value.to_string())
    }
}

impl From<String> for TextInput {
    fn from(value: String) -> Self {
        Self::Single(value)
    }
}

impl From<Vec<String>> for TextInput {
    fn from(value: Vec<String>) -> Self {
        Self::Batch(value)
    }
}

impl From<Vec<&str>> for TextInput {
    fn from(value: Vec<&str>) -> Self {
        Self::Batch(value.into_iter().map(str::to_string).collect())
    }
}

impl From<&[&str]> for TextInput {
    fn from(value: &[&str]) -> Self {
        Self::Batch(value.iter().map(|s| s.to_string()).collect())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EditOp {
    Equal,
    Substitute,
    Delete,
    Insert,
}

impl EditOp {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Equal => "equal",
            Self::Substitute => "substitute",
            Self::Delete => "delete",
            Self::Insert => "insert",
        }
    }
}

/// Maximal run of a single edit operation.
///
/// Ranges are half-open: `[ref_start, ref_end)` in the reference and
/// `[hyp_start, hyp_end)` in the hypothesis. Deletions have an empty hypothesis
/// range and insertions an empty reference range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlignmentChunk {
    pub op: EditOp,
    pub ref_start: usize,
    pub ref_end: usize,
    pub hyp_start: usize,
    pub hyp_end: usize,
}

impl AlignmentChunk {
    pub fn ref_len(&self) -> usize {
        self.ref_end - self.ref_start
    }

    pub fn hyp_len(&self) -> usize {
        self.hyp_end - self.hyp_start
    }

    /// Number of edit operations (or hits, for `Equal`) the chunk covers.
    pub fn len(&self) -> usize {
        self.ref_len().max(self.hyp_len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Hit and edit counts of one reference/hypothesis pair, or of a whole corpus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EditCounts {
    pub hits: usize,
    pub substitutions: usize,
    pub deletions: usize,
    pub insertions: usize,
}

impl EditCounts {
    pub fn from_chunks(chunks: &[AlignmentChunk]) -> Self {
        let mut counts = Self::default();
        for chunk in chunks {
            let n = chunk.len();
            match chunk.op {
                EditOp::Equal => counts.hits += n,
                EditOp::Substitute => counts.substitutions += n,
                EditOp::Delete => counts.deletions += n,
                EditOp::Insert => counts.insertions += n,
            }
        }
        counts
    }

    pub fn reference_len(&self) -> usize {
        self.hits + self.substitutions + self.deletions
    }

    pub fn hypothesis_len(&self) -> usize {
        self.hits + self.substitutions + self.insertions
    }

    /// Substitutions + deletions + insertions, i.e. the edit distance.
    pub fn errors(&self) -> usize {
        self.substitutions + self.deletions + self.insertions
    }

    /// Same counts with reference and hypothesis roles exchanged.
    pub fn swapped(&self) -> Self {
        Self {
            hits: self.hits,
            substitutions: self.substitutions,
            deletions: self.insertions,
            insertions: self.deletions,
        }
    }
}

impl Add for EditCounts {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            hits: self.hits + rhs.hits,
            substitutions: self.substitutions + rhs.substitutions,
            deletions: self.deletions + rhs.deletions,
            insertions: self.insertions + rhs.insertions,
        }
    }
}

impl AddAssign for EditCounts {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sum for EditCounts {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

/// Element-wise sum of per-pair counts over a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CorpusStats {
    pub counts: EditCounts,
    pub pair_count: usize,
}

impl CorpusStats {
    pub fn push(&mut self, counts: EditCounts) {
        self.counts += counts;
        self.pair_count += 1;
    }

    /// Combines two partial sums; order does not matter.
    pub fn merge(self, other: Self) -> Self {
        Self {
            counts: self.counts + other.counts,
            pair_count: self.pair_count + other.pair_count,
        }
    }
}

impl FromIterator<EditCounts> for CorpusStats {
    fn from_iter<I: IntoIterator<Item = EditCounts>>(iter: I) -> Self {
        let mut stats = Self::default();
        for counts in iter {
            stats.push(counts);
        }
        stats
    }
}

/// Minimum-edit-distance alignment of one reference/hypothesis pair.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Alignment {
    pub chunks: Vec<AlignmentChunk>,
    pub counts: EditCounts,
}

impl Alignment {
    pub fn from_chunks(chunks: Vec<AlignmentChunk>) -> Self {
        let counts = EditCounts::from_chunks(&chunks);
        Self { chunks, counts }
    }

    pub fn edit_distance(&self) -> usize {
        self.counts.errors()
    }
}

/// Normalized tokens and alignment of one reference/hypothesis pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PairAlignment {
    pub reference: TokenSequence,
    pub hypothesis: TokenSequence,
    pub alignment: Alignment,
}

impl PairAlignment {
    pub fn counts(&self) -> EditCounts {
        self.alignment.counts
    }

    pub fn chunks(&self) -> &[AlignmentChunk] {
        &self.alignment.chunks
    }

    pub fn measures(&self, policy: ZeroLengthPolicy) -> Result<Measures, MetricsError> {
        Measures::from_counts(&self.alignment.counts, policy)
    }
}

/// Result of evaluating a batch: per-pair alignments and their summed counts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationOutput {
    pub granularity: Granularity,
    pub zero_length_policy: ZeroLengthPolicy,
    pub corpus: CorpusStats,
    pub pairs: Vec<PairAlignment>,
}

impl EvaluationOutput {
    /// Corpus-level metrics computed from the summed counts.
    pub fn measures(&self) -> Result<Measures, MetricsError> {
        Measures::from_counts(&self.corpus.counts, self.zero_length_policy)
    }

    pub fn metric(&self, kind: MetricKind) -> Result<MetricResult, MetricsError> {
        if kind == MetricKind::Cer && self.granularity != Granularity::Character {
            return Err(MetricsError::configuration(
                "cer requires a character-level pipeline",
            ));
        }
        measures::compute_metric(kind, &self.corpus.counts, self.zero_length_policy)
    }

    /// WER for word pipelines, CER for character pipelines.
    pub fn error_rate(&self) -> Result<f64, MetricsError> {
        match self.granularity {
            Granularity::Word => measures::wer(&self.corpus.counts, self.zero_length_policy),
            Granularity::Character => measures::cer(&self.corpus.counts, self.zero_length_policy),
        }
    }

    /// Arithmetic mean of per-pair error rates. Differs from
    /// [`error_rate`](Self::error_rate) whenever reference lengths differ.
    pub fn mean_pair_error_rate(&self) -> Result<f64, MetricsError> {
        if self.pairs.is_empty() {
            return Ok(0.0);
        }
        let mut total = 0.0;
        for pair in &self.pairs {
            total += match self.granularity {
                Granularity::Word => measures::wer(&pair.alignment.counts, self.zero_length_policy)?,
                Granularity::Character => {
                    measures::cer(&pair.alignment.counts, self.zero_length_policy)?
                }
            };
        }
        Ok(total / self.pairs.len() as f64)
    }
}
