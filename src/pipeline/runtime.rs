#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::alignment::measures::ZeroLengthPolicy;
use crate::alignment::tokenization::Pipeline;
use crate::error::MetricsError;
use crate::pipeline::traits::SequenceAligner;
use crate::types::{
    CorpusStats, EvaluationOutput, Granularity, PairAlignment, TextInput, TokenSequence,
};

/// Normalizes, aligns and aggregates reference/hypothesis pairs.
///
/// Corpus metrics are always derived from the element-wise sum of per-pair
/// counts, never from an average of per-pair metric values.
pub struct MetricsEvaluator {
    reference_pipeline: Pipeline,
    hypothesis_pipeline: Pipeline,
    granularity: Granularity,
    zero_length_policy: ZeroLengthPolicy,
    parallel_threshold: usize,
    sequence_aligner: Box<dyn SequenceAligner>,
}

pub(crate) struct MetricsEvaluatorParts {
    pub reference_pipeline: Pipeline,
    pub hypothesis_pipeline: Pipeline,
    pub granularity: Granularity,
    pub zero_length_policy: ZeroLengthPolicy,
    pub parallel_threshold: usize,
    pub sequence_aligner: Box<dyn SequenceAligner>,
}

impl MetricsEvaluator {
    pub(crate) fn from_parts(parts: MetricsEvaluatorParts) -> Self {
        Self {
            reference_pipeline: parts.reference_pipeline,
            hypothesis_pipeline: parts.hypothesis_pipeline,
            granularity: parts.granularity,
            zero_length_policy: parts.zero_length_policy,
            parallel_threshold: parts.parallel_threshold,
            sequence_aligner: parts.sequence_aligner,
        }
    }

    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    pub fn zero_length_policy(&self) -> ZeroLengthPolicy {
        self.zero_length_policy
    }

    pub fn reference_pipeline(&self) -> &Pipeline {
        &self.reference_pipeline
    }

    pub fn hypothesis_pipeline(&self) -> &Pipeline {
        &self.hypothesis_pipeline
    }

    /// Evaluates positionally paired inputs. A single string on either side is
    /// a batch of one.
    pub fn evaluate(
        &self,
        reference: impl Into<TextInput>,
        hypothesis: impl Into<TextInput>,
    ) -> Result<EvaluationOutput, MetricsError> {
        let references = reference.into().into_sentences();
        let hypotheses = hypothesis.into().into_sentences();
        if references.len() != hypotheses.len() {
            return Err(MetricsError::arity(references.len(), hypotheses.len()));
        }

        let reference_tokens = self.reference_pipeline.tokenize(&references)?;
        let hypothesis_tokens = self.hypothesis_pipeline.tokenize(&hypotheses)?;
        if reference_tokens.len() != hypothesis_tokens.len() {
            // Filtering or joining transforms changed one side's sentence count.
            return Err(MetricsError::arity(
                reference_tokens.len(),
                hypothesis_tokens.len(),
            ));
        }

        let pairs = self.align_all(reference_tokens, hypothesis_tokens);
        let corpus: CorpusStats = pairs.iter().map(PairAlignment::counts).collect();

        tracing::debug!(
            pairs = corpus.pair_count,
            hits = corpus.counts.hits,
            substitutions = corpus.counts.substitutions,
            deletions = corpus.counts.deletions,
            insertions = corpus.counts.insertions,
            granularity = self.granularity.as_str(),
            "batch evaluated"
        );

        Ok(EvaluationOutput {
            granularity: self.granularity,
            zero_length_policy: self.zero_length_policy,
            corpus,
            pairs,
        })
    }

    /// Aligns two already-normalized token sequences.
    pub fn align_tokens(&self, reference: TokenSequence, hypothesis: TokenSequence) -> PairAlignment {
        let alignment = self.sequence_aligner.align(&reference, &hypothesis);
        PairAlignment {
            reference,
            hypothesis,
            alignment,
        }
    }

    fn align_all(
        &self,
        references: Vec<TokenSequence>,
        hypotheses: Vec<TokenSequence>,
    ) -> Vec<PairAlignment> {
        let pairs: Vec<(TokenSequence, TokenSequence)> =
            references.into_iter().zip(hypotheses).collect();

        #[cfg(feature = "parallel")]
        {
            if pairs.len() >= self.parallel_threshold {
                tracing::debug!(
                    pairs = pairs.len(),
                    threshold = self.parallel_threshold,
                    "aligning batch in parallel"
                );
                return pairs
                    .into_par_iter()
                    .map(|(reference, hypothesis)| self.align_tokens(reference, hypothesis))
                    .collect();
            }
        }

        pairs
            .into_iter()
            .map(|(reference, hypothesis)| self.align_tokens(reference, hypothesis))
            .collect()
    }
}
