use crate::alignment::measures::ZeroLengthPolicy;
use crate::alignment::tokenization::Pipeline;
use crate::config::MetricsConfig;
use crate::error::MetricsError;
use crate::pipeline::defaults::EditDistanceAligner;
use crate::pipeline::runtime::{MetricsEvaluator, MetricsEvaluatorParts};
use crate::pipeline::traits::SequenceAligner;
use crate::types::Granularity;

pub struct MetricsEvaluatorBuilder {
    config: MetricsConfig,
    reference_pipeline: Option<Pipeline>,
    hypothesis_pipeline: Option<Pipeline>,
    sequence_aligner: Option<Box<dyn SequenceAligner>>,
}

impl MetricsEvaluatorBuilder {
    pub fn new(config: MetricsConfig) -> Self {
        Self {
            config,
            reference_pipeline: None,
            hypothesis_pipeline: None,
            sequence_aligner: None,
        }
    }

    /// Uses `pipeline` for both references and hypotheses.
    pub fn with_pipeline(mut self, pipeline: Pipeline) -> Self {
        self.hypothesis_pipeline = Some(pipeline.clone());
        self.reference_pipeline = Some(pipeline);
        self
    }

    pub fn with_reference_pipeline(mut self, pipeline: Pipeline) -> Self {
        self.reference_pipeline = Some(pipeline);
        self
    }

    pub fn with_hypothesis_pipeline(mut self, pipeline: Pipeline) -> Self {
        self.hypothesis_pipeline = Some(pipeline);
        self
    }

    pub fn with_zero_length_policy(mut self, policy: ZeroLengthPolicy) -> Self {
        self.config.zero_length_policy = policy;
        self
    }

    pub fn with_parallel_threshold(mut self, threshold: usize) -> Self {
        self.config.parallel_threshold = threshold;
        self
    }

    pub fn with_sequence_aligner(mut self, sequence_aligner: Box<dyn SequenceAligner>) -> Self {
        self.sequence_aligner = Some(sequence_aligner);
        self
    }

    pub fn build(self) -> Result<MetricsEvaluator, MetricsError> {
        let reference_pipeline = match self.reference_pipeline {
            Some(pipeline) => pipeline,
            None => self.config.reference_pipeline()?,
        };
        let hypothesis_pipeline = match self.hypothesis_pipeline {
            Some(pipeline) => pipeline,
            None => self.config.hypothesis_pipeline()?,
        };

        let reference_granularity = segmenting_granularity("reference", &reference_pipeline)?;
        let hypothesis_granularity = segmenting_granularity("hypothesis", &hypothesis_pipeline)?;
        if reference_granularity != hypothesis_granularity {
            return Err(MetricsError::configuration(format!(
                "reference pipeline yields {} tokens but hypothesis pipeline yields {} tokens",
                reference_granularity.as_str(),
                hypothesis_granularity.as_str()
            )));
        }

        tracing::debug!(
            granularity = reference_granularity.as_str(),
            reference_transforms = reference_pipeline.transforms().len(),
            hypothesis_transforms = hypothesis_pipeline.transforms().len(),
            policy = ?self.config.zero_length_policy,
            "metrics evaluator built"
        );

        Ok(MetricsEvaluator::from_parts(MetricsEvaluatorParts {
            reference_pipeline,
            hypothesis_pipeline,
            granularity: reference_granularity,
            zero_length_policy: self.config.zero_length_policy,
            parallel_threshold: self.config.parallel_threshold,
            sequence_aligner: self
                .sequence_aligner
                .unwrap_or_else(|| Box::new(EditDistanceAligner)),
        }))
    }
}

fn segmenting_granularity(side: &str, pipeline: &Pipeline) -> Result<Granularity, MetricsError> {
    pipeline.granularity().ok_or_else(|| {
        MetricsError::configuration(format!(
            "{side} pipeline must end in split-into-words or split-into-characters"
        ))
    })
}
