use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::alignment::measures::ZeroLengthPolicy;
use crate::alignment::tokenization::{Pipeline, Transform};
use crate::error::MetricsError;
use crate::types::Granularity;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub granularity: Granularity,
    pub zero_length_policy: ZeroLengthPolicy,
    /// Custom reference pipeline; the granularity preset is used when absent.
    pub transforms: Option<Vec<Transform>>,
    /// Hypothesis pipeline when it must differ from the reference one.
    pub hypothesis_transforms: Option<Vec<Transform>>,
    /// Batches with at least this many pairs are aligned in parallel.
    pub parallel_threshold: usize,
}

impl MetricsConfig {
    pub const DEFAULT_PARALLEL_THRESHOLD: usize = 64;

    pub fn load(path: &Path) -> Result<Self, MetricsError> {
        let data = std::fs::read_to_string(path)
            .map_err(|e| MetricsError::io("read metrics config", e))?;
        serde_json::from_str(&data).map_err(|e| MetricsError::json("parse metrics config", e))
    }

    pub fn character() -> Self {
        Self {
            granularity: Granularity::Character,
            ..Self::default()
        }
    }

    pub fn reference_pipeline(&self) -> Result<Pipeline, MetricsError> {
        self.build_pipeline(self.transforms.as_ref())
    }

    pub fn hypothesis_pipeline(&self) -> Result<Pipeline, MetricsError> {
        self.build_pipeline(self.hypothesis_transforms.as_ref().or(self.transforms.as_ref()))
    }

    fn build_pipeline(&self, transforms: Option<&Vec<Transform>>) -> Result<Pipeline, MetricsError> {
        let Some(transforms) = transforms else {
            return Ok(Pipeline::for_granularity(self.granularity));
        };
        let pipeline = Pipeline::new(transforms.clone())?;
        match pipeline.granularity() {
            None => Err(MetricsError::configuration(format!(
                "{} pipeline does not end in a segmentation transform",
                self.granularity.as_str()
            ))),
            Some(g) if g != self.granularity => Err(MetricsError::configuration(format!(
                "pipeline segments into {} tokens but granularity is {}",
                g.as_str(),
                self.granularity.as_str()
            ))),
            Some(_) => Ok(pipeline),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            granularity: Granularity::Word,
            zero_length_policy: ZeroLengthPolicy::Strict,
            transforms: None,
            hypothesis_transforms: None,
            parallel_threshold: Self::DEFAULT_PARALLEL_THRESHOLD,
        }
    }
}
