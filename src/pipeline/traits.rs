use crate::types::Alignment;

/// Produces the edit-operation alignment of two token sequences.
pub trait SequenceAligner: Send + Sync {
    fn align(&self, reference: &[String], hypothesis: &[String]) -> Alignment;
}
