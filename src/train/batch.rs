//! Labelled mini-batch

use crate::error::{Error, Result};
use crate::Tensor;

/// One mini-batch: `[batch, features]` inputs and one class label per row
#[derive(Clone, Debug)]
pub struct Batch {
    pub inputs: Tensor,
    pub labels: Vec<usize>,
}

impl Batch {
    /// Pair inputs with labels, checking there is one label per row
    pub fn new(inputs: Tensor, labels: Vec<usize>) -> Result<Self> {
        let shape = inputs.shape();
        if shape.len() != 2 || shape[0] != labels.len() {
            return Err(Error::ShapeMismatch {
                op: "Batch::new",
                expected: vec![labels.len(), shape.last().copied().unwrap_or(0)],
                got: shape,
            });
        }
        Ok(Self { inputs, labels })
    }

    /// Build a batch from row-major feature data
    pub fn from_rows(data: Vec<f32>, features: usize, labels: Vec<usize>) -> Result<Self> {
        let inputs = Tensor::from_shape_vec(&[labels.len(), features], data, false)?;
        Self::new(inputs, labels)
    }

    /// Number of examples
    pub fn size(&self) -> usize {
        self.labels.len()
    }
}
