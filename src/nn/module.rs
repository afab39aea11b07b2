//! Module trait shared by layers and containers

use crate::error::Result;
use crate::Tensor;

/// A differentiable computation with trainable parameters
///
/// `parameters` returns shared handles: updating their data or gradients
/// through the returned tensors updates the layer itself.
pub trait Module {
    /// Forward pass, recording the graph when gradient tracking is enabled
    fn forward(&self, input: &Tensor) -> Result<Tensor>;

    /// All trainable parameters, in a stable order
    fn parameters(&self) -> Vec<Tensor>;

    fn name(&self) -> &str;

    /// Zero every parameter gradient in place
    fn zero_grad(&self) {
        for param in self.parameters() {
            param.zero_grad();
        }
    }

    /// Total number of trainable scalars
    fn num_parameters(&self) -> usize {
        self.parameters().iter().map(Tensor::len).sum()
    }
}

impl<M: Module + ?Sized> Module for Box<M> {
    fn forward(&self, input: &Tensor) -> Result<Tensor> {
        (**self).forward(input)
    }

    fn parameters(&self) -> Vec<Tensor> {
        (**self).parameters()
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
