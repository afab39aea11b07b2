//! Parameter-free activation layers

use super::Module;
use crate::autograd::{log_softmax, relu};
use crate::error::Result;
use crate::Tensor;

/// Element-wise `max(0, x)`
#[derive(Debug, Clone, Copy, Default)]
pub struct ReLU;

impl ReLU {
    pub fn new() -> Self {
        Self
    }
}

impl Module for ReLU {
    fn forward(&self, input: &Tensor) -> Result<Tensor> {
        relu(input)
    }

    fn parameters(&self) -> Vec<Tensor> {
        Vec::new()
    }

    fn name(&self) -> &str {
        "ReLU"
    }
}

/// Numerically stable log-softmax over the last axis
///
/// Pair with [`NLLLoss`](crate::train::NLLLoss). Exponentiate the output
/// to recover class probabilities.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSoftmax;

impl LogSoftmax {
    pub fn new() -> Self {
        Self
    }
}

impl Module for LogSoftmax {
    fn forward(&self, input: &Tensor) -> Result<Tensor> {
        log_softmax(input)
    }

    fn parameters(&self) -> Vec<Tensor> {
        Vec::new()
    }

    fn name(&self) -> &str {
        "LogSoftmax"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::autograd::sum;
    use approx::assert_abs_diff_eq;
    use ndarray::arr2;

    #[test]
    fn test_relu_layer() {
        let x = Tensor::from_shape_vec(&[1, 3], vec![-2.0, 0.5, 3.0], true).unwrap();
        let y = ReLU::new().forward(&x).unwrap();
        assert_eq!(*y.data(), arr2(&[[0.0, 0.5, 3.0]]).into_dyn());
        assert!(ReLU.parameters().is_empty());
    }

    #[test]
    fn test_log_softmax_layer_is_normalized() {
        let x = Tensor::from_shape_vec(&[2, 2], vec![1.0, 1.0, 0.0, 50.0], true).unwrap();
        let y = LogSoftmax::new().forward(&x).unwrap();

        assert_abs_diff_eq!(y.data()[[0, 0]], -(2.0f32).ln(), epsilon = 1e-6);
        assert_abs_diff_eq!(y.data()[[1, 1]], 0.0, epsilon = 1e-6);

        // Each row of the backward rule sums to zero for a uniform upstream gradient
        sum(&y).unwrap().backward().unwrap();
        for row in x.grad().unwrap().rows() {
            assert_abs_diff_eq!(row.sum(), 0.0, epsilon = 1e-6);
        }
    }
}
