//! Loss functions for training

use crate::autograd::{cross_entropy, nll_loss};
use crate::error::Result;
use crate::Tensor;

/// Trait for classification losses over integer labels
pub trait LossFn {
    /// Compute the mean loss of a batch as a zero-dimensional tensor
    ///
    /// The result is part of the graph, so calling `backward` on it reaches
    /// the parameters that produced `output`.
    fn forward(&self, output: &Tensor, labels: &[usize]) -> Result<Tensor>;

    /// Name of the loss function
    fn name(&self) -> &str;
}

/// Negative log-likelihood over log-probabilities
///
/// L = mean_r(−log_probs[r, label_r])
///
/// # Example
///
/// ```
/// use gradiente::train::{NLLLoss, LossFn};
/// use gradiente::Tensor;
///
/// let log_probs = Tensor::from_shape_vec(&[1, 2], vec![-0.1, -2.4], true).unwrap();
/// let loss = NLLLoss.forward(&log_probs, &[0]).unwrap();
/// assert!((loss.item().unwrap() - 0.1).abs() < 1e-6);
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct NLLLoss;

impl LossFn for NLLLoss {
    fn forward(&self, output: &Tensor, labels: &[usize]) -> Result<Tensor> {
        nll_loss(output, labels)
    }

    fn name(&self) -> &str {
        "NLL"
    }
}

/// Cross entropy over raw logits
///
/// L = mean_r(−log_softmax(logits)[r, label_r])
#[derive(Clone, Copy, Debug, Default)]
pub struct CrossEntropyLoss;

impl LossFn for CrossEntropyLoss {
    fn forward(&self, output: &Tensor, labels: &[usize]) -> Result<Tensor> {
        cross_entropy(output, labels)
    }

    fn name(&self) -> &str {
        "CrossEntropy"
    }
}
