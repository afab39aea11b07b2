//! Optimizer trait

use crate::Tensor;

/// Trait for optimization algorithms
///
/// An optimizer holds shared handles to the parameters it updates, so
/// `step` and `zero_grad` need no arguments.
pub trait Optimizer {
    /// Perform a single optimization step using the current gradients
    fn step(&mut self);

    /// Zero out all gradients
    fn zero_grad(&mut self) {
        for param in self.params() {
            param.zero_grad();
        }
    }

    /// Parameters updated by this optimizer
    fn params(&self) -> &[Tensor];

    /// Get learning rate
    fn lr(&self) -> f32;

    /// Set learning rate
    fn set_lr(&mut self, lr: f32);
}
