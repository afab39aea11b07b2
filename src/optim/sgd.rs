//! Stochastic Gradient Descent optimizer

use super::Optimizer;
use crate::autograd::{dedup_by_id, TensorId};
use crate::Tensor;
use ndarray::ArrayD;
use std::collections::HashMap;

/// SGD optimizer with optional momentum
pub struct SGD {
    params: Vec<Tensor>,
    lr: f32,
    momentum: f32,
    velocities: HashMap<TensorId, ArrayD<f32>>,
}

impl SGD {
    /// Create a plain SGD optimizer: `param ← param − lr × grad`
    ///
    /// Repeated handles to one tensor are kept once, so each parameter is
    /// updated exactly once per step.
    pub fn new(params: Vec<Tensor>, lr: f32) -> Self {
        Self {
            params: dedup_by_id(params),
            lr,
            momentum: 0.0,
            velocities: HashMap::new(),
        }
    }

    /// Enable classic momentum: `v ← m·v − lr·grad; param ← param + v`
    pub fn with_momentum(mut self, momentum: f32) -> Self {
        self.momentum = momentum;
        self
    }

    pub fn momentum(&self) -> f32 {
        self.momentum
    }
}

impl Optimizer for SGD {
    fn step(&mut self) {
        for param in &self.params {
            let Some(grad) = param.grad() else {
                if param.requires_grad() {
                    tracing::warn!(param = ?param.id(), "SGD skipping parameter without gradient");
                }
                continue;
            };

            if self.momentum > 0.0 {
                // v = momentum * v - lr * grad
                let velocity = match self.velocities.get(&param.id()) {
                    Some(v) => v * self.momentum - &grad * self.lr,
                    None => &grad * (-self.lr),
                };

                *param.data_mut() += &velocity;
                self.velocities.insert(param.id(), velocity);
            } else {
                // Simple SGD: param -= lr * grad
                param.data_mut().scaled_add(-self.lr, &grad);
            }
        }
    }

    fn params(&self) -> &[Tensor] {
        &self.params
    }

    fn lr(&self) -> f32 {
        self.lr
    }

    fn set_lr(&mut self, lr: f32) {
        self.lr = lr;
    }
}
