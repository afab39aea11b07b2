//! Adam optimizer

use super::Optimizer;
use crate::autograd::{dedup_by_id, TensorId};
use crate::Tensor;
use ndarray::ArrayD;
use std::collections::HashMap;

/// First and second moment estimates for one parameter
struct Moments {
    m: ArrayD<f32>,
    v: ArrayD<f32>,
}

/// Adam optimizer (Adaptive Moment Estimation)
pub struct Adam {
    params: Vec<Tensor>,
    lr: f32,
    beta1: f32,
    beta2: f32,
    epsilon: f32,
    t: u64,
    moments: HashMap<TensorId, Moments>,
}

impl Adam {
    /// Create a new Adam optimizer
    pub fn new(params: Vec<Tensor>, lr: f32, beta1: f32, beta2: f32, epsilon: f32) -> Self {
        Self {
            params: dedup_by_id(params),
            lr,
            beta1,
            beta2,
            epsilon,
            t: 0,
            moments: HashMap::new(),
        }
    }

    /// Create Adam with default parameters
    pub fn default_params(params: Vec<Tensor>, lr: f32) -> Self {
        Self::new(params, lr, 0.9, 0.999, 1e-8)
    }

    /// Number of steps taken so far
    pub fn step_count(&self) -> u64 {
        self.t
    }
}

impl Optimizer for Adam {
    fn step(&mut self) {
        self.t += 1;

        // Bias correction factors
        let lr_t = self.lr
            * ((1.0 - self.beta2.powi(self.t as i32)).sqrt()
                / (1.0 - self.beta1.powi(self.t as i32)));

        for param in &self.params {
            let Some(grad) = param.grad() else {
                if param.requires_grad() {
                    tracing::warn!(param = ?param.id(), "Adam skipping parameter without gradient");
                }
                continue;
            };

            let grad_sq = &grad * &grad;
            let (m_t, v_t) = match self.moments.get(&param.id()) {
                // m_t = β1 * m_{t-1} + (1 - β1) * g
                // v_t = β2 * v_{t-1} + (1 - β2) * g²
                Some(Moments { m, v }) => (
                    m * self.beta1 + &grad * (1.0 - self.beta1),
                    v * self.beta2 + &grad_sq * (1.0 - self.beta2),
                ),
                None => (&grad * (1.0 - self.beta1), &grad_sq * (1.0 - self.beta2)),
            };

            // θ_t = θ_{t-1} - lr_t * m_t / (√v_t + ε)
            let update = &m_t / &(v_t.mapv(f32::sqrt) + self.epsilon) * lr_t;
            *param.data_mut() -= &update;

            self.moments.insert(param.id(), Moments { m: m_t, v: v_t });
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
