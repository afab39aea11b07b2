//! Training configuration and metrics

/// Training configuration
#[derive(Clone, Debug, PartialEq)]
pub struct TrainConfig {
    /// Maximum gradient norm for clipping (None = no clipping)
    pub max_grad_norm: Option<f32>,

    /// Log running loss every N steps of `train_epoch`
    pub log_interval: usize,

    /// Gradient accumulation steps (1 = no accumulation)
    ///
    /// Gradients of consecutive mini-batches are summed before a single
    /// optimizer step, so the effective batch size is
    /// `batch_size * gradient_accumulation_steps`.
    pub gradient_accumulation_steps: usize,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            max_grad_norm: None,
            log_interval: 10,
            gradient_accumulation_steps: 1,
        }
    }
}

impl TrainConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set gradient clipping norm
    pub fn with_grad_clip(mut self, max_norm: f32) -> Self {
        self.max_grad_norm = Some(max_norm);
        self
    }

    /// Disable gradient clipping
    pub fn without_grad_clip(mut self) -> Self {
        self.max_grad_norm = None;
        self
    }

    pub fn with_log_interval(mut self, interval: usize) -> Self {
        self.log_interval = interval.max(1);
        self
    }

    /// Set gradient accumulation steps, clamped to at least 1
    pub fn with_gradient_accumulation(mut self, steps: usize) -> Self {
        self.gradient_accumulation_steps = steps.max(1);
        self
    }
}

/// Tracks training metrics across epochs
#[derive(Clone, Debug, Default)]
pub struct MetricsTracker {
    /// Training loss history (one per epoch)
    pub losses: Vec<f32>,

    /// Validation loss history (one per evaluation)
    pub val_losses: Vec<f32>,

    /// Validation accuracy history (one per evaluation)
    pub val_accuracies: Vec<f32>,

    /// Learning rates (one per epoch)
    pub learning_rates: Vec<f32>,

    /// Training step count
    pub steps: usize,

    /// Completed epochs
    pub epoch: usize,
}

impl MetricsTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an epoch's training metrics
    pub fn record_epoch(&mut self, loss: f32, lr: f32) {
        self.losses.push(loss);
        self.learning_rates.push(lr);
        self.epoch += 1;
    }

    /// Record the outcome of an evaluation pass
    pub fn record_validation(&mut self, loss: f32, accuracy: f32) {
        self.val_losses.push(loss);
        self.val_accuracies.push(accuracy);
    }

    pub fn increment_step(&mut self) {
        self.steps += 1;
    }

    /// Get average loss over last N epochs
    pub fn avg_loss(&self, n: usize) -> f32 {
        if self.losses.is_empty() || n == 0 {
            return 0.0;
        }

        let start = self.losses.len().saturating_sub(n);
        let window = &self.losses[start..];
        window.iter().sum::<f32>() / window.len() as f32
    }

    /// Get best (minimum) loss
    pub fn best_loss(&self) -> Option<f32> {
        self.losses.iter().copied().min_by(f32::total_cmp)
    }

    /// Get best (minimum) validation loss
    pub fn best_val_loss(&self) -> Option<f32> {
        self.val_losses.iter().copied().min_by(f32::total_cmp)
    }

    /// True while each epoch loss is strictly below the previous one
    pub fn is_monotonically_decreasing(&self) -> bool {
        self.losses.windows(2).all(|pair| pair[1] < pair[0])
    }

    /// Whether the last `patience` epochs are not sorted ascending
    pub fn is_improving(&self, patience: usize) -> bool {
        if patience < 2 || self.losses.len() < patience {
            return true;
        }

        let recent = &self.losses[self.losses.len() - patience..];
        !recent.windows(2).all(|pair| pair[0] <= pair[1])
    }
}
