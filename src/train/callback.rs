//! Callback system for training events
//!
//! Provides extensible hooks for training loop events:
//! - `on_train_begin` / `on_train_end`
//! - `on_epoch_begin` / `on_epoch_end`
//! - `on_step_begin` / `on_step_end`
//!
//! # Example
//!
//! ```rust
//! use gradiente::train::callback::{TrainerCallback, CallbackContext, CallbackAction};
//!
//! struct StopAtLoss(f32);
//!
//! impl TrainerCallback for StopAtLoss {
//!     fn on_epoch_end(&mut self, ctx: &CallbackContext) -> CallbackAction {
//!         if ctx.loss < self.0 {
//!             CallbackAction::Stop
//!         } else {
//!             CallbackAction::Continue
//!         }
//!     }
//! }
//! ```

/// Context passed to callbacks with current training state
#[derive(Clone, Debug, Default)]
pub struct CallbackContext {
    /// Current epoch (0-indexed)
    pub epoch: usize,
    /// Total epochs planned
    pub max_epochs: usize,
    /// Current step within epoch
    pub step: usize,
    /// Total steps in epoch
    pub steps_per_epoch: usize,
    /// Global step count
    pub global_step: usize,
    /// Loss of the current step, or average loss at epoch boundaries
    pub loss: f32,
    /// Current learning rate
    pub lr: f32,
    /// Best epoch loss seen so far
    pub best_loss: Option<f32>,
    /// Validation loss (if available)
    pub val_loss: Option<f32>,
    /// Training duration in seconds
    pub elapsed_secs: f64,
}

/// Action to take after a callback
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CallbackAction {
    /// Continue training normally
    Continue,
    /// Stop training (early stopping)
    Stop,
    /// Skip rest of current epoch
    SkipEpoch,
}

/// Trait for training callbacks
///
/// All methods default to no-ops returning [`CallbackAction::Continue`], so
/// implementors only override the events they care about.
pub trait TrainerCallback {
    /// Called before training starts
    fn on_train_begin(&mut self, _ctx: &CallbackContext) -> CallbackAction {
        CallbackAction::Continue
    }

    /// Called after training ends
    fn on_train_end(&mut self, _ctx: &CallbackContext) {}

    /// Called before each epoch
    fn on_epoch_begin(&mut self, _ctx: &CallbackContext) -> CallbackAction {
        CallbackAction::Continue
    }

    /// Called after each epoch
    fn on_epoch_end(&mut self, _ctx: &CallbackContext) -> CallbackAction {
        CallbackAction::Continue
    }

    /// Called before each training step
    fn on_step_begin(&mut self, _ctx: &CallbackContext) -> CallbackAction {
        CallbackAction::Continue
    }

    /// Called after each training step
    fn on_step_end(&mut self, _ctx: &CallbackContext) -> CallbackAction {
        CallbackAction::Continue
    }

    fn name(&self) -> &str {
        "TrainerCallback"
    }
}

// =============================================================================
// Early Stopping Callback
// =============================================================================

/// Early stopping callback to halt training when loss plateaus
///
/// Stops training once `patience` consecutive epochs fail to improve the
/// best loss by more than `min_delta`.
///
/// ```rust
/// use gradiente::train::callback::EarlyStopping;
///
/// let early_stop = EarlyStopping::new(5, 0.001).monitor_validation();
/// ```
#[derive(Clone, Debug)]
pub struct EarlyStopping {
    patience: usize,
    min_delta: f32,
    best_loss: f32,
    epochs_without_improvement: usize,
    monitor_val: bool,
}

impl EarlyStopping {
    pub fn new(patience: usize, min_delta: f32) -> Self {
        Self {
            patience,
            min_delta,
            best_loss: f32::INFINITY,
            epochs_without_improvement: 0,
            monitor_val: false,
        }
    }

    /// Watch validation loss, falling back to training loss when absent
    pub fn monitor_validation(mut self) -> Self {
        self.monitor_val = true;
        self
    }

    pub fn reset(&mut self) {
        self.best_loss = f32::INFINITY;
        self.epochs_without_improvement = 0;
    }

    pub fn best_loss(&self) -> f32 {
        self.best_loss
    }

    fn check_improvement(&mut self, loss: f32) -> bool {
        if loss < self.best_loss - self.min_delta {
            self.best_loss = loss;
            self.epochs_without_improvement = 0;
            true
        } else {
            self.epochs_without_improvement += 1;
            false
        }
    }
}

impl TrainerCallback for EarlyStopping {
    fn on_epoch_end(&mut self, ctx: &CallbackContext) -> CallbackAction {
        let loss = match (self.monitor_val, ctx.val_loss) {
            (true, Some(val_loss)) => val_loss,
            _ => ctx.loss,
        };
        self.check_improvement(loss);

        if self.epochs_without_improvement < self.patience {
            return CallbackAction::Continue;
        }

        tracing::info!(
            patience = self.patience,
            best_loss = self.best_loss,
            epoch = ctx.epoch,
            "early stopping: loss stopped improving"
        );
        CallbackAction::Stop
    }

    fn name(&self) -> &str {
        "EarlyStopping"
    }
}

// =============================================================================
// Progress Callback
// =============================================================================

/// Logs training progress through `tracing`
#[derive(Clone, Debug)]
pub struct ProgressCallback {
    /// Log every N steps
    log_interval: usize,
}

impl ProgressCallback {
    pub fn new(log_interval: usize) -> Self {
        Self {
            log_interval: log_interval.max(1),
        }
    }
}

impl Default for ProgressCallback {
    fn default() -> Self {
        Self::new(10)
    }
}

impl TrainerCallback for ProgressCallback {
    fn on_epoch_begin(&mut self, ctx: &CallbackContext) -> CallbackAction {
        tracing::info!(
            epoch = ctx.epoch + 1,
            max_epochs = ctx.max_epochs,
            lr = ctx.lr,
            "epoch starting"
        );
        CallbackAction::Continue
    }

    fn on_epoch_end(&mut self, ctx: &CallbackContext) -> CallbackAction {
        tracing::info!(
            epoch = ctx.epoch + 1,
            max_epochs = ctx.max_epochs,
            loss = ctx.loss,
            val_loss = ctx.val_loss,
            elapsed_secs = ctx.elapsed_secs,
            "epoch finished"
        );
        CallbackAction::Continue
    }

    fn on_step_end(&mut self, ctx: &CallbackContext) -> CallbackAction {
        if (ctx.step + 1) % self.log_interval == 0 {
            tracing::info!(
                step = ctx.step + 1,
                steps_per_epoch = ctx.steps_per_epoch,
                loss = ctx.loss,
                "training step"
            );
        }
        CallbackAction::Continue
    }

    fn name(&self) -> &str {
        "ProgressCallback"
    }
}

// =============================================================================
// Callback Manager
// =============================================================================

/// Manages multiple callbacks and dispatches events in registration order
///
/// Dispatch short-circuits: the first callback asking to stop (or skip the
/// epoch) wins and later callbacks do not see the event.
#[derive(Default)]
pub struct CallbackManager {
    callbacks: Vec<Box<dyn TrainerCallback>>,
}

impl CallbackManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<C: TrainerCallback + 'static>(&mut self, callback: C) {
        self.callbacks.push(Box::new(callback));
    }

    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    /// Names of registered callbacks, in dispatch order
    pub fn names(&self) -> Vec<&str> {
        self.callbacks.iter().map(|cb| cb.name()).collect()
    }

    fn dispatch<F>(&mut self, mut event: F) -> CallbackAction
    where
        F: FnMut(&mut dyn TrainerCallback) -> CallbackAction,
    {
        for cb in &mut self.callbacks {
            match event(cb.as_mut()) {
                CallbackAction::Continue => {}
                action => {
                    tracing::debug!(callback = cb.name(), ?action, "callback interrupted training");
                    return action;
                }
            }
        }
        CallbackAction::Continue
    }

    pub fn on_train_begin(&mut self, ctx: &CallbackContext) -> CallbackAction {
        self.dispatch(|cb| cb.on_train_begin(ctx))
    }

    pub fn on_train_end(&mut self, ctx: &CallbackContext) {
        for cb in &mut self.callbacks {
            cb.on_train_end(ctx);
        }
    }

    pub fn on_epoch_begin(&mut self, ctx: &CallbackContext) -> CallbackAction {
        self.dispatch(|cb| cb.on_epoch_begin(ctx))
    }

    pub fn on_epoch_end(&mut self, ctx: &CallbackContext) -> CallbackAction {
        self.dispatch(|cb| cb.on_epoch_end(ctx))
    }

    pub fn on_step_begin(&mut self, ctx: &CallbackContext) -> CallbackAction {
        self.dispatch(|cb| cb.on_step_begin(ctx))
    }

    pub fn on_step_end(&mut self, ctx: &CallbackContext) -> CallbackAction {
        self.dispatch(|cb| cb.on_step_end(ctx))
    }
}
