//! Trainer abstraction for training loops

use super::callback::{CallbackAction, CallbackContext, CallbackManager, TrainerCallback};
use super::{Batch, LossFn, MetricsTracker, TrainConfig};
use crate::autograd::with_no_grad;
use crate::error::Result;
use crate::nn::Module;
use crate::optim::{clip_grad_norm, Optimizer};
use crate::Tensor;
use ndarray::Axis;
use std::time::Instant;

/// Result of a training run
#[derive(Debug, Clone)]
pub struct TrainResult {
    /// Number of completed epochs
    pub final_epoch: usize,
    /// Average loss of the last completed epoch
    pub final_loss: f32,
    /// Best epoch loss achieved
    pub best_loss: f32,
    /// Whether a callback stopped training
    pub stopped_early: bool,
    /// Total training time in seconds
    pub elapsed_secs: f64,
}

/// Result of an evaluation pass
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvalResult {
    /// Example-weighted mean loss
    pub loss: f32,
    /// Fraction of rows whose arg-max matches the label
    pub accuracy: f32,
    /// Number of examples seen
    pub samples: usize,
}

/// High-level trainer that orchestrates the training loop
///
/// # Example
///
/// ```no_run
/// use gradiente::nn::{Linear, LogSoftmax, Module, ReLU, Sequential};
/// use gradiente::optim::SGD;
/// use gradiente::train::{synthetic, EarlyStopping, NLLLoss, TrainConfig, Trainer};
///
/// let model = Sequential::new()
///     .add(Linear::new(4, 16).unwrap())
///     .add(ReLU)
///     .add(Linear::new(16, 3).unwrap())
///     .add(LogSoftmax);
/// let optimizer = SGD::new(model.parameters(), 0.05);
///
/// let mut trainer = Trainer::new(
///     model,
///     Box::new(optimizer),
///     Box::new(NLLLoss),
///     TrainConfig::default(),
/// );
/// trainer.add_callback(EarlyStopping::new(5, 0.001));
///
/// let batches = synthetic::ClusterSpec::new(4, 3).generate(160, 8, 42).unwrap();
/// let result = trainer.train(10, || batches.clone()).unwrap();
/// println!("trained {} epochs, final loss {:.4}", result.final_epoch, result.final_loss);
/// ```
pub struct Trainer<M: Module> {
    model: M,
    optimizer: Box<dyn Optimizer>,
    loss_fn: Box<dyn LossFn>,
    config: TrainConfig,

    /// Metrics tracker
    pub metrics: MetricsTracker,

    callbacks: CallbackManager,
    best_loss: Option<f32>,
    start_time: Option<Instant>,
}

impl<M: Module> Trainer<M> {
    /// Create a new trainer
    ///
    /// The optimizer should have been built from `model.parameters()`.
    pub fn new(
        model: M,
        optimizer: Box<dyn Optimizer>,
        loss_fn: Box<dyn LossFn>,
        config: TrainConfig,
    ) -> Self {
        Self {
            model,
            optimizer,
            loss_fn,
            config,
            metrics: MetricsTracker::new(),
            callbacks: CallbackManager::new(),
            best_loss: None,
            start_time: None,
        }
    }

    /// Add a callback to the trainer
    pub fn add_callback<C: TrainerCallback + 'static>(&mut self, callback: C) {
        self.callbacks.add(callback);
    }

    /// Get current learning rate
    pub fn lr(&self) -> f32 {
        self.optimizer.lr()
    }

    /// Set learning rate
    pub fn set_lr(&mut self, lr: f32) {
        self.optimizer.set_lr(lr);
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    /// Consume the trainer, returning the trained model
    pub fn into_model(self) -> M {
        self.model
    }

    pub fn config(&self) -> &TrainConfig {
        &self.config
    }

    /// Parameters updated by the optimizer
    pub fn params(&self) -> &[Tensor] {
        self.optimizer.params()
    }

    fn build_context(
        &self,
        epoch: usize,
        max_epochs: usize,
        step: usize,
        steps_per_epoch: usize,
        loss: f32,
    ) -> CallbackContext {
        CallbackContext {
            epoch,
            max_epochs,
            step,
            steps_per_epoch,
            global_step: self.metrics.steps,
            loss,
            lr: self.lr(),
            best_loss: self.best_loss,
            val_loss: self.metrics.val_losses.last().copied(),
            elapsed_secs: self
                .start_time
                .map(|t| t.elapsed().as_secs_f64())
                .unwrap_or(0.0),
        }
    }

    /// Perform a single training step
    ///
    /// Zeroes gradients, runs forward and loss, backpropagates, clips if
    /// configured and applies one optimizer step. Returns the batch loss.
    pub fn train_step(&mut self, batch: &Batch) -> Result<f32> {
        self.optimizer.zero_grad();
        let loss = self.accumulate_gradients(batch)?;
        self.apply_update();
        self.metrics.increment_step();
        Ok(loss)
    }

    /// Forward and backward without an optimizer step
    ///
    /// Gradients add onto whatever the parameters already hold.
    fn accumulate_gradients(&mut self, batch: &Batch) -> Result<f32> {
        let output = self.model.forward(&batch.inputs)?;
        let loss = self.loss_fn.forward(&output, &batch.labels)?;
        let loss_val = loss.item()?;
        loss.backward()?;
        Ok(loss_val)
    }

    fn apply_update(&mut self) {
        if let Some(max_norm) = self.config.max_grad_norm {
            clip_grad_norm(self.optimizer.params(), max_norm);
        }
        self.optimizer.step();
    }

    /// Train for one epoch, returning the average batch loss
    pub fn train_epoch<I>(&mut self, batches: I) -> Result<f32>
    where
        I: IntoIterator<Item = Batch>,
    {
        let mut total_loss = 0.0;
        let mut num_batches = 0;
        let log_interval = self.config.log_interval.max(1);

        for (i, batch) in batches.into_iter().enumerate() {
            total_loss += self.train_step(&batch)?;
            num_batches += 1;

            if (i + 1) % log_interval == 0 {
                tracing::info!(
                    epoch = self.metrics.epoch,
                    step = i + 1,
                    loss = total_loss / num_batches as f32,
                    lr = self.lr(),
                    "training"
                );
            }
        }

        let avg_loss = if num_batches > 0 {
            total_loss / num_batches as f32
        } else {
            0.0
        };

        self.metrics.record_epoch(avg_loss, self.lr());
        Ok(avg_loss)
    }

    /// Train for multiple epochs with callbacks and gradient accumulation
    ///
    /// `batch_fn` is called once per epoch and must restart the data from
    /// the beginning. With `gradient_accumulation_steps = k`, gradients of
    /// `k` consecutive batches are summed before each optimizer step; a
    /// trailing partial window still steps.
    pub fn train<B, I>(&mut self, max_epochs: usize, batch_fn: B) -> Result<TrainResult>
    where
        B: Fn() -> I,
        I: IntoIterator<Item = Batch>,
    {
        let start = Instant::now();
        self.start_time = Some(start);
        self.best_loss = None;
        let mut stopped_early = false;
        let mut final_loss = 0.0;

        let ctx = self.build_context(0, max_epochs, 0, 0, 0.0);
        if self.callbacks.on_train_begin(&ctx) == CallbackAction::Stop {
            self.callbacks.on_train_end(&ctx);
            return Ok(TrainResult {
                final_epoch: 0,
                final_loss: 0.0,
                best_loss: 0.0,
                stopped_early: true,
                elapsed_secs: start.elapsed().as_secs_f64(),
            });
        }

        let accum_steps = self.config.gradient_accumulation_steps.max(1);

        for epoch in 0..max_epochs {
            let ctx = self.build_context(epoch, max_epochs, 0, 0, final_loss);
            match self.callbacks.on_epoch_begin(&ctx) {
                CallbackAction::Stop => {
                    stopped_early = true;
                    break;
                }
                CallbackAction::SkipEpoch => continue,
                CallbackAction::Continue => {}
            }

            let batches: Vec<Batch> = batch_fn().into_iter().collect();
            let steps_per_epoch = batches.len();
            let mut total_loss = 0.0;
            let mut num_batches = 0;

            for (step, batch) in batches.iter().enumerate() {
                let ctx = self.build_context(epoch, max_epochs, step, steps_per_epoch, final_loss);
                match self.callbacks.on_step_begin(&ctx) {
                    CallbackAction::Stop => {
                        stopped_early = true;
                        break;
                    }
                    CallbackAction::SkipEpoch => break,
                    CallbackAction::Continue => {}
                }

                if step % accum_steps == 0 {
                    self.optimizer.zero_grad();
                }

                let loss = self.accumulate_gradients(batch)?;
                total_loss += loss;
                num_batches += 1;

                let is_accum_boundary = (step + 1) % accum_steps == 0;
                let is_last_batch = step + 1 == steps_per_epoch;
                if is_accum_boundary || is_last_batch {
                    self.apply_update();
                }

                self.metrics.increment_step();

                let ctx = self.build_context(epoch, max_epochs, step, steps_per_epoch, loss);
                match self.callbacks.on_step_end(&ctx) {
                    CallbackAction::Stop => {
                        stopped_early = true;
                        break;
                    }
                    CallbackAction::SkipEpoch => break,
                    CallbackAction::Continue => {}
                }
            }

            if stopped_early {
                break;
            }

            let avg_loss = if num_batches > 0 {
                total_loss / num_batches as f32
            } else {
                0.0
            };
            final_loss = avg_loss;
            if self.best_loss.is_none_or(|best| avg_loss < best) {
                self.best_loss = Some(avg_loss);
            }
            self.metrics.record_epoch(avg_loss, self.lr());
            tracing::info!(epoch = epoch + 1, max_epochs, loss = avg_loss, "epoch complete");

            let ctx = self.build_context(
                epoch,
                max_epochs,
                steps_per_epoch,
                steps_per_epoch,
                avg_loss,
            );
            if self.callbacks.on_epoch_end(&ctx) == CallbackAction::Stop {
                stopped_early = true;
                break;
            }
        }

        let ctx = self.build_context(self.metrics.epoch, max_epochs, 0, 0, final_loss);
        self.callbacks.on_train_end(&ctx);

        Ok(TrainResult {
            final_epoch: self.metrics.epoch,
            final_loss,
            best_loss: self.best_loss.unwrap_or(final_loss),
            stopped_early,
            elapsed_secs: start.elapsed().as_secs_f64(),
        })
    }

    /// Mean loss and accuracy over `batches`, without recording a graph
    ///
    /// The result is also appended to the validation history in
    /// [`metrics`](Self::metrics).
    pub fn evaluate<I>(&mut self, batches: I) -> Result<EvalResult>
    where
        I: IntoIterator<Item = Batch>,
    {
        let (total_loss, correct, samples) = with_no_grad(|| -> Result<(f32, usize, usize)> {
            let mut total_loss = 0.0;
            let mut correct = 0;
            let mut samples = 0;

            for batch in batches {
                let output = self.model.forward(&batch.inputs)?;
                let loss = self.loss_fn.forward(&output, &batch.labels)?;
                total_loss += loss.item()? * batch.size() as f32;
                correct += count_correct(&output, &batch.labels);
                samples += batch.size();
            }
            Ok((total_loss, correct, samples))
        })?;

        let result = if samples == 0 {
            EvalResult {
                loss: 0.0,
                accuracy: 0.0,
                samples,
            }
        } else {
            EvalResult {
                loss: total_loss / samples as f32,
                accuracy: correct as f32 / samples as f32,
                samples,
            }
        };

        self.metrics.record_validation(result.loss, result.accuracy);
        tracing::info!(
            loss = result.loss,
            accuracy = result.accuracy,
            samples,
            "evaluation"
        );
        Ok(result)
    }

    /// Run the model on `inputs` without recording a graph
    pub fn predict(&self, inputs: &Tensor) -> Result<Tensor> {
        with_no_grad(|| self.model.forward(inputs))
    }

    /// Get reference to callback manager
    pub fn callbacks(&self) -> &CallbackManager {
        &self.callbacks
    }

    /// Get mutable reference to callback manager
    pub fn callbacks_mut(&mut self) -> &mut CallbackManager {
        &mut self.callbacks
    }
}

/// Index of the largest entry in each row of a `[batch, classes]` tensor
pub fn argmax_rows(output: &Tensor) -> Vec<usize> {
    let data = output.data();
    if data.ndim() != 2 {
        return Vec::new();
    }
    data.axis_iter(Axis(0))
        .map(|row| {
            row.iter()
                .enumerate()
                .fold((0, f32::NEG_INFINITY), |best, (i, &v)| {
                    if v > best.1 {
                        (i, v)
                    } else {
                        best
                    }
                })
                .0
        })
        .collect()
}

fn count_correct(output: &Tensor, labels: &[usize]) -> usize {
    argmax_rows(output)
        .iter()
        .zip(labels)
        .filter(|(predicted, label)| predicted == label)
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nn::{Linear, LogSoftmax, Sequential};
    use crate::optim::{Adam, SGD};
    use crate::train::{CrossEntropyLoss, EarlyStopping, NLLLoss, ProgressCallback};
    use approx::assert_abs_diff_eq;

    /// 2→2 linear classifier with fixed weights
    fn linear_model() -> Linear {
        let weight = Tensor::from_shape_vec(&[2, 2], vec![0.1, -0.2, 0.3, 0.05], true).unwrap();
        let bias = Tensor::from_vec(vec![0.0, 0.0], true);
        Linear::from_parameters(weight, bias).unwrap()
    }

    fn sgd_trainer(lr: f32, config: TrainConfig) -> Trainer<Linear> {
        let model = linear_model();
        let optimizer = SGD::new(model.parameters(), lr);
        Trainer::new(model, Box::new(optimizer), Box::new(CrossEntropyLoss), config)
    }

    fn separable_batches() -> Vec<Batch> {
        vec![
            Batch::from_rows(vec![1.0, 0.0, 0.0, 1.0], 2, vec![0, 1]).unwrap(),
            Batch::from_rows(vec![0.9, 0.1, 0.2, 0.8], 2, vec![0, 1]).unwrap(),
        ]
    }

    #[test]
    fn test_trainer_creation() {
        let trainer = sgd_trainer(0.001, TrainConfig::default());

        assert_eq!(trainer.params().len(), 2);
        assert_eq!(trainer.lr(), 0.001);
        assert!(trainer.callbacks().is_empty());
    }

    #[test]
    fn test_train_step() {
        let mut trainer = sgd_trainer(0.5, TrainConfig::default());
        let batch = separable_batches().remove(0);

        let first = trainer.train_step(&batch).unwrap();
        let second = trainer.train_step(&batch).unwrap();

        assert!(first > 0.0 && first.is_finite());
        assert!(second < first);
        assert_eq!(trainer.metrics.steps, 2);
    }

    #[test]
    fn test_train_step_rejects_bad_labels() {
        let mut trainer = sgd_trainer(0.1, TrainConfig::default());
        let batch = Batch::from_rows(vec![1.0, 0.0], 2, vec![5]).unwrap();
        assert!(trainer.train_step(&batch).is_err());
    }

    #[test]
    fn test_train_epoch() {
        let mut trainer = sgd_trainer(0.1, TrainConfig::new().with_log_interval(1));
        let avg_loss = trainer.train_epoch(separable_batches()).unwrap();

        assert!(avg_loss > 0.0);
        assert_eq!(trainer.metrics.epoch, 1);
        assert_eq!(trainer.metrics.steps, 2);
        assert_eq!(trainer.metrics.losses, vec![avg_loss]);
    }

    #[test]
    fn test_train_runs_all_epochs() {
        let mut trainer = sgd_trainer(0.2, TrainConfig::default());
        let batches = separable_batches();

        let result = trainer.train(3, || batches.clone()).unwrap();

        assert!(!result.stopped_early);
        assert_eq!(result.final_epoch, 3);
        assert!(trainer.metrics.is_monotonically_decreasing());
        assert_abs_diff_eq!(result.best_loss, result.final_loss);
    }

    #[test]
    fn test_train_with_early_stopping() {
        // lr = 0 keeps the loss constant, so patience runs out
        let mut trainer = sgd_trainer(0.0, TrainConfig::default());
        trainer.add_callback(EarlyStopping::new(2, 0.0001));
        trainer.add_callback(ProgressCallback::new(1));
        let batches = separable_batches();

        let result = trainer.train(10, || batches.clone()).unwrap();

        assert!(result.stopped_early);
        assert_eq!(result.final_epoch, 3);
        assert!(result.elapsed_secs >= 0.0);
    }

    #[test]
    fn test_skip_epoch_callback() {
        struct SkipFirst;
        impl TrainerCallback for SkipFirst {
            fn on_epoch_begin(&mut self, ctx: &CallbackContext) -> CallbackAction {
                if ctx.epoch == 0 {
                    CallbackAction::SkipEpoch
                } else {
                    CallbackAction::Continue
                }
            }
        }

        let mut trainer = sgd_trainer(0.1, TrainConfig::default());
        trainer.add_callback(SkipFirst);
        let batches = separable_batches();

        let result = trainer.train(2, || batches.clone()).unwrap();
        assert_eq!(result.final_epoch, 1);
        assert_eq!(trainer.metrics.steps, 2);
    }

    #[test]
    fn test_stop_at_train_begin_still_ends_training() {
        use std::cell::Cell;
        use std::rc::Rc;

        struct Veto {
            ended: Rc<Cell<usize>>,
        }
        impl TrainerCallback for Veto {
            fn on_train_begin(&mut self, _ctx: &CallbackContext) -> CallbackAction {
                CallbackAction::Stop
            }

            fn on_train_end(&mut self, _ctx: &CallbackContext) {
                self.ended.set(self.ended.get() + 1);
            }
        }

        let ended = Rc::new(Cell::new(0));
        let mut trainer = sgd_trainer(0.1, TrainConfig::default());
        trainer.add_callback(Veto {
            ended: Rc::clone(&ended),
        });
        let batches = separable_batches();

        let result = trainer.train(3, || batches.clone()).unwrap();
        assert!(result.stopped_early);
        assert_eq!(result.final_epoch, 0);
        assert_eq!(trainer.metrics.steps, 0);
        assert_eq!(ended.get(), 1);
    }

    #[test]
    fn test_gradient_accumulation_sums_window() {
        let batch = separable_batches().remove(0);

        // Two accumulated copies of a batch step like one batch at double lr
        let mut accumulated = sgd_trainer(0.1, TrainConfig::new().with_gradient_accumulation(2));
        let pair = vec![batch.clone(), batch.clone()];
        accumulated.train(1, || pair.clone()).unwrap();

        let mut single = sgd_trainer(0.2, TrainConfig::default());
        single.train_step(&batch).unwrap();

        for (a, b) in accumulated.params().iter().zip(single.params()) {
            for (x, y) in a.data().iter().zip(b.data().iter()) {
                assert_abs_diff_eq!(*x, *y, epsilon = 1e-6);
            }
        }
        assert_eq!(accumulated.metrics.steps, 2);
    }

    #[test]
    fn test_gradient_accumulation_partial_window() {
        let model = linear_model();
        let optimizer = Adam::default_params(model.parameters(), 0.01);
        let config = TrainConfig::new().with_gradient_accumulation(3);
        let mut trainer =
            Trainer::new(model, Box::new(optimizer), Box::new(CrossEntropyLoss), config);

        let batches: Vec<Batch> = (0..5).map(|_| separable_batches().remove(0)).collect();
        let result = trainer.train(1, || batches.clone()).unwrap();

        assert!(!result.stopped_early);
        assert_eq!(trainer.metrics.steps, 5);
        assert!(result.final_loss.is_finite());
    }

    #[test]
    fn test_grad_clipping_bounds_update() {
        let mut trainer = sgd_trainer(1.0, TrainConfig::new().with_grad_clip(0.01));
        let before: Vec<_> = trainer.params().iter().map(|p| p.data().clone()).collect();
        trainer.train_step(&separable_batches()[0]).unwrap();

        let moved: f32 = trainer
            .params()
            .iter()
            .zip(&before)
            .map(|(p, b)| (&*p.data() - b).mapv(|d| d * d).sum())
            .sum::<f32>()
            .sqrt();
        assert!(moved <= 0.01 + 1e-6, "update norm {moved}");
    }

    #[test]
    fn test_evaluate_and_predict_build_no_graph() {
        let model = Sequential::new().add(linear_model()).add(LogSoftmax);
        let optimizer = SGD::new(model.parameters(), 0.1);
        let mut trainer = Trainer::new(
            model,
            Box::new(optimizer),
            Box::new(NLLLoss),
            TrainConfig::default(),
        );

        let eval = trainer.evaluate(separable_batches()).unwrap();
        assert_eq!(eval.samples, 4);
        assert!(eval.loss > 0.0);
        assert!((0.0..=1.0).contains(&eval.accuracy));
        assert_eq!(trainer.metrics.val_losses, vec![eval.loss]);

        let out = trainer.predict(&separable_batches()[0].inputs).unwrap();
        assert!(out.is_leaf());
        assert!(trainer.params().iter().all(|p| p.grad().is_none()));
    }

    #[test]
    fn test_evaluate_empty() {
        let mut trainer = sgd_trainer(0.1, TrainConfig::default());
        let eval = trainer.evaluate(Vec::new()).unwrap();
        assert_eq!(eval.samples, 0);
        assert_eq!(eval.accuracy, 0.0);
    }

    #[test]
    fn test_argmax_rows() {
        let data = vec![0.1, 0.7, 0.2, 3.0, -1.0, 0.0, -5.0, -4.0, -3.0];
        let out = Tensor::from_shape_vec(&[3, 3], data, false).unwrap();
        assert_eq!(argmax_rows(&out), vec![1, 0, 2]);
        assert_eq!(count_correct(&out, &[1, 1, 2]), 2);
    }
}
