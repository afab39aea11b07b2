//! High-level training loop
//!
//! This module provides a complete training framework with:
//! - Classification losses (NLL, Cross-Entropy)
//! - Trainer abstraction over any [`Module`](crate::nn::Module)
//! - Training configuration and metrics tracking
//! - Callbacks for progress logging and early stopping
//! - Seeded synthetic datasets
//!
//! # Example
//!
//! ```no_run
//! use gradiente::nn::{Linear, Module};
//! use gradiente::optim::SGD;
//! use gradiente::train::{synthetic::ClusterSpec, CrossEntropyLoss, TrainConfig, Trainer};
//!
//! let model = Linear::new(2, 2).unwrap();
//! let optimizer = SGD::new(model.parameters(), 0.1);
//! let mut trainer = Trainer::new(
//!     model,
//!     Box::new(optimizer),
//!     Box::new(CrossEntropyLoss),
//!     TrainConfig::default(),
//! );
//!
//! let batches = ClusterSpec::new(2, 2).generate(64, 8, 0).unwrap();
//! for epoch in 0..10 {
//!     let loss = trainer.train_epoch(batches.clone()).unwrap();
//!     println!("Epoch {}: loss={:.4}", epoch, loss);
//! }
//! ```

mod batch;
pub mod callback;
mod config;
mod loss;
pub mod synthetic;
mod trainer;

pub use batch::Batch;
pub use callback::{
    CallbackAction, CallbackContext, CallbackManager, EarlyStopping, ProgressCallback,
    TrainerCallback,
};
pub use config::{MetricsTracker, TrainConfig};
pub use loss::{CrossEntropyLoss, LossFn, NLLLoss};
pub use trainer::{argmax_rows, EvalResult, TrainResult, Trainer};
