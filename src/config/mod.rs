//! Declarative YAML configuration
//!
//! Describes a classifier, its optimizer, and the loop settings in one file,
//! then turns that description into a ready-to-run [`crate::train::Trainer`].
//!
//! # Example
//!
//! ```yaml
//! model:
//!   input_features: 64
//!   hidden_layers: [32]
//!   num_classes: 10
//!   output: log_softmax
//!
//! optimizer:
//!   name: sgd
//!   lr: 0.05
//!   momentum: 0.9
//!
//! training:
//!   epochs: 5
//!   batch_size: 16
//!   max_grad_norm: 1.0
//!   seed: 42
//! ```

mod builder;
mod load;
mod schema;
mod validate;



pub use builder::{
    build_loss, build_model, build_model_with_rng, build_optimizer, build_train_config,
    build_trainer,
};
pub use load::{load_config, parse_config};
pub use schema::{ModelSpec, OptimSpec, OutputKind, TrainSpec, TrainingParams};
pub use validate::{validate_config, ValidationError};
