//! # Gradiente: a small reverse-mode autograd engine
//!
//! Gradiente builds a computation graph as tensors are combined, then walks it
//! backwards to fill in gradients. On top of that sit the pieces needed to
//! train a small classifier end to end.
//!
//! ## Architecture
//!
//! - **autograd**: Tensors, graph nodes, the backward engine, and the no-grad scope
//! - **nn**: Linear, ReLU, and log-softmax layers composed with `Sequential`
//! - **optim**: Optimizers (SGD with momentum, Adam) and gradient clipping
//! - **train**: Losses, batches, callbacks, and the training loop
//! - **config**: Declarative YAML configuration

pub mod autograd;
pub mod config;
pub mod nn;
pub mod optim;
pub mod train;

pub mod error;

// Re-export commonly used types
pub use autograd::{backward, no_grad, Tensor};
pub use error::{Error, Result};
