//! Graph-based autograd engine
//!
//! Provides reverse-mode automatic differentiation. Every operation attaches
//! a node describing itself to the tensor it produces; [`backward`] walks
//! those nodes in reverse topological order and accumulates gradients into
//! the leaves.

mod context;
mod engine;
mod graph;
mod ops;
mod tensor;


pub use context::{enable_grad, is_grad_enabled, no_grad, with_no_grad, GradModeGuard};
pub use engine::backward;
pub use ops::*;
pub(crate) use tensor::dedup_by_id;
pub use tensor::{Tensor, TensorId};
