//! Neural network building blocks
//!
//! Layers implement [`Module`]: they own their parameters, are built once
//! and invoked many times, and record the graph through the autograd ops.

mod activation;
mod linear;
mod module;
mod sequential;

pub use activation::{LogSoftmax, ReLU};
pub use linear::Linear;
pub use module::Module;
pub use sequential::Sequential;
