//! Error types for Gradiente

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Shape mismatch in {op}: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        op: &'static str,
        expected: Vec<usize>,
        got: Vec<usize>,
    },

    #[error("Index {index} out of range (must be < {bound})")]
    IndexOutOfRange { index: usize, bound: usize },

    #[error("Invalid backward target with shape {shape:?}: {reason}")]
    InvalidBackwardTarget {
        shape: Vec<usize>,
        reason: &'static str,
    },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

pub type Result<T> = std::result::Result<T, Error>;
