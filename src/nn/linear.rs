//! Fully connected layer

use super::Module;
use crate::autograd::linear;
use crate::error::{Error, Result};
use crate::Tensor;
use ndarray::{Array1, Array2};
use rand::Rng;

/// Affine layer computing `Y = X·Wᵀ + b`
///
/// Weight is `[out_features, in_features]` and bias is `[out_features]`.
#[derive(Debug)]
pub struct Linear {
    weight: Tensor,
    bias: Tensor,
    in_features: usize,
    out_features: usize,
}

impl Linear {
    /// Create a layer initialized from the thread RNG
    pub fn new(in_features: usize, out_features: usize) -> Result<Self> {
        Self::with_rng(in_features, out_features, &mut rand::rng())
    }

    /// Create a layer with weight and bias drawn uniformly from
    /// `(−1/√in, 1/√in)`
    pub fn with_rng<R: Rng + ?Sized>(
        in_features: usize,
        out_features: usize,
        rng: &mut R,
    ) -> Result<Self> {
        if in_features == 0 || out_features == 0 {
            return Err(Error::InvalidParameter(format!(
                "Linear layer needs non-zero features, got {in_features} -> {out_features}"
            )));
        }

        let bound = 1.0 / (in_features as f32).sqrt();
        let weight = Array2::from_shape_simple_fn((out_features, in_features), || {
            rng.random_range(-bound..bound)
        });
        let bias = Array1::from_shape_simple_fn(out_features, || rng.random_range(-bound..bound));

        Ok(Self {
            weight: Tensor::new(weight.into_dyn(), true),
            bias: Tensor::new(bias.into_dyn(), true),
            in_features,
            out_features,
        })
    }

    /// Build a layer around existing parameter tensors
    pub fn from_parameters(weight: Tensor, bias: Tensor) -> Result<Self> {
        let shape = weight.shape();
        let &[out_features, in_features] = shape.as_slice() else {
            return Err(Error::ShapeMismatch {
                op: "Linear::from_parameters",
                expected: vec![0, 0],
                got: weight.shape(),
            });
        };
        if bias.shape() != [out_features] {
            return Err(Error::ShapeMismatch {
                op: "Linear::from_parameters",
                expected: vec![out_features],
                got: bias.shape(),
            });
        }

        Ok(Self {
            weight,
            bias,
            in_features,
            out_features,
        })
    }

    pub fn in_features(&self) -> usize {
        self.in_features
    }

    pub fn out_features(&self) -> usize {
        self.out_features
    }

    pub fn weight(&self) -> &Tensor {
        &self.weight
    }

    pub fn bias(&self) -> &Tensor {
        &self.bias
    }
}

impl Module for Linear {
    fn forward(&self, input: &Tensor) -> Result<Tensor> {
        linear(input, &self.weight, Some(&self.bias))
    }

    fn parameters(&self) -> Vec<Tensor> {
        vec![self.weight.clone(), self.bias.clone()]
    }

    fn name(&self) -> &str {
        "Linear"
    }
}
