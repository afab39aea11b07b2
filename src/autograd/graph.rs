//! Graph nodes and the gradient rule of every differentiable operation

use super::Tensor;
use crate::error::{Error, Result};
use ndarray::{ArrayD, ArrayView2, Axis, Ix2, IxDyn};

/// Graph node attached to the tensor an operation produced
pub(crate) struct Node {
    pub(crate) op: Op,
}

impl Node {
    pub(crate) fn new(op: Op) -> Self {
        Self { op }
    }
}

/// Differentiable primitive together with its operands
///
/// Operands are shared tensor handles. Values the backward rule needs and
/// that cannot be recomputed cheaply from the operands are saved here.
pub(crate) enum Op {
    Add { lhs: Tensor, rhs: Tensor },
    Mul { lhs: Tensor, rhs: Tensor },
    Scale { input: Tensor, factor: f32 },
    Exp { input: Tensor, output: ArrayD<f32> },
    Sum { input: Tensor },
    Mean { input: Tensor },
    MatMul { lhs: Tensor, rhs: Tensor },
    Linear {
        input: Tensor,
        weight: Tensor,
        bias: Option<Tensor>,
    },
    Relu { input: Tensor },
    LogSoftmax { input: Tensor, softmax: ArrayD<f32> },
    NllLoss { input: Tensor, targets: Vec<usize> },
}

impl Op {
    pub(crate) fn name(&self) -> &'static str {
        match self {
            Op::Add { .. } => "add",
            Op::Mul { .. } => "mul",
            Op::Scale { .. } => "scale",
            Op::Exp { .. } => "exp",
            Op::Sum { .. } => "sum",
            Op::Mean { .. } => "mean",
            Op::MatMul { .. } => "matmul",
            Op::Linear { .. } => "linear",
            Op::Relu { .. } => "relu",
            Op::LogSoftmax { .. } => "log_softmax",
            Op::NllLoss { .. } => "nll_loss",
        }
    }

    /// Operand tensors, in the order `local_grads` reports them
    pub(crate) fn inputs(&self) -> Vec<&Tensor> {
        match self {
            Op::Add { lhs, rhs } | Op::Mul { lhs, rhs } | Op::MatMul { lhs, rhs } => {
                vec![lhs, rhs]
            }
            Op::Scale { input, .. }
            | Op::Exp { input, .. }
            | Op::Sum { input }
            | Op::Mean { input }
            | Op::Relu { input }
            | Op::LogSoftmax { input, .. }
            | Op::NllLoss { input, .. } => vec![input],
            Op::Linear {
                input,
                weight,
                bias,
            } => {
                let mut inputs = vec![input, weight];
                if let Some(bias) = bias {
                    inputs.push(bias);
                }
                inputs
            }
        }
    }

    /// Take ownership of the operand handles, dropping the saved values
    pub(crate) fn into_inputs(self) -> Vec<Tensor> {
        match self {
            Op::Add { lhs, rhs } | Op::Mul { lhs, rhs } | Op::MatMul { lhs, rhs } => {
                vec![lhs, rhs]
            }
            Op::Scale { input, .. }
            | Op::Exp { input, .. }
            | Op::Sum { input }
            | Op::Mean { input }
            | Op::Relu { input }
            | Op::LogSoftmax { input, .. }
            | Op::NllLoss { input, .. } => vec![input],
            Op::Linear {
                input,
                weight,
                bias,
            } => {
                let mut inputs = vec![input, weight];
                inputs.extend(bias);
                inputs
            }
        }
    }

    /// Gradient of the loss with respect to each operand
    ///
    /// `grad_output` is ∂L/∂out, shaped like the produced tensor. Entries
    /// are `None` for operands that do not require gradients.
    pub(crate) fn local_grads(
        &self,
        grad_output: &ArrayD<f32>,
    ) -> Result<Vec<Option<ArrayD<f32>>>> {
        let grads = match self {
            Op::Add { lhs, rhs } => vec![
                lhs.requires_grad().then(|| grad_output.clone()),
                rhs.requires_grad().then(|| grad_output.clone()),
            ],
            Op::Mul { lhs, rhs } => {
                // ∂L/∂a = ∂L/∂out * b, ∂L/∂b = ∂L/∂out * a
                let grad_lhs = lhs
                    .requires_grad()
                    .then(|| grad_output * &*rhs.data());
                let grad_rhs = rhs
                    .requires_grad()
                    .then(|| grad_output * &*lhs.data());
                vec![grad_lhs, grad_rhs]
            }
            Op::Scale { input, factor } => {
                vec![input.requires_grad().then(|| grad_output * *factor)]
            }
            Op::Exp { input, output } => {
                vec![input.requires_grad().then(|| grad_output * output)]
            }
            Op::Sum { input } => {
                let g = scalar_value(grad_output);
                vec![input
                    .requires_grad()
                    .then(|| ArrayD::from_elem(IxDyn(&input.shape()), g))]
            }
            Op::Mean { input } => {
                let g = scalar_value(grad_output);
                let n = input.len().max(1) as f32;
                vec![input
                    .requires_grad()
                    .then(|| ArrayD::from_elem(IxDyn(&input.shape()), g / n))]
            }
            Op::MatMul { lhs, rhs } => {
                let lhs_data = lhs.data();
                let rhs_data = rhs.data();
                let a = matrix("matmul", &lhs_data)?;
                let b = matrix("matmul", &rhs_data)?;
                let g = matrix("matmul", grad_output)?;

                // ∂L/∂A = ∂L/∂C @ B^T, ∂L/∂B = A^T @ ∂L/∂C
                vec![
                    lhs.requires_grad().then(|| g.dot(&b.t()).into_dyn()),
                    rhs.requires_grad().then(|| a.t().dot(&g).into_dyn()),
                ]
            }
            Op::Linear {
                input,
                weight,
                bias,
            } => {
                let input_data = input.data();
                let weight_data = weight.data();
                let x = matrix("linear", &input_data)?;
                let w = matrix("linear", &weight_data)?;
                let g = matrix("linear", grad_output)?;

                // Y = X·Wᵀ + b with X: [batch, in], W: [out, in]
                // ∂L/∂X = ∂L/∂Y · W, ∂L/∂W = (∂L/∂Y)ᵀ · X, ∂L/∂b = Σ_batch ∂L/∂Y
                let mut grads = vec![
                    input.requires_grad().then(|| g.dot(&w).into_dyn()),
                    weight.requires_grad().then(|| g.t().dot(&x).into_dyn()),
                ];
                if let Some(bias) = bias {
                    grads.push(
                        bias.requires_grad()
                            .then(|| g.sum_axis(Axis(0)).into_dyn()),
                    );
                }
                grads
            }
            Op::Relu { input } => {
                // ∂L/∂x = ∂L/∂out * (x > 0)
                let grad_input = input.requires_grad().then(|| {
                    let mask = input.data().mapv(|x| if x > 0.0 { 1.0 } else { 0.0 });
                    grad_output * &mask
                });
                vec![grad_input]
            }
            Op::LogSoftmax { input, softmax } => {
                // ∂L/∂x_i = ∂L/∂y_i − softmax(x)_i · Σ_j ∂L/∂y_j, per row
                let grad_input = input.requires_grad().then(|| {
                    let last = Axis(grad_output.ndim() - 1);
                    let row_sums = grad_output.sum_axis(last).insert_axis(last);
                    grad_output - &(softmax * &row_sums)
                });
                vec![grad_input]
            }
            Op::NllLoss { input, targets } => {
                let grad_input = if input.requires_grad() {
                    let g = scalar_value(grad_output);
                    let batch = targets.len() as f32;
                    let mut grad = ArrayD::zeros(IxDyn(&input.shape()));
                    for (row, &label) in targets.iter().enumerate() {
                        grad[IxDyn(&[row, label])] = -g / batch;
                    }
                    Some(grad)
                } else {
                    None
                };
                vec![grad_input]
            }
        };

        Ok(grads)
    }
}

fn scalar_value(grad: &ArrayD<f32>) -> f32 {
    grad.iter().copied().next().unwrap_or_default()
}

/// View an n-d array as a matrix, failing if it is not 2-D
pub(crate) fn matrix<'a>(
    op: &'static str,
    array: &'a ArrayD<f32>,
) -> Result<ArrayView2<'a, f32>> {
    array
        .view()
        .into_dimensionality::<Ix2>()
        .map_err(|_| Error::ShapeMismatch {
            op,
            expected: vec![0, 0],
            got: array.shape().to_vec(),
        })
}
