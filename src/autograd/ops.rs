//! Autograd operations
//!
//! Each operation validates its operands, computes the forward value into a
//! fresh tensor and, when gradient tracking is enabled and some operand
//! requires gradients, attaches the graph node the engine walks backward.

use super::graph::{matrix, Node, Op};
use super::{is_grad_enabled, Tensor};
use crate::error::{Error, Result};
use ndarray::{ArrayD, Axis, Ix1, IxDyn};

/// Wrap a forward value, recording `op` only if something needs its gradient
fn record<F>(data: ArrayD<f32>, operands: &[&Tensor], op: F) -> Tensor
where
    F: FnOnce() -> Op,
{
    let requires_grad = is_grad_enabled() && operands.iter().any(|t| t.requires_grad());
    if requires_grad {
        Tensor::from_node(data, Node::new(op()))
    } else {
        Tensor::new(data, false)
    }
}

fn ensure_same_shape(op: &'static str, a: &Tensor, b: &Tensor) -> Result<()> {
    let (a_shape, b_shape) = (a.shape(), b.shape());
    if a_shape != b_shape {
        return Err(Error::ShapeMismatch {
            op,
            expected: a_shape,
            got: b_shape,
        });
    }
    Ok(())
}

/// Add two tensors element-wise
pub fn add(a: &Tensor, b: &Tensor) -> Result<Tensor> {
    ensure_same_shape("add", a, b)?;
    let data = &*a.data() + &*b.data();

    Ok(record(data, &[a, b], || Op::Add {
        lhs: a.clone(),
        rhs: b.clone(),
    }))
}

/// Multiply two tensors element-wise
pub fn mul(a: &Tensor, b: &Tensor) -> Result<Tensor> {
    ensure_same_shape("mul", a, b)?;
    let data = &*a.data() * &*b.data();

    Ok(record(data, &[a, b], || Op::Mul {
        lhs: a.clone(),
        rhs: b.clone(),
    }))
}

/// Scale tensor by a scalar
pub fn scale(a: &Tensor, factor: f32) -> Result<Tensor> {
    let data = &*a.data() * factor;

    Ok(record(data, &[a], || Op::Scale {
        input: a.clone(),
        factor,
    }))
}

/// Element-wise exponential
///
/// Applied to log-probabilities this recovers the probability vector.
pub fn exp(a: &Tensor) -> Result<Tensor> {
    let data = a.data().mapv(f32::exp);
    let output = data.clone();

    Ok(record(data, &[a], || Op::Exp {
        input: a.clone(),
        output,
    }))
}

/// Sum all elements into a zero-dimensional tensor
pub fn sum(a: &Tensor) -> Result<Tensor> {
    let data = ArrayD::from_elem(IxDyn(&[]), a.data().sum());

    Ok(record(data, &[a], || Op::Sum { input: a.clone() }))
}

/// Mean of all elements as a zero-dimensional tensor
pub fn mean(a: &Tensor) -> Result<Tensor> {
    if a.is_empty() {
        return Err(Error::ShapeMismatch {
            op: "mean",
            expected: vec![1],
            got: a.shape(),
        });
    }
    let data = ArrayD::from_elem(IxDyn(&[]), a.data().sum() / a.len() as f32);

    Ok(record(data, &[a], || Op::Mean { input: a.clone() }))
}

/// Matrix multiplication
///
/// Computes C = A @ B where A is m×k and B is k×n.
pub fn matmul(a: &Tensor, b: &Tensor) -> Result<Tensor> {
    let data = {
        let a_data = a.data();
        let b_data = b.data();
        let a_mat = matrix("matmul", &a_data)?;
        let b_mat = matrix("matmul", &b_data)?;
        if a_mat.ncols() != b_mat.nrows() {
            return Err(Error::ShapeMismatch {
                op: "matmul",
                expected: vec![a_mat.ncols(), b_mat.ncols()],
                got: b_data.shape().to_vec(),
            });
        }
        a_mat.dot(&b_mat).into_dyn()
    };

    Ok(record(data, &[a, b], || Op::MatMul {
        lhs: a.clone(),
        rhs: b.clone(),
    }))
}

/// Affine transform of a batch: `Y = X·Wᵀ + b`
///
/// `input` is `[batch, in]`, `weight` is `[out, in]` and `bias` is `[out]`.
pub fn linear(input: &Tensor, weight: &Tensor, bias: Option<&Tensor>) -> Result<Tensor> {
    let data = {
        let input_data = input.data();
        let weight_data = weight.data();
        let x = matrix("linear", &input_data)?;
        let w = matrix("linear", &weight_data)?;
        if x.ncols() != w.ncols() {
            return Err(Error::ShapeMismatch {
                op: "linear",
                expected: vec![x.nrows(), w.ncols()],
                got: input_data.shape().to_vec(),
            });
        }

        let mut y = x.dot(&w.t());
        if let Some(bias) = bias {
            let bias_data = bias.data();
            let b = bias_data
                .view()
                .into_dimensionality::<Ix1>()
                .ok()
                .filter(|b| b.len() == w.nrows())
                .ok_or_else(|| Error::ShapeMismatch {
                    op: "linear",
                    expected: vec![w.nrows()],
                    got: bias_data.shape().to_vec(),
                })?;
            y += &b;
        }
        y.into_dyn()
    };

    let mut operands = vec![input, weight];
    operands.extend(bias);
    Ok(record(data, &operands, || Op::Linear {
        input: input.clone(),
        weight: weight.clone(),
        bias: bias.cloned(),
    }))
}

/// ReLU activation
pub fn relu(a: &Tensor) -> Result<Tensor> {
    let data = a.data().mapv(|x| x.max(0.0));

    Ok(record(data, &[a], || Op::Relu { input: a.clone() }))
}

/// Log-softmax over the last axis
///
/// Each row is shifted by its maximum before exponentiating, so large
/// magnitudes neither overflow nor lose the small probabilities:
/// `log_softmax(x)_i = x_i − max(x) − ln Σ_j exp(x_j − max(x))`.
pub fn log_softmax(a: &Tensor) -> Result<Tensor> {
    let mut data = a.data().to_owned();
    if data.ndim() == 0 || data.shape()[data.ndim() - 1] == 0 {
        return Err(Error::ShapeMismatch {
            op: "log_softmax",
            expected: vec![1],
            got: data.shape().to_vec(),
        });
    }

    let last = Axis(data.ndim() - 1);
    for mut row in data.lanes_mut(last) {
        let max = row.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let log_sum = row.iter().map(|&x| (x - max).exp()).sum::<f32>().ln();
        row.mapv_inplace(|x| x - max - log_sum);
    }
    let softmax = data.mapv(f32::exp);

    Ok(record(data, &[a], || Op::LogSoftmax {
        input: a.clone(),
        softmax,
    }))
}

/// Negative log-likelihood of integer class labels
///
/// `log_probs` is `[batch, classes]`; the result is the zero-dimensional
/// mean over rows of `−log_probs[row, targets[row]]`.
pub fn nll_loss(log_probs: &Tensor, targets: &[usize]) -> Result<Tensor> {
    let loss = {
        let data = log_probs.data();
        let x = matrix("nll_loss", &data)?;
        let (batch, classes) = x.dim();
        if batch == 0 || targets.len() != batch {
            return Err(Error::ShapeMismatch {
                op: "nll_loss",
                expected: vec![batch.max(1)],
                got: vec![targets.len()],
            });
        }
        if let Some(&index) = targets.iter().find(|&&t| t >= classes) {
            return Err(Error::IndexOutOfRange {
                index,
                bound: classes,
            });
        }

        let total: f32 = targets
            .iter()
            .enumerate()
            .map(|(row, &label)| -x[[row, label]])
            .sum();
        total / batch as f32
    };

    let data = ArrayD::from_elem(IxDyn(&[]), loss);
    Ok(record(data, &[log_probs], || Op::NllLoss {
        input: log_probs.clone(),
        targets: targets.to_vec(),
    }))
}

/// Cross-entropy on raw logits, composed as `nll_loss(log_softmax(logits))`
pub fn cross_entropy(logits: &Tensor, targets: &[usize]) -> Result<Tensor> {
    let log_probs = log_softmax(logits)?;
    nll_loss(&log_probs, targets)
}
