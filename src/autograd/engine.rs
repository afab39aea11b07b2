//! Reverse-mode traversal of the operation graph

use super::{Tensor, TensorId};
use crate::error::{Error, Result};
use ndarray::{ArrayD, IxDyn};
use std::collections::{HashMap, HashSet};

/// Perform backward pass from a zero-dimensional tensor
///
/// Every graph node reachable from `root` runs its gradient rule exactly
/// once, after all nodes that consume its output. Contributions reaching
/// the same tensor along several paths are summed. Leaves that require
/// gradients add the result into their gradient buffer; intermediate
/// gradients are dropped once propagated.
pub fn backward(root: &Tensor) -> Result<()> {
    if root.ndim() != 0 {
        return Err(Error::InvalidBackwardTarget {
            shape: root.shape(),
            reason: "backward requires a zero-dimensional tensor",
        });
    }
    if !root.requires_grad() {
        return Err(Error::InvalidBackwardTarget {
            shape: root.shape(),
            reason: "tensor does not require gradients and has no graph",
        });
    }

    let seed = ArrayD::from_elem(IxDyn(&[]), 1.0);
    if root.is_leaf() {
        return root.accumulate_grad(&seed);
    }

    let order = topological_order(root);
    tracing::debug!(nodes = order.len(), "backward pass");

    let mut pending: HashMap<TensorId, ArrayD<f32>> = HashMap::new();
    pending.insert(root.id(), seed);

    for tensor in order.iter().rev() {
        let Some(grad_output) = pending.remove(&tensor.id()) else {
            continue;
        };
        let Some(node) = tensor.node() else {
            continue;
        };

        let grads = node.op.local_grads(&grad_output)?;
        for (input, grad) in node.op.inputs().into_iter().zip(grads) {
            let Some(grad) = grad else {
                continue;
            };
            if input.is_leaf() {
                input.accumulate_grad(&grad)?;
            } else {
                match pending.get_mut(&input.id()) {
                    Some(existing) => *existing += &grad,
                    None => {
                        pending.insert(input.id(), grad);
                    }
                }
            }
        }
    }

    Ok(())
}

/// Non-leaf tensors reachable from `root`, each after all of its inputs
fn topological_order(root: &Tensor) -> Vec<Tensor> {
    let mut order = Vec::new();
    let mut visited = HashSet::new();
    let mut stack = vec![(root.clone(), false)];

    while let Some((tensor, expanded)) = stack.pop() {
        if expanded {
            order.push(tensor);
            continue;
        }
        if !visited.insert(tensor.id()) {
            continue;
        }
        let Some(node) = tensor.node() else {
            continue;
        };

        let inputs: Vec<Tensor> = node
            .op
            .inputs()
            .into_iter()
            .filter(|input| !input.is_leaf() && !visited.contains(&input.id()))
            .cloned()
            .collect();
        stack.push((tensor, true));
        stack.extend(inputs.into_iter().map(|input| (input, false)));
    }

    order
}
