//! Tensor type with gradient tracking

use super::graph::Node;
use crate::error::{Error, Result};
use ndarray::{Array1, ArrayD, IxDyn};
use std::cell::{Ref, RefCell, RefMut};
use std::collections::HashSet;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_TENSOR_ID: AtomicU64 = AtomicU64::new(0);

/// Identity of a tensor, stable across clones of the same handle
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TensorId(u64);

impl TensorId {
    fn next() -> Self {
        Self(NEXT_TENSOR_ID.fetch_add(1, Ordering::Relaxed))
    }
}

struct TensorInner {
    id: TensorId,
    data: RefCell<ArrayD<f32>>,
    grad: RefCell<Option<ArrayD<f32>>>,
    requires_grad: bool,
    node: Option<Node>,
}

impl Drop for TensorInner {
    // Unlink the graph with an explicit stack; recursive drops of a long
    // chain would overflow the thread stack.
    fn drop(&mut self) {
        let Some(node) = self.node.take() else {
            return;
        };
        let mut pending = node.op.into_inputs();
        while let Some(tensor) = pending.pop() {
            if let Some(mut inner) = Rc::into_inner(tensor.inner) {
                if let Some(node) = inner.node.take() {
                    pending.extend(node.op.into_inputs());
                }
            }
        }
    }
}

/// Drop repeated handles to the same tensor, keeping first-occurrence order
pub(crate) fn dedup_by_id<I>(tensors: I) -> Vec<Tensor>
where
    I: IntoIterator<Item = Tensor>,
{
    let mut seen = HashSet::new();
    tensors
        .into_iter()
        .filter(|tensor| seen.insert(tensor.id()))
        .collect()
}

/// Tensor with automatic differentiation support
///
/// Cloning yields another handle to the same storage, so a parameter held
/// by a layer, an optimizer and a graph node is one tensor with one
/// gradient buffer.
#[derive(Clone)]
pub struct Tensor {
    inner: Rc<TensorInner>,
}

impl Tensor {
    /// Create a new leaf tensor
    pub fn new(data: ArrayD<f32>, requires_grad: bool) -> Self {
        Self::build(data, requires_grad, None)
    }

    pub(crate) fn from_node(data: ArrayD<f32>, node: Node) -> Self {
        Self::build(data, true, Some(node))
    }

    fn build(data: ArrayD<f32>, requires_grad: bool, node: Option<Node>) -> Self {
        Self {
            inner: Rc::new(TensorInner {
                id: TensorId::next(),
                data: RefCell::new(data),
                grad: RefCell::new(None),
                requires_grad,
                node,
            }),
        }
    }

    /// Create a 1-D tensor from a vector
    pub fn from_vec(data: Vec<f32>, requires_grad: bool) -> Self {
        Self::new(Array1::from(data).into_dyn(), requires_grad)
    }

    /// Create a tensor of the given shape from row-major data
    pub fn from_shape_vec(shape: &[usize], data: Vec<f32>, requires_grad: bool) -> Result<Self> {
        let expected: usize = shape.iter().product();
        if expected != data.len() {
            return Err(Error::ShapeMismatch {
                op: "from_shape_vec",
                expected: shape.to_vec(),
                got: vec![data.len()],
            });
        }
        let array = ArrayD::from_shape_vec(IxDyn(shape), data).map_err(|_| {
            Error::ShapeMismatch {
                op: "from_shape_vec",
                expected: shape.to_vec(),
                got: vec![expected],
            }
        })?;
        Ok(Self::new(array, requires_grad))
    }

    /// Create a zero-dimensional tensor
    pub fn scalar(value: f32, requires_grad: bool) -> Self {
        Self::new(ArrayD::from_elem(IxDyn(&[]), value), requires_grad)
    }

    /// Create a tensor filled with zeros
    pub fn zeros(shape: &[usize], requires_grad: bool) -> Self {
        Self::new(ArrayD::zeros(IxDyn(shape)), requires_grad)
    }

    /// Create a tensor filled with ones
    pub fn ones(shape: &[usize], requires_grad: bool) -> Self {
        Self::new(ArrayD::ones(IxDyn(shape)), requires_grad)
    }

    pub fn id(&self) -> TensorId {
        self.inner.id
    }

    /// Get reference to data
    pub fn data(&self) -> Ref<'_, ArrayD<f32>> {
        self.inner.data.borrow()
    }

    /// Get mutable reference to data
    ///
    /// Used by optimizers to update parameters in place. Graph nodes built
    /// earlier observe the new values, so updates belong between steps.
    pub fn data_mut(&self) -> RefMut<'_, ArrayD<f32>> {
        self.inner.data.borrow_mut()
    }

    pub fn shape(&self) -> Vec<usize> {
        self.inner.data.borrow().shape().to_vec()
    }

    pub fn ndim(&self) -> usize {
        self.inner.data.borrow().ndim()
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        self.inner.data.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.data.borrow().is_empty()
    }

    /// Value of a zero-dimensional tensor
    pub fn item(&self) -> Result<f32> {
        let data = self.inner.data.borrow();
        if data.ndim() != 0 {
            return Err(Error::ShapeMismatch {
                op: "item",
                expected: vec![],
                got: data.shape().to_vec(),
            });
        }
        Ok(data.iter().copied().next().unwrap_or_default())
    }

    /// Get gradient (if computed)
    pub fn grad(&self) -> Option<ArrayD<f32>> {
        self.inner.grad.borrow().clone()
    }

    /// Replace the gradient buffer
    pub fn set_grad(&self, grad: ArrayD<f32>) -> Result<()> {
        self.check_grad_shape("set_grad", &grad)?;
        *self.inner.grad.borrow_mut() = Some(grad);
        Ok(())
    }

    /// Accumulate gradient (for when tensor is used multiple times)
    pub fn accumulate_grad(&self, grad: &ArrayD<f32>) -> Result<()> {
        self.check_grad_shape("accumulate_grad", grad)?;
        let mut grad_ref = self.inner.grad.borrow_mut();
        match grad_ref.as_mut() {
            Some(existing) => *existing += grad,
            None => *grad_ref = Some(grad.clone()),
        }
        Ok(())
    }

    /// Reset the gradient buffer to zero, keeping its allocation
    pub fn zero_grad(&self) {
        if let Some(grad) = self.inner.grad.borrow_mut().as_mut() {
            grad.fill(0.0);
        }
    }

    /// Multiply the gradient buffer in place, if allocated
    pub fn scale_grad(&self, factor: f32) {
        if let Some(grad) = self.inner.grad.borrow_mut().as_mut() {
            *grad *= factor;
        }
    }

    fn check_grad_shape(&self, op: &'static str, grad: &ArrayD<f32>) -> Result<()> {
        let data = self.inner.data.borrow();
        if data.shape() != grad.shape() {
            return Err(Error::ShapeMismatch {
                op,
                expected: data.shape().to_vec(),
                got: grad.shape().to_vec(),
            });
        }
        Ok(())
    }

    /// Check if requires gradient
    pub fn requires_grad(&self) -> bool {
        self.inner.requires_grad
    }

    /// True when no operation produced this tensor
    pub fn is_leaf(&self) -> bool {
        self.inner.node.is_none()
    }

    pub(crate) fn node(&self) -> Option<&Node> {
        self.inner.node.as_ref()
    }

    /// Name of the producing operation, if any
    pub fn op_name(&self) -> Option<&'static str> {
        self.inner.node.as_ref().map(|node| node.op.name())
    }

    /// Copy the data into a fresh leaf that does not require gradients
    pub fn detach(&self) -> Tensor {
        Tensor::new(self.inner.data.borrow().clone(), false)
    }

    /// Backpropagate from this zero-dimensional tensor
    pub fn backward(&self) -> Result<()> {
        super::backward(self)
    }
}

impl std::fmt::Debug for Tensor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tensor")
            .field("id", &self.inner.id)
            .field("data", &self.inner.data.borrow())
            .field("grad", &self.inner.grad.borrow())
            .field("requires_grad", &self.inner.requires_grad)
            .field("op", &self.op_name())
            .finish()
    }
}
