use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::rc::Rc;

use tracing::debug;

use crate::error::Result;
use crate::tensor::functional;
use crate::tensor::numeric::*;
use crate::tensor::raw_tensor::RawTensor;
use crate::tensor::{RcTensor, TensorList};

/// signature: backward(inputs, grad_output) -> one gradient per input, shaped like that input
pub(in crate::tensor) type BackwardFn<T> =
    Rc<dyn Fn(&[RcTensor<T>], &RcTensor<T>) -> Result<TensorList<T>>>;

/// A node of the autograd graph: the operation that produced a tensor.
#[derive(Clone)]
pub(in crate::tensor) struct Derivative<T: Numeric> {
    pub(in crate::tensor) inputs: TensorList<T>,
    backward: BackwardFn<T>,
    pub(in crate::tensor) name: &'static str,
}

impl<T: Numeric> fmt::Debug for Derivative<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shapes: Vec<_> = self.inputs.iter().map(|t| t.shape().to_vec()).collect();
        f.debug_struct("Derivative")
            .field("name", &self.name)
            .field("input_shapes", &shapes)
            .finish()
    }
}

thread_local! {
    static GRAD_ENABLED: Cell<bool> = const { Cell::new(true) };
}

pub fn is_grad_enabled() -> bool {
    GRAD_ENABLED.with(|enabled| enabled.get())
}

/// Disables graph recording on this thread until dropped.
pub struct NoGradGuard {
    previous: bool,
}

impl NoGradGuard {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        let previous = GRAD_ENABLED.with(|enabled| enabled.replace(false));
        NoGradGuard { previous }
    }
}

impl Drop for NoGradGuard {
    fn drop(&mut self) {
        GRAD_ENABLED.with(|enabled| enabled.set(self.previous));
    }
}

/// Runs `f` without recording operations for autograd.
///
/// ```
/// # use light_primer::tensor::*;
/// let x = RcTensor::scalar(2.0f64).requires_grad_(true).unwrap();
/// let y = no_grad(|| &x * &x);
/// assert!(!y.requires_grad());
/// ```
pub fn no_grad<R>(f: impl FnOnce() -> R) -> R {
    let _guard = NoGradGuard::new();
    f()
}

/// Wraps the result of an operation. When grad mode is on and any input requires grad,
/// the output gets a `grad_fn` node pointing back at the inputs.
pub(in crate::tensor) fn record<T, F>(
    array: Vec<T>,
    shape: Vec<usize>,
    inputs: TensorList<T>,
    name: &'static str,
    backward: F,
) -> Result<RcTensor<T>>
where
    T: Numeric,
    F: Fn(&[RcTensor<T>], &RcTensor<T>) -> Result<TensorList<T>> + 'static,
{
    let mut raw_tensor = RawTensor::new(array, shape)?;
    if is_grad_enabled() && inputs.iter().any(|t| t.requires_grad()) {
        raw_tensor.requires_grad = Cell::new(true);
        raw_tensor.grad_fn = Some(Derivative {
            inputs,
            backward: Rc::new(backward),
            name,
        });
    }
    Ok(RcTensor::from_raw(raw_tensor))
}

/// Nodes reachable from `root` through tensors that require grad, inputs before outputs.
fn topological_order<T: Numeric>(root: &RcTensor<T>) -> TensorList<T> {
    let mut visited = HashSet::new();
    let mut order = Vec::new();
    let mut stack = vec![(root.clone(), false)];
    while let Some((node, expanded)) = stack.pop() {
        if expanded {
            order.push(node);
            continue;
        }
        if !visited.insert(node.id()) {
            continue;
        }
        stack.push((node.clone(), true));
        if let Some(derivative) = node.grad_fn.as_ref() {
            for input in derivative.inputs.iter() {
                if input.requires_grad() && !visited.contains(&input.id()) {
                    stack.push((input.clone(), false));
                }
            }
        }
    }
    order
}

fn accumulate<T: Numeric>(
    existing: Option<RcTensor<T>>,
    grad: RcTensor<T>,
) -> Result<RcTensor<T>> {
    match existing {
        Some(prev) => functional::add(&prev, &grad),
        None => Ok(grad),
    }
}

/// Reverse-mode sweep: every node receives the sum of the vector-Jacobian products of
/// its consumers before passing its own gradient on. Leaves accumulate into `.grad`.
pub(in crate::tensor) fn run_backward<T: Numeric>(
    root: &RcTensor<T>,
    seed: RcTensor<T>,
) -> Result<()> {
    let _guard = NoGradGuard::new();
    let order = topological_order(root);
    debug!(nodes = order.len(), "running backward pass");

    let mut grads: HashMap<usize, RcTensor<T>> = HashMap::new();
    grads.insert(root.id(), seed);

    for node in order.iter().rev() {
        let grad = match grads.remove(&node.id()) {
            Some(grad) => grad,
            None => continue,
        };
        match node.grad_fn.as_ref() {
            Some(derivative) => {
                let input_grads = (derivative.backward)(&derivative.inputs, &grad)?;
                debug_assert_eq!(input_grads.len(), derivative.inputs.len());
                for (input, input_grad) in derivative.inputs.iter().zip(input_grads) {
                    if !input.requires_grad() {
                        continue;
                    }
                    debug_assert_eq!(input.shape(), input_grad.shape(), "{}", derivative.name);
                    let existing = grads.remove(&input.id());
                    grads.insert(input.id(), accumulate(existing, input_grad)?);
                }
            }
            None => {
                let cell: &RefCell<Option<RcTensor<T>>> = &node.grad;
                let existing = cell.borrow_mut().take();
                let updated = accumulate(existing, grad.detach())?;
                *cell.borrow_mut() = Some(updated);
            }
        }
    }
    Ok(())
}
