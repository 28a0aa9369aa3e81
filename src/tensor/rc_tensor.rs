use std::cell::RefCell;
use std::cmp::PartialEq;
use std::convert::From;
use std::ops::Deref;
use std::rc::Rc;

use num::traits::real::Real;

use super::autograd;
use super::functional;
use super::numeric::*;
use super::raw_tensor::*;
use super::types::Scalar;
use crate::error::{Result, TensorError};

/// A reference-counted tensor handle. Clones share the same data and autograd state.
#[derive(Debug, PartialEq, Clone)]
pub struct RcTensor<T: Numeric>(pub(in crate::tensor) Rc<RawTensor<T>>);

impl<T> Deref for RcTensor<T>
where
    T: Numeric,
{
    type Target = RawTensor<T>;

    fn deref(&self) -> &Self::Target {
        self.0.deref()
    }
}

fn unwrap_or_panic<T>(result: Result<T>) -> T {
    match result {
        Ok(value) => value,
        Err(e) => panic!("{}", e),
    }
}

impl<T: Numeric> RcTensor<T> {
    pub(in crate::tensor) fn from_raw(raw_tensor: RawTensor<T>) -> RcTensor<T> {
        RcTensor(Rc::new(raw_tensor))
    }

    /// Identity of the underlying tensor, stable while any handle is alive.
    pub(in crate::tensor) fn id(&self) -> usize {
        Rc::as_ptr(&self.0) as usize
    }

    /// Panics if `array.len()` does not match the shape; see [`RcTensor::from_vec`].
    pub fn new(array: Vec<T>, shape: Vec<usize>) -> RcTensor<T> {
        unwrap_or_panic(Self::from_vec(array, shape))
    }

    pub fn from_vec(array: Vec<T>, shape: Vec<usize>) -> Result<RcTensor<T>> {
        RawTensor::new(array, shape).map(RcTensor::from_raw)
    }

    pub fn new_with_filler(shape: Vec<usize>, filler: T) -> RcTensor<T> {
        RcTensor::from_raw(RawTensor::new_with_filler(shape, filler))
    }

    pub fn scalar(scalar: T) -> Scalar<T> {
        RcTensor::new_with_filler(vec![], scalar)
    }

    pub fn dim(&self) -> usize {
        self.shape.len()
    }

    pub fn dtype(&self) -> DType {
        T::DTYPE
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.data().clone()
    }

    /// The value of a single-element tensor.
    pub fn item(&self) -> Result<T> {
        if self.numel() != 1 {
            return Err(TensorError::NotScalar {
                shape: self.shape.clone(),
            });
        }
        Ok(self.data()[0])
    }

    pub fn requires_grad(&self) -> bool {
        self.0.requires_grad.get()
    }

    /// Marks a leaf tensor as a parameter whose gradient should be accumulated.
    pub fn requires_grad_(self, requires_grad: bool) -> Result<Self> {
        if requires_grad && !T::DTYPE.is_floating_point() {
            return Err(TensorError::IntegerGrad { dtype: T::DTYPE });
        }
        if !self.is_leaf() {
            return Err(TensorError::NonLeaf);
        }
        self.0.requires_grad.set(requires_grad);
        Ok(self)
    }

    /// True for tensors created by the user rather than by a recorded operation.
    pub fn is_leaf(&self) -> bool {
        self.grad_fn.is_none()
    }

    pub fn grad_fn_name(&self) -> Option<&'static str> {
        self.grad_fn.as_ref().map(|d| d.name)
    }

    /// The gradient accumulated by `backward`, if any.
    pub fn grad(&self) -> Option<RcTensor<T>> {
        self.0.grad.borrow().clone()
    }

    pub fn zero_grad(&self) {
        let cell: &RefCell<Option<RcTensor<T>>> = &self.0.grad;
        *cell.borrow_mut() = None;
    }

    /// Back-propagates from a single-element tensor, seeding with one.
    pub fn backward(&self) -> Result<()> {
        if self.numel() != 1 {
            return Err(TensorError::NotScalar {
                shape: self.shape.clone(),
            });
        }
        self.backward_with(RcTensor::new_with_filler(self.shape.clone(), T::one()))
    }

    /// Back-propagates an explicit upstream gradient shaped like `self`.
    pub fn backward_with(&self, grad: RcTensor<T>) -> Result<()> {
        if grad.shape() != self.shape() {
            return Err(TensorError::ShapeMismatch {
                expected: self.shape.clone(),
                got: grad.shape().to_vec(),
            });
        }
        if !self.requires_grad() {
            return Err(TensorError::InvalidArgument(
                "tensor does not require grad and has no grad_fn".into(),
            ));
        }
        autograd::run_backward(self, grad)
    }

    /// A new leaf with the same values and no history.
    pub fn detach(&self) -> RcTensor<T> {
        RcTensor::new(self.to_vec(), self.shape.clone())
    }

    /// Overwrites the values in place, keeping identity and autograd flags.
    pub fn copy_from(&self, other: &RcTensor<T>) -> Result<()> {
        if other.shape() != self.shape() {
            return Err(TensorError::ShapeMismatch {
                expected: self.shape.clone(),
                got: other.shape().to_vec(),
            });
        }
        let values = other.to_vec();
        self.array.borrow_mut().copy_from_slice(&values);
        Ok(())
    }

    /// In-place update used by optimizers; not recorded for autograd.
    pub(crate) fn update_data(&self, f: impl FnOnce(&mut [T])) {
        f(self.array.borrow_mut().as_mut_slice());
    }

    pub fn sum(&self) -> Scalar<T> {
        unwrap_or_panic(functional::sum(self))
    }

    pub fn sum_dim(&self, dim: usize, keepdim: bool) -> Result<RcTensor<T>> {
        functional::sum_dim(self, dim, keepdim)
    }

    pub fn mean(&self) -> Scalar<T> {
        unwrap_or_panic(functional::mean(self))
    }

    pub fn mean_dim(&self, dim: usize, keepdim: bool) -> Result<RcTensor<T>> {
        functional::mean_dim(self, dim, keepdim)
    }

    pub fn argmax(&self, dim: usize) -> Result<RcTensor<i64>> {
        functional::argmax(self, dim)
    }

    pub fn matmul(&self, right: &RcTensor<T>) -> Result<RcTensor<T>> {
        functional::matmul(self, right)
    }

    pub fn transpose(&self, dim0: usize, dim1: usize) -> Result<RcTensor<T>> {
        functional::transpose(self, dim0, dim1)
    }

    /// Transpose of a matrix; tensors with fewer than two dimensions are returned as is.
    pub fn t(&self) -> Result<RcTensor<T>> {
        match self.dim() {
            0 | 1 => Ok(self.clone()),
            2 => functional::transpose(self, 0, 1),
            ndim => Err(TensorError::InvalidArgument(format!(
                "t() expects a tensor with at most 2 dimensions, got {ndim}"
            ))),
        }
    }

    pub fn reshape(&self, shape: &[usize]) -> Result<RcTensor<T>> {
        functional::reshape(self, shape)
    }

    pub fn flatten(&self, start_dim: usize) -> Result<RcTensor<T>> {
        functional::flatten(self, start_dim)
    }

    pub fn broadcast_to(&self, shape: &[usize]) -> Result<RcTensor<T>> {
        functional::broadcast_to(self, shape)
    }

    pub fn slice(&self, ranges: &[SliceRange]) -> Result<RcTensor<T>> {
        functional::slice(self, ranges)
    }

    pub fn index_select(&self, indices: &[usize]) -> Result<RcTensor<T>> {
        functional::index_select(self, indices)
    }
}

impl<T: Numeric + Real> RcTensor<T> {
    pub fn pow(&self, exponent: T) -> RcTensor<T> {
        unwrap_or_panic(functional::pow(self, exponent))
    }

    pub fn exp(&self) -> RcTensor<T> {
        unwrap_or_panic(functional::exp(self))
    }

    pub fn ln(&self) -> RcTensor<T> {
        unwrap_or_panic(functional::ln(self))
    }

    pub fn sqrt(&self) -> RcTensor<T> {
        unwrap_or_panic(functional::sqrt(self))
    }

    pub fn abs(&self) -> RcTensor<T> {
        unwrap_or_panic(functional::abs(self))
    }

    pub fn relu(&self) -> RcTensor<T> {
        unwrap_or_panic(functional::relu(self))
    }

    pub fn sigmoid(&self) -> RcTensor<T> {
        unwrap_or_panic(functional::sigmoid(self))
    }

    pub fn tanh(&self) -> RcTensor<T> {
        unwrap_or_panic(functional::tanh(self))
    }

    pub fn clamp(&self, min: T, max: T) -> RcTensor<T> {
        unwrap_or_panic(functional::clamp(self, min, max))
    }

    pub fn softmax(&self, dim: usize) -> Result<RcTensor<T>> {
        functional::softmax(self, dim)
    }

    pub fn log_softmax(&self, dim: usize) -> Result<RcTensor<T>> {
        functional::log_softmax(self, dim)
    }
}

impl<T> From<T> for RcTensor<T>
where
    T: Numeric,
{
    fn from(value: T) -> Self {
        RcTensor::from_raw(RawTensor::from(value))
    }
}

impl<T, U> From<Vec<U>> for RcTensor<T>
where
    T: Numeric,
    RawTensor<T>: From<U>,
{
    fn from(value: Vec<U>) -> RcTensor<T> {
        RcTensor::from_raw(<RawTensor<T> as From<Vec<U>>>::from(value))
    }
}

impl<T, U, const N: usize> From<[U; N]> for RcTensor<T>
where
    T: Numeric,
    RawTensor<T>: From<U>,
{
    fn from(value: [U; N]) -> RcTensor<T> {
        RcTensor::from_raw(<RawTensor<T> as From<[U; N]>>::from(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_vec() {
        let tensor1 = RcTensor::<i32>::from(vec![vec![0, 1, 2], vec![3, 4, 5]]);
        let tensor2 = RcTensor::new((0..6).collect(), vec![2, 3]);
        assert_eq!(tensor1, tensor2);
    }

    #[test]
    fn test_from_vec_rejects_wrong_length() {
        assert!(matches!(
            RcTensor::from_vec(vec![1.0, 2.0], vec![3]),
            Err(TensorError::ShapeMismatch { .. })
        ));
    }

    #[test]
    #[should_panic]
    fn test_ragged_nested_vec_panics() {
        let _ = RcTensor::<i32>::from(vec![vec![0, 1, 2], vec![3, 4]]);
    }

    #[test]
    fn test_item() {
        assert_eq!(RcTensor::scalar(3.5).item().unwrap(), 3.5);
        assert_eq!(RcTensor::from([[7]]).item().unwrap(), 7);
        assert!(RcTensor::from([1, 2]).item().is_err());
    }

    #[test]
    fn test_integer_tensors_cannot_require_grad() {
        let tensor = RcTensor::from([1, 2, 3]);
        assert!(matches!(
            tensor.requires_grad_(true),
            Err(TensorError::IntegerGrad { dtype: DType::Int32 })
        ));
    }

    #[test]
    fn test_non_leaf_requires_grad_is_rejected() {
        let x = RcTensor::from([1.0]).requires_grad_(true).unwrap();
        let y = x.sum();
        assert!(!y.is_leaf());
        assert_eq!(y.grad_fn_name(), Some("SumBackward"));
        assert!(matches!(y.requires_grad_(false), Err(TensorError::NonLeaf)));
    }

    #[test]
    fn test_backward_requires_single_element() {
        let x = RcTensor::from([1.0, 2.0]).requires_grad_(true).unwrap();
        let y = &x * 2.0f64;
        assert!(matches!(y.backward(), Err(TensorError::NotScalar { .. })));
        y.backward_with(RcTensor::from([1.0, 0.5])).unwrap();
        assert_eq!(x.grad().unwrap(), RcTensor::from([2.0, 1.0]));
    }

    #[test]
    fn test_grad_accumulates_until_zeroed() {
        let x = RcTensor::scalar(3.0).requires_grad_(true).unwrap();
        (&x * &x).backward().unwrap();
        (&x * &x).backward().unwrap();
        assert_eq!(x.grad().unwrap().item().unwrap(), 12.0);
        x.zero_grad();
        assert!(x.grad().is_none());
    }

    #[test]
    fn test_detach_and_copy_from() {
        let x = RcTensor::from([1.0, 2.0]).requires_grad_(true).unwrap();
        let y = (&x * 2.0f64).detach();
        assert!(y.is_leaf());
        assert!(!y.requires_grad());

        let alias = x.clone();
        x.copy_from(&RcTensor::from([5.0, 6.0])).unwrap();
        assert_eq!(alias.to_vec(), vec![5.0, 6.0]);
        assert!(alias.requires_grad());
        assert!(x.copy_from(&RcTensor::from([1.0])).is_err());
    }
}
