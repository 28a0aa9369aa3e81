use std::cell::{Cell, Ref, RefCell};
use std::cmp::PartialEq;

use super::autograd::Derivative;
use super::numeric::*;
use super::rc_tensor::RcTensor;
use super::utils::{global_index, numel};
use crate::error::{Result, TensorError};

#[derive(Debug, PartialEq, Clone)]
pub struct SliceRange {
    /// inclusive
    pub(in crate::tensor) start: usize,
    /// exclusive
    pub(in crate::tensor) end: usize,
}

impl SliceRange {
    pub fn new(start: usize, end: usize) -> SliceRange {
        assert!(start <= end);
        SliceRange { start, end }
    }

    /// The whole of a dimension of size `dim`.
    pub fn full(dim: usize) -> SliceRange {
        SliceRange { start: 0, end: dim }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// The storage behind every `RcTensor`: contiguous row-major data plus autograd state.
#[derive(Debug)]
pub struct RawTensor<T>
where
    T: Numeric,
{
    pub(in crate::tensor) array: RefCell<Vec<T>>,
    pub(in crate::tensor) shape: Vec<usize>,
    pub(in crate::tensor) requires_grad: Cell<bool>,
    pub(in crate::tensor) grad: RefCell<Option<RcTensor<T>>>,
    pub(in crate::tensor) grad_fn: Option<Derivative<T>>,
}

impl<T: Numeric> PartialEq for RawTensor<T> {
    fn eq(&self, other: &Self) -> bool {
        self.shape == other.shape && *self.array.borrow() == *other.array.borrow()
    }
}

impl<T> Default for RawTensor<T>
where
    T: Numeric,
{
    fn default() -> Self {
        RawTensor {
            array: RefCell::new(vec![]),
            shape: vec![],
            requires_grad: Cell::new(false),
            grad: RefCell::new(None),
            grad_fn: None,
        }
    }
}

impl<T> RawTensor<T>
where
    T: Numeric,
{
    pub(in crate::tensor) fn new(array: Vec<T>, shape: Vec<usize>) -> Result<RawTensor<T>> {
        if array.len() != numel(&shape) {
            return Err(TensorError::ShapeMismatch {
                expected: shape,
                got: vec![array.len()],
            });
        }
        Ok(RawTensor {
            array: RefCell::new(array),
            shape,
            ..Default::default()
        })
    }

    /// Note! An empty shape constructs a scalar.
    pub(in crate::tensor) fn new_with_filler(shape: Vec<usize>, filler: T) -> RawTensor<T> {
        RawTensor {
            array: RefCell::new(vec![filler; numel(&shape)]),
            shape,
            ..Default::default()
        }
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn numel(&self) -> usize {
        numel(&self.shape)
    }

    pub fn is_scalar(&self) -> bool {
        self.shape.is_empty()
    }

    pub(in crate::tensor) fn data(&self) -> Ref<'_, Vec<T>> {
        self.array.borrow()
    }

    pub fn get(&self, index: &[usize]) -> Result<T> {
        let global_idx = global_index(index, &self.shape)?;
        Ok(self.array.borrow()[global_idx])
    }

    pub(in crate::tensor) fn set(&self, index: &[usize], value: T) -> Result<()> {
        let global_idx = global_index(index, &self.shape)?;
        self.array.borrow_mut()[global_idx] = value;
        Ok(())
    }
}

impl<T> From<T> for RawTensor<T>
where
    T: Numeric,
{
    fn from(value: T) -> Self {
        RawTensor::new_with_filler(vec![], value)
    }
}

impl<T, U> From<Vec<U>> for RawTensor<T>
where
    T: Numeric,
    RawTensor<T>: From<U>,
{
    /// Panics on ragged input.
    fn from(value: Vec<U>) -> RawTensor<T> {
        let tensors: Vec<RawTensor<T>> = value.into_iter().map(RawTensor::from).collect();
        let inner_shape = tensors.first().map(|t| t.shape.clone()).unwrap_or_default();
        assert!(
            tensors.iter().all(|t| t.shape == inner_shape),
            "nested arrays must all have the same shape"
        );
        let mut shape = vec![tensors.len()];
        shape.extend_from_slice(&inner_shape);
        let array = tensors
            .into_iter()
            .flat_map(|t| t.array.into_inner())
            .collect();
        RawTensor {
            array: RefCell::new(array),
            shape,
            ..Default::default()
        }
    }
}

impl<T, U, const N: usize> From<[U; N]> for RawTensor<T>
where
    T: Numeric,
    RawTensor<T>: From<U>,
{
    fn from(value: [U; N]) -> RawTensor<T> {
        From::from(Vec::from(value))
    }
}
