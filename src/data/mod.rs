//! Indexed datasets and a batching loader over them.

mod loader;

pub use loader::{DataLoader, DataLoaderIter};

use crate::error::{Result, TensorError};
use crate::tensor::{Numeric, RcTensor, SliceRange};

/// A collection of `(input, target)` samples addressable by index.
pub trait Dataset<T: Numeric> {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn get(&self, index: usize) -> Result<(RcTensor<T>, RcTensor<T>)>;
}

/// Pairs two tensors along their first dimension; sample `i` is row `i` of each.
#[derive(Debug, Clone)]
pub struct TensorDataset<T: Numeric> {
    inputs: RcTensor<T>,
    targets: RcTensor<T>,
}

impl<T: Numeric> TensorDataset<T> {
    pub fn new(inputs: RcTensor<T>, targets: RcTensor<T>) -> Result<Self> {
        if inputs.dim() == 0 || targets.dim() == 0 {
            return Err(TensorError::InvalidArgument(
                "dataset tensors need a leading sample dimension".into(),
            ));
        }
        if inputs.shape()[0] != targets.shape()[0] {
            return Err(TensorError::ShapeMismatch {
                expected: vec![inputs.shape()[0]],
                got: vec![targets.shape()[0]],
            });
        }
        Ok(TensorDataset { inputs, targets })
    }

    pub fn inputs(&self) -> &RcTensor<T> {
        &self.inputs
    }

    pub fn targets(&self) -> &RcTensor<T> {
        &self.targets
    }
}

fn row<T: Numeric>(tensor: &RcTensor<T>, index: usize) -> Result<RcTensor<T>> {
    let mut ranges = vec![SliceRange::new(index, index + 1)];
    ranges.extend(tensor.shape()[1..].iter().map(|&d| SliceRange::full(d)));
    tensor.slice(&ranges)?.reshape(&tensor.shape()[1..])
}

impl<T: Numeric> Dataset<T> for TensorDataset<T> {
    fn len(&self) -> usize {
        self.inputs.shape()[0]
    }

    fn get(&self, index: usize) -> Result<(RcTensor<T>, RcTensor<T>)> {
        if index >= self.len() {
            return Err(TensorError::IndexOutOfBounds {
                index: vec![index],
                shape: self.inputs.shape().to_vec(),
            });
        }
        Ok((row(&self.inputs, index)?, row(&self.targets, index)?))
    }
}
