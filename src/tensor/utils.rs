use std::cmp::max;

use itertools::EitherOrBoth::{Both, Left, Right};
use itertools::Itertools;

use crate::error::{Result, TensorError};

/// Iterates over every multi-index of a shape in row-major order.
/// A scalar shape `[]` yields a single empty index.
pub struct IndexIterator {
    index: Vec<usize>,
    dimensions: Vec<usize>,
    first: bool,
}

impl IndexIterator {
    pub fn new(dimensions: Vec<usize>) -> IndexIterator {
        IndexIterator {
            index: vec![0; dimensions.len()],
            dimensions,
            first: true,
        }
    }
}

impl Iterator for IndexIterator {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.dimensions.iter().any(|&d| d == 0) {
            return None;
        }
        if self.first {
            self.first = false;
            return Some(self.index.clone());
        }
        if increment_index(&mut self.index, &self.dimensions) {
            return Some(self.index.clone());
        }
        None
    }
}

/// Advances `index` like an odometer. Returns false once every index has been visited.
pub fn increment_index(index: &mut [usize], dimensions: &[usize]) -> bool {
    for i in (0..index.len()).rev() {
        index[i] += 1;
        if index[i] < dimensions[i] {
            return true;
        }
        index[i] = 0;
    }
    false
}

pub fn numel(shape: &[usize]) -> usize {
    shape.iter().product()
}

pub fn strides(shape: &[usize]) -> Vec<usize> {
    let mut strides = vec![1; shape.len()];
    for i in (0..shape.len().saturating_sub(1)).rev() {
        strides[i] = strides[i + 1] * shape[i + 1];
    }
    strides
}

/// Flat offset of `index` in a contiguous tensor of `shape`.
pub fn global_index(index: &[usize], shape: &[usize]) -> Result<usize> {
    if index.len() != shape.len() || index.iter().zip(shape.iter()).any(|(i, d)| i >= d) {
        return Err(TensorError::IndexOutOfBounds {
            index: index.to_vec(),
            shape: shape.to_vec(),
        });
    }
    Ok(index
        .iter()
        .zip(strides(shape).iter())
        .map(|(i, s)| i * s)
        .sum())
}

/// Flat offset into a tensor of `shape` for an index of the (larger) broadcast shape.
/// Missing leading dimensions are skipped and size-1 dimensions always read element 0.
pub fn broadcast_offset(index: &[usize], shape: &[usize]) -> usize {
    let skip = index.len() - shape.len();
    let mut offset = 0;
    let mut multiplier = 1;
    for (&idx, &dim) in index[skip..].iter().rev().zip(shape.iter().rev()) {
        if dim != 1 {
            offset += idx * multiplier;
        }
        multiplier *= dim;
    }
    offset
}

pub fn broadcast_shape(left: &[usize], right: &[usize]) -> Result<Vec<usize>> {
    let mut shape = Vec::with_capacity(max(left.len(), right.len()));
    for pair in left.iter().rev().zip_longest(right.iter().rev()) {
        let dim = match pair {
            Both(&l, &r) if l == r || r == 1 => l,
            Both(&l, &r) if l == 1 => r,
            Both(_, _) => {
                return Err(TensorError::Broadcast {
                    left: left.to_vec(),
                    right: right.to_vec(),
                })
            }
            Left(&l) => l,
            Right(&r) => r,
        };
        shape.push(dim);
    }
    shape.reverse();
    Ok(shape)
}

pub fn check_dim(dim: usize, ndim: usize) -> Result<()> {
    if dim >= ndim {
        return Err(TensorError::DimOutOfRange { dim, ndim });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_iterator_3x2() {
        let indices: Vec<_> = IndexIterator::new(vec![3, 2]).collect();
        assert_eq!(indices.len(), 6);
        assert_eq!(indices[0], vec![0, 0]);
        assert_eq!(indices[1], vec![0, 1]);
        assert_eq!(indices[5], vec![2, 1]);
    }

    #[test]
    fn test_index_iterator_scalar_and_empty() {
        assert_eq!(IndexIterator::new(vec![]).count(), 1);
        assert_eq!(IndexIterator::new(vec![2, 0]).count(), 0);
    }

    #[test]
    fn test_global_index() {
        assert_eq!(global_index(&[1, 1, 1], &[2, 2, 2]).unwrap(), 7);
        assert_eq!(global_index(&[2, 2, 3], &[3, 3, 4]).unwrap(), 35);
        assert!(global_index(&[0, 3], &[3, 3]).is_err());
        assert!(global_index(&[0], &[3, 3]).is_err());
    }

    #[test]
    fn test_broadcast_shape() {
        assert_eq!(broadcast_shape(&[4, 4], &[2, 4, 4]).unwrap(), vec![2, 4, 4]);
        assert_eq!(broadcast_shape(&[3, 1], &[1, 5]).unwrap(), vec![3, 5]);
        assert_eq!(broadcast_shape(&[], &[2]).unwrap(), vec![2]);
        assert!(broadcast_shape(&[3], &[4]).is_err());
    }

    #[test]
    fn test_broadcast_offset() {
        // a [3, 1] tensor read through a [3, 5] index
        assert_eq!(broadcast_offset(&[2, 4], &[3, 1]), 2);
        // a [5] tensor read through a [3, 5] index
        assert_eq!(broadcast_offset(&[2, 4], &[5]), 4);
        assert_eq!(broadcast_offset(&[2, 4], &[]), 0);
    }
}
