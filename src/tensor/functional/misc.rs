use num::traits::real::Real;
use rayon::prelude::*;

use crate::error::{Result, TensorError};
use crate::tensor::autograd::record;
use crate::tensor::functional::element_wise_ops::sum_to_shape;
use crate::tensor::functional::reduce::max_keepdim;
use crate::tensor::functional::{div, exp, ln, sub, sum_dim};
use crate::tensor::numeric::*;
use crate::tensor::utils::{
    broadcast_offset, broadcast_shape, check_dim, global_index, numel, IndexIterator,
};
use crate::tensor::{RcTensor, SliceRange};

/// `(m, k) @ (k, n)` on flat row-major buffers. Output rows are filled in parallel.
fn matmul_kernel<T: Numeric>(left: &[T], right: &[T], m: usize, k: usize, n: usize) -> Vec<T> {
    let mut out = vec![T::zero(); m * n];
    if n == 0 {
        return out;
    }
    out.par_chunks_mut(n).enumerate().for_each(|(i, row)| {
        for p in 0..k {
            let a = left[i * k + p];
            for (j, value) in row.iter_mut().enumerate() {
                *value += a * right[p * n + j];
            }
        }
    });
    out
}

fn transpose_kernel<T: Numeric>(data: &[T], rows: usize, cols: usize) -> Vec<T> {
    let mut out = Vec::with_capacity(rows * cols);
    for j in 0..cols {
        for i in 0..rows {
            out.push(data[i * cols + j]);
        }
    }
    out
}

/// Matrix product. The left operand may carry leading batch dimensions (or be a
/// vector), the right operand is a matrix or a vector.
///
/// ```
/// # use light_primer::tensor::*;
/// let matrix = RcTensor::new(vec![0, 1, 2, 3], vec![2, 2]);
/// let diag = RcTensor::new(vec![1, 1], vec![2, 1]);
/// assert_eq!(matrix.matmul(&diag).unwrap(), RcTensor::new(vec![1, 5], vec![2, 1]));
/// ```
pub fn matmul<T: Numeric>(left: &RcTensor<T>, right: &RcTensor<T>) -> Result<RcTensor<T>> {
    let mismatch = || TensorError::MatmulShape {
        left: left.shape().to_vec(),
        right: right.shape().to_vec(),
    };
    if left.dim() == 0 || right.dim() == 0 || right.dim() > 2 {
        return Err(mismatch());
    }
    let k = left.shape()[left.dim() - 1];
    if right.shape()[0] != k {
        return Err(mismatch());
    }
    let n = if right.dim() == 2 { right.shape()[1] } else { 1 };
    let rows = numel(&left.shape()[..left.dim() - 1]);

    let mut shape = left.shape()[..left.dim() - 1].to_vec();
    if right.dim() == 2 {
        shape.push(n);
    }
    let array = matmul_kernel(&left.data(), &right.data(), rows, k, n);
    record(
        array,
        shape,
        vec![left.clone(), right.clone()],
        "MmBackward",
        move |inputs, grad| {
            let (left, right) = (&inputs[0], &inputs[1]);
            let g = grad.data();
            // dL/dA = G B^T, dL/dB = A^T G
            let right_t = transpose_kernel(&right.data(), k, n);
            let left_grad = matmul_kernel(&g, &right_t, rows, n, k);
            let left_t = transpose_kernel(&left.data(), rows, k);
            let right_grad = matmul_kernel(&left_t, &g, k, rows, n);
            Ok(vec![
                RcTensor::from_vec(left_grad, left.shape().to_vec())?,
                RcTensor::from_vec(right_grad, right.shape().to_vec())?,
            ])
        },
    )
}

/// Swaps two dimensions.
pub fn transpose<T: Numeric>(tensor: &RcTensor<T>, dim0: usize, dim1: usize) -> Result<RcTensor<T>> {
    check_dim(dim0, tensor.dim())?;
    check_dim(dim1, tensor.dim())?;
    let mut shape = tensor.shape().to_vec();
    shape.swap(dim0, dim1);
    let array = {
        let data = tensor.data();
        let mut array = Vec::with_capacity(tensor.numel());
        for mut idx in IndexIterator::new(shape.clone()) {
            idx.swap(dim0, dim1);
            array.push(data[global_index(&idx, tensor.shape())?]);
        }
        array
    };
    record(
        array,
        shape,
        vec![tensor.clone()],
        "TransposeBackward",
        move |_, grad| Ok(vec![transpose(grad, dim0, dim1)?]),
    )
}

pub fn reshape<T: Numeric>(tensor: &RcTensor<T>, shape: &[usize]) -> Result<RcTensor<T>> {
    if numel(shape) != tensor.numel() {
        return Err(TensorError::ShapeMismatch {
            expected: tensor.shape().to_vec(),
            got: shape.to_vec(),
        });
    }
    let array = tensor.to_vec();
    record(
        array,
        shape.to_vec(),
        vec![tensor.clone()],
        "ViewBackward",
        |inputs, grad| Ok(vec![reshape(grad, inputs[0].shape())?]),
    )
}

/// Collapses every dimension from `start_dim` onwards into one.
pub fn flatten<T: Numeric>(tensor: &RcTensor<T>, start_dim: usize) -> Result<RcTensor<T>> {
    if tensor.dim() == 0 {
        return reshape(tensor, &[1]);
    }
    check_dim(start_dim, tensor.dim())?;
    let mut shape = tensor.shape()[..start_dim].to_vec();
    shape.push(numel(&tensor.shape()[start_dim..]));
    reshape(tensor, &shape)
}

pub fn broadcast_to<T: Numeric>(tensor: &RcTensor<T>, shape: &[usize]) -> Result<RcTensor<T>> {
    let target = broadcast_shape(tensor.shape(), shape)?;
    if target != shape {
        return Err(TensorError::Broadcast {
            left: tensor.shape().to_vec(),
            right: shape.to_vec(),
        });
    }
    let array = {
        let data = tensor.data();
        IndexIterator::new(target.clone())
            .map(|idx| data[broadcast_offset(&idx, tensor.shape())])
            .collect()
    };
    record(
        array,
        target,
        vec![tensor.clone()],
        "ExpandBackward",
        |inputs, grad| Ok(vec![sum_to_shape(grad, inputs[0].shape())?]),
    )
}

/// Copies out a rectangular region, one half-open range per dimension.
pub fn slice<T: Numeric>(tensor: &RcTensor<T>, ranges: &[SliceRange]) -> Result<RcTensor<T>> {
    if ranges.len() != tensor.dim()
        || ranges
            .iter()
            .zip(tensor.shape().iter())
            .any(|(range, &dim)| range.end > dim)
    {
        return Err(TensorError::IndexOutOfBounds {
            index: ranges.iter().map(|r| r.end).collect(),
            shape: tensor.shape().to_vec(),
        });
    }
    let shape: Vec<usize> = ranges.iter().map(|r| r.len()).collect();
    let array = {
        let data = tensor.data();
        let mut array = Vec::with_capacity(numel(&shape));
        for idx in IndexIterator::new(shape.clone()) {
            let source: Vec<usize> = idx.iter().zip(ranges).map(|(i, r)| i + r.start).collect();
            array.push(data[global_index(&source, tensor.shape())?]);
        }
        array
    };
    let ranges = ranges.to_vec();
    record(
        array,
        shape,
        vec![tensor.clone()],
        "SliceBackward",
        move |inputs, grad| {
            let input_shape = inputs[0].shape().to_vec();
            let mut array = vec![T::zero(); numel(&input_shape)];
            let g = grad.data();
            for (flat, idx) in IndexIterator::new(grad.shape().to_vec()).enumerate() {
                let target: Vec<usize> =
                    idx.iter().zip(&ranges).map(|(i, r)| i + r.start).collect();
                array[global_index(&target, &input_shape)?] += g[flat];
            }
            Ok(vec![RcTensor::from_vec(array, input_shape)?])
        },
    )
}

/// Gathers rows (entries of dimension 0) in the order given by `indices`.
pub fn index_select<T: Numeric>(tensor: &RcTensor<T>, indices: &[usize]) -> Result<RcTensor<T>> {
    if tensor.dim() == 0 {
        return Err(TensorError::DimOutOfRange { dim: 0, ndim: 0 });
    }
    let rows = tensor.shape()[0];
    let row_len = numel(&tensor.shape()[1..]);
    if let Some(&bad) = indices.iter().find(|&&i| i >= rows) {
        return Err(TensorError::IndexOutOfBounds {
            index: vec![bad],
            shape: tensor.shape().to_vec(),
        });
    }
    let array = {
        let data = tensor.data();
        indices
            .iter()
            .flat_map(|&i| data[i * row_len..(i + 1) * row_len].iter().copied())
            .collect()
    };
    let mut shape = tensor.shape().to_vec();
    shape[0] = indices.len();
    let indices = indices.to_vec();
    record(
        array,
        shape,
        vec![tensor.clone()],
        "IndexSelectBackward",
        move |inputs, grad| {
            let input_shape = inputs[0].shape().to_vec();
            let mut array = vec![T::zero(); numel(&input_shape)];
            let g = grad.data();
            for (row, &i) in indices.iter().enumerate() {
                for j in 0..row_len {
                    array[i * row_len + j] += g[row * row_len + j];
                }
            }
            Ok(vec![RcTensor::from_vec(array, input_shape)?])
        },
    )
}

/// Joins tensors along an existing dimension. All other dimensions must agree.
pub fn cat<T: Numeric>(tensors: &[RcTensor<T>], dim: usize) -> Result<RcTensor<T>> {
    let first = tensors
        .first()
        .ok_or_else(|| TensorError::InvalidArgument("cat needs at least one tensor".into()))?;
    check_dim(dim, first.dim())?;
    for tensor in tensors.iter() {
        let same_rank = tensor.dim() == first.dim();
        let compatible = same_rank
            && tensor
                .shape()
                .iter()
                .zip(first.shape())
                .enumerate()
                .all(|(i, (a, b))| i == dim || a == b);
        if !compatible {
            return Err(TensorError::ShapeMismatch {
                expected: first.shape().to_vec(),
                got: tensor.shape().to_vec(),
            });
        }
    }
    let outer = numel(&first.shape()[..dim]);
    let inner = numel(&first.shape()[dim + 1..]);
    let blocks: Vec<usize> = tensors.iter().map(|t| t.shape()[dim] * inner).collect();

    let mut shape = first.shape().to_vec();
    shape[dim] = tensors.iter().map(|t| t.shape()[dim]).sum();
    let mut array = Vec::with_capacity(numel(&shape));
    for o in 0..outer {
        for (tensor, &block) in tensors.iter().zip(&blocks) {
            array.extend_from_slice(&tensor.data()[o * block..(o + 1) * block]);
        }
    }
    record(
        array,
        shape,
        tensors.to_vec(),
        "CatBackward",
        move |inputs, grad| {
            let g = grad.data();
            let total: usize = blocks.iter().sum();
            let mut grads = Vec::with_capacity(inputs.len());
            let mut offset = 0;
            for (input, &block) in inputs.iter().zip(&blocks) {
                let mut array = Vec::with_capacity(input.numel());
                for o in 0..outer {
                    let start = o * total + offset;
                    array.extend_from_slice(&g[start..start + block]);
                }
                grads.push(RcTensor::from_vec(array, input.shape().to_vec())?);
                offset += block;
            }
            Ok(grads)
        },
    )
}

/// Joins tensors of identical shape along a new dimension.
pub fn stack<T: Numeric>(tensors: &[RcTensor<T>], dim: usize) -> Result<RcTensor<T>> {
    let first = tensors
        .first()
        .ok_or_else(|| TensorError::InvalidArgument("stack needs at least one tensor".into()))?;
    if dim > first.dim() {
        return Err(TensorError::DimOutOfRange {
            dim,
            ndim: first.dim() + 1,
        });
    }
    let expanded = tensors
        .iter()
        .map(|tensor| {
            if tensor.shape() != first.shape() {
                return Err(TensorError::ShapeMismatch {
                    expected: first.shape().to_vec(),
                    got: tensor.shape().to_vec(),
                });
            }
            let mut shape = tensor.shape().to_vec();
            shape.insert(dim, 1);
            reshape(tensor, &shape)
        })
        .collect::<Result<Vec<_>>>()?;
    cat(&expanded, dim)
}

pub fn softmax<T: Numeric + Real>(tensor: &RcTensor<T>, dim: usize) -> Result<RcTensor<T>> {
    // subtract the row max so exp stays finite
    let shifted = sub(tensor, &max_keepdim(tensor, dim)?)?;
    let exps = exp(&shifted)?;
    div(&exps, &sum_dim(&exps, dim, true)?)
}

pub fn log_softmax<T: Numeric + Real>(tensor: &RcTensor<T>, dim: usize) -> Result<RcTensor<T>> {
    let shifted = sub(tensor, &max_keepdim(tensor, dim)?)?;
    let log_sum = ln(&sum_dim(&exp(&shifted)?, dim, true)?)?;
    sub(&shifted, &log_sum)
}
