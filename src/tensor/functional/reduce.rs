use crate::error::Result;
use crate::tensor::autograd::record;
use crate::tensor::functional::element_wise_ops::div;
use crate::tensor::numeric::*;
use crate::tensor::utils::{broadcast_offset, check_dim, numel, IndexIterator};
use crate::tensor::RcTensor;

pub fn sum<T: Numeric>(tensor: &RcTensor<T>) -> Result<RcTensor<T>> {
    let total = tensor.data().iter().fold(T::zero(), |acc, &x| acc + x);
    record(
        vec![total],
        vec![],
        vec![tensor.clone()],
        "SumBackward",
        |inputs, grad| {
            let g = grad.data()[0];
            Ok(vec![RcTensor::new_with_filler(inputs[0].shape().to_vec(), g)])
        },
    )
}

fn keepdim_shape(shape: &[usize], dim: usize) -> Vec<usize> {
    let mut kept = shape.to_vec();
    kept[dim] = 1;
    kept
}

fn output_shape(shape: &[usize], dim: usize, keepdim: bool) -> Vec<usize> {
    if keepdim {
        keepdim_shape(shape, dim)
    } else {
        shape
            .iter()
            .enumerate()
            .filter(|&(i, _)| i != dim)
            .map(|(_, &d)| d)
            .collect()
    }
}

/// Sum along `dim`. With `keepdim` the reduced dimension stays as size 1.
pub fn sum_dim<T: Numeric>(tensor: &RcTensor<T>, dim: usize, keepdim: bool) -> Result<RcTensor<T>> {
    check_dim(dim, tensor.dim())?;
    let kept = keepdim_shape(tensor.shape(), dim);
    let mut array = vec![T::zero(); numel(&kept)];
    {
        let data = tensor.data();
        for (flat, idx) in IndexIterator::new(tensor.shape().to_vec()).enumerate() {
            array[broadcast_offset(&idx, &kept)] += data[flat];
        }
    }
    record(
        array,
        output_shape(tensor.shape(), dim, keepdim),
        vec![tensor.clone()],
        "SumBackward",
        move |inputs, grad| {
            let input_shape = inputs[0].shape().to_vec();
            let kept = keepdim_shape(&input_shape, dim);
            let g = grad.data();
            let array = IndexIterator::new(input_shape.clone())
                .map(|idx| g[broadcast_offset(&idx, &kept)])
                .collect();
            Ok(vec![RcTensor::from_vec(array, input_shape)?])
        },
    )
}

pub fn mean<T: Numeric>(tensor: &RcTensor<T>) -> Result<RcTensor<T>> {
    let count = RcTensor::scalar(cast(tensor.numel())?);
    div(&sum(tensor)?, &count)
}

pub fn mean_dim<T: Numeric>(tensor: &RcTensor<T>, dim: usize, keepdim: bool) -> Result<RcTensor<T>> {
    check_dim(dim, tensor.dim())?;
    let count = RcTensor::scalar(cast(tensor.shape()[dim])?);
    div(&sum_dim(tensor, dim, keepdim)?, &count)
}

/// Largest value along `dim`, keeping the dimension. Not recorded for autograd.
pub(in crate::tensor) fn max_keepdim<T: Numeric>(tensor: &RcTensor<T>, dim: usize) -> Result<RcTensor<T>> {
    check_dim(dim, tensor.dim())?;
    let kept = keepdim_shape(tensor.shape(), dim);
    let mut array: Vec<Option<T>> = vec![None; numel(&kept)];
    let data = tensor.data();
    for (flat, idx) in IndexIterator::new(tensor.shape().to_vec()).enumerate() {
        let slot = &mut array[broadcast_offset(&idx, &kept)];
        if slot.map_or(true, |current| data[flat] > current) {
            *slot = Some(data[flat]);
        }
    }
    let array = array.into_iter().map(|v| v.unwrap_or_else(T::zero)).collect();
    RcTensor::from_vec(array, kept)
}

/// Index of the largest value along `dim`; ties resolve to the first occurrence.
pub fn argmax<T: Numeric>(tensor: &RcTensor<T>, dim: usize) -> Result<RcTensor<i64>> {
    check_dim(dim, tensor.dim())?;
    let kept = keepdim_shape(tensor.shape(), dim);
    let mut best: Vec<Option<(T, usize)>> = vec![None; numel(&kept)];
    let data = tensor.data();
    for (flat, idx) in IndexIterator::new(tensor.shape().to_vec()).enumerate() {
        let slot = &mut best[broadcast_offset(&idx, &kept)];
        if slot.map_or(true, |(current, _)| data[flat] > current) {
            *slot = Some((data[flat], idx[dim]));
        }
    }
    let array = best
        .into_iter()
        .map(|v| v.map_or(0, |(_, i)| i as i64))
        .collect();
    RcTensor::from_vec(array, output_shape(tensor.shape(), dim, false))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sum_backward() {
        let input = RcTensor::from([1.0, 2.0, 3.0]).requires_grad_(true).unwrap();
        sum(&input).unwrap().backward().unwrap();
        assert_eq!(input.grad().unwrap(), RcTensor::from([1.0, 1.0, 1.0]));
    }

    #[test]
    fn test_sum_dim() {
        let matrix = RcTensor::<i32>::from([[1, 2, 3], [4, 5, 6]]);
        assert_eq!(sum_dim(&matrix, 0, false).unwrap(), RcTensor::from([5, 7, 9]));
        assert_eq!(sum_dim(&matrix, 1, false).unwrap(), RcTensor::from([6, 15]));
        assert_eq!(
            sum_dim(&matrix, 1, true).unwrap(),
            RcTensor::from([[6], [15]])
        );
        assert!(sum_dim(&matrix, 2, false).is_err());
    }

    #[test]
    fn test_sum_dim_backward_broadcasts_grad() {
        let matrix = RcTensor::from([[1.0, 2.0], [3.0, 4.0]])
            .requires_grad_(true)
            .unwrap();
        let weights = RcTensor::from([10.0, 20.0]);
        let rows = sum_dim(&matrix, 1, false).unwrap();
        (&rows * &weights).sum().backward().unwrap();
        assert_eq!(
            matrix.grad().unwrap(),
            RcTensor::from([[10.0, 10.0], [20.0, 20.0]])
        );
    }

    #[test]
    fn test_mean() {
        let input = RcTensor::from([[1.0, 2.0], [3.0, 6.0]]).requires_grad_(true).unwrap();
        let m = mean(&input).unwrap();
        assert_eq!(m.item().unwrap(), 3.0);
        m.backward().unwrap();
        assert_eq!(input.grad().unwrap(), RcTensor::new_with_filler(vec![2, 2], 0.25));
        assert_eq!(
            mean_dim(&input, 0, false).unwrap(),
            RcTensor::from([2.0, 4.0])
        );
    }

    #[test]
    fn test_argmax() {
        let logits = RcTensor::from([[0.1, 0.7, 0.2], [0.9, 0.05, 0.05], [0.3, 0.3, 0.1]]);
        assert_eq!(argmax(&logits, 1).unwrap(), RcTensor::from([1i64, 0, 0]));
        assert_eq!(argmax(&logits, 0).unwrap(), RcTensor::from([1i64, 0, 0]));
    }

    #[test]
    fn test_max_keepdim() {
        let matrix = RcTensor::from([[1.0, -5.0], [-3.0, -4.0]]);
        assert_eq!(
            max_keepdim(&matrix, 1).unwrap(),
            RcTensor::from([[1.0], [-3.0]])
        );
    }
}
