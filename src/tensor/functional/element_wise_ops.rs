use num::traits::real::Real;

use crate::error::{Result, TensorError};
use crate::tensor::autograd::record;
use crate::tensor::numeric::*;
use crate::tensor::utils::{broadcast_offset, broadcast_shape, numel, IndexIterator};
use crate::tensor::{RcTensor, TensorList};

/// Applies `op` elementwise after broadcasting both operands to a common shape.
fn broadcast_binary<T, F>(
    left: &RcTensor<T>,
    right: &RcTensor<T>,
    op: F,
) -> Result<(Vec<T>, Vec<usize>)>
where
    T: Numeric,
    F: Fn(T, T) -> T,
{
    let (l, r) = (left.data(), right.data());
    if left.shape() == right.shape() {
        let array = l.iter().zip(r.iter()).map(|(&a, &b)| op(a, b)).collect();
        return Ok((array, left.shape().to_vec()));
    }
    let shape = broadcast_shape(left.shape(), right.shape())?;
    let array = IndexIterator::new(shape.clone())
        .map(|idx| {
            op(
                l[broadcast_offset(&idx, left.shape())],
                r[broadcast_offset(&idx, right.shape())],
            )
        })
        .collect();
    Ok((array, shape))
}

/// Sums a gradient over the dimensions that were broadcast, so it matches `shape` again.
pub(in crate::tensor) fn sum_to_shape<T: Numeric>(
    grad: &RcTensor<T>,
    shape: &[usize],
) -> Result<RcTensor<T>> {
    if grad.shape() == shape {
        return Ok(grad.clone());
    }
    let mut array = vec![T::zero(); numel(shape)];
    let data = grad.data();
    for (flat, idx) in IndexIterator::new(grad.shape().to_vec()).enumerate() {
        array[broadcast_offset(&idx, shape)] += data[flat];
    }
    RcTensor::from_vec(array, shape.to_vec())
}

pub fn add<T: Numeric>(left: &RcTensor<T>, right: &RcTensor<T>) -> Result<RcTensor<T>> {
    let (array, shape) = broadcast_binary(left, right, |a, b| a + b)?;
    record(
        array,
        shape,
        vec![left.clone(), right.clone()],
        "AddBackward",
        |inputs, grad| {
            Ok(vec![
                sum_to_shape(grad, inputs[0].shape())?,
                sum_to_shape(grad, inputs[1].shape())?,
            ])
        },
    )
}

pub fn sub<T: Numeric>(left: &RcTensor<T>, right: &RcTensor<T>) -> Result<RcTensor<T>> {
    let (array, shape) = broadcast_binary(left, right, |a, b| a - b)?;
    record(
        array,
        shape,
        vec![left.clone(), right.clone()],
        "SubBackward",
        |inputs, grad| {
            Ok(vec![
                sum_to_shape(grad, inputs[0].shape())?,
                sum_to_shape(&neg(grad)?, inputs[1].shape())?,
            ])
        },
    )
}

pub fn mul<T: Numeric>(left: &RcTensor<T>, right: &RcTensor<T>) -> Result<RcTensor<T>> {
    let (array, shape) = broadcast_binary(left, right, |a, b| a * b)?;
    record(
        array,
        shape,
        vec![left.clone(), right.clone()],
        "MulBackward",
        |inputs, grad| {
            let (left, right) = (&inputs[0], &inputs[1]);
            Ok(vec![
                sum_to_shape(&mul(grad, right)?, left.shape())?,
                sum_to_shape(&mul(grad, left)?, right.shape())?,
            ])
        },
    )
}

/// Elementwise quotient. Integer tensors reject zero divisors instead of panicking.
pub fn div<T: Numeric>(left: &RcTensor<T>, right: &RcTensor<T>) -> Result<RcTensor<T>> {
    if !T::DTYPE.is_floating_point() && right.data().iter().any(|v| v.is_zero()) {
        return Err(TensorError::InvalidArgument(format!(
            "integer division by zero ({} divisor)",
            T::DTYPE
        )));
    }
    let (array, shape) = broadcast_binary(left, right, |a, b| a / b)?;
    record(
        array,
        shape,
        vec![left.clone(), right.clone()],
        "DivBackward",
        |inputs, grad| {
            let (left, right) = (&inputs[0], &inputs[1]);
            // d(l / r)/dr = -l / r^2
            let right_grad = neg(&div(&mul(grad, left)?, &mul(right, right)?)?)?;
            Ok(vec![
                sum_to_shape(&div(grad, right)?, left.shape())?,
                sum_to_shape(&right_grad, right.shape())?,
            ])
        },
    )
}

pub fn neg<T: Numeric>(tensor: &RcTensor<T>) -> Result<RcTensor<T>> {
    let array = tensor.data().iter().map(|&v| -v).collect();
    record(
        array,
        tensor.shape().to_vec(),
        vec![tensor.clone()],
        "NegBackward",
        |_, grad| Ok(vec![neg(grad)?]),
    )
}

/// Elementwise `f` whose local derivative at input `v` is `derivative(v)`.
fn unary<T, F, D>(tensor: &RcTensor<T>, name: &'static str, f: F, derivative: D) -> Result<RcTensor<T>>
where
    T: Numeric,
    F: Fn(T) -> T,
    D: Fn(T) -> T + 'static,
{
    let array = tensor.data().iter().map(|&v| f(v)).collect();
    record(
        array,
        tensor.shape().to_vec(),
        vec![tensor.clone()],
        name,
        move |inputs: &[RcTensor<T>], grad: &RcTensor<T>| -> Result<TensorList<T>> {
            let input = &inputs[0];
            let array = input
                .data()
                .iter()
                .zip(grad.data().iter())
                .map(|(&v, &g)| g * derivative(v))
                .collect();
            Ok(vec![RcTensor::from_vec(array, input.shape().to_vec())?])
        },
    )
}

fn sigmoid_value<T: Numeric + Real>(v: T) -> T {
    T::one() / (T::one() + (-v).exp())
}

pub fn exp<T: Numeric + Real>(tensor: &RcTensor<T>) -> Result<RcTensor<T>> {
    unary(tensor, "ExpBackward", |v| v.exp(), |v| v.exp())
}

pub fn ln<T: Numeric + Real>(tensor: &RcTensor<T>) -> Result<RcTensor<T>> {
    unary(tensor, "LogBackward", |v| v.ln(), |v| T::one() / v)
}

pub fn sqrt<T: Numeric + Real>(tensor: &RcTensor<T>) -> Result<RcTensor<T>> {
    let two = T::one() + T::one();
    unary(
        tensor,
        "SqrtBackward",
        |v| v.sqrt(),
        move |v| T::one() / (two * v.sqrt()),
    )
}

pub fn pow<T: Numeric + Real>(tensor: &RcTensor<T>, exponent: T) -> Result<RcTensor<T>> {
    unary(
        tensor,
        "PowBackward",
        |v| v.powf(exponent),
        move |v| exponent * v.powf(exponent - T::one()),
    )
}

pub fn abs<T: Numeric + Real>(tensor: &RcTensor<T>) -> Result<RcTensor<T>> {
    unary(
        tensor,
        "AbsBackward",
        |v| Real::abs(v),
        |v| {
            if v > T::zero() {
                T::one()
            } else if v < T::zero() {
                -T::one()
            } else {
                T::zero()
            }
        },
    )
}

pub fn relu<T: Numeric + Real>(tensor: &RcTensor<T>) -> Result<RcTensor<T>> {
    unary(
        tensor,
        "ReluBackward",
        |v| v.max(T::zero()),
        |v| if v > T::zero() { T::one() } else { T::zero() },
    )
}

pub fn sigmoid<T: Numeric + Real>(tensor: &RcTensor<T>) -> Result<RcTensor<T>> {
    unary(tensor, "SigmoidBackward", sigmoid_value, |v| {
        let s = sigmoid_value(v);
        s * (T::one() - s)
    })
}

pub fn tanh<T: Numeric + Real>(tensor: &RcTensor<T>) -> Result<RcTensor<T>> {
    unary(
        tensor,
        "TanhBackward",
        |v| v.tanh(),
        |v| T::one() - v.tanh().powi(2),
    )
}

/// Gradient flows only where `min <= v <= max`.
pub fn clamp<T: Numeric + Real>(tensor: &RcTensor<T>, min: T, max: T) -> Result<RcTensor<T>> {
    unary(
        tensor,
        "ClampBackward",
        move |v| v.max(min).min(max),
        move |v| {
            if v >= min && v <= max {
                T::one()
            } else {
                T::zero()
            }
        },
    )
}
