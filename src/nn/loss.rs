use num::traits::real::Real;
use num::ToPrimitive;

use crate::error::{Result, TensorError};
use crate::tensor::{cast, functional, no_grad, Numeric, RcTensor};

/// How per-element losses are combined into the returned scalar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Reduction {
    #[default]
    Mean,
    Sum,
}

fn reduce<T: Numeric>(losses: &RcTensor<T>, reduction: Reduction) -> Result<RcTensor<T>> {
    match reduction {
        Reduction::Mean => functional::mean(losses),
        Reduction::Sum => functional::sum(losses),
    }
}

fn check_same_shape<T: Numeric>(prediction: &RcTensor<T>, target: &RcTensor<T>) -> Result<()> {
    if prediction.shape() != target.shape() {
        return Err(TensorError::ShapeMismatch {
            expected: prediction.shape().to_vec(),
            got: target.shape().to_vec(),
        });
    }
    Ok(())
}

pub fn mse_loss<T: Numeric + Real>(
    prediction: &RcTensor<T>,
    target: &RcTensor<T>,
    reduction: Reduction,
) -> Result<RcTensor<T>> {
    check_same_shape(prediction, target)?;
    let diff = functional::sub(prediction, target)?;
    reduce(&functional::mul(&diff, &diff)?, reduction)
}

pub fn l1_loss<T: Numeric + Real>(
    prediction: &RcTensor<T>,
    target: &RcTensor<T>,
    reduction: Reduction,
) -> Result<RcTensor<T>> {
    check_same_shape(prediction, target)?;
    reduce(&functional::abs(&functional::sub(prediction, target)?)?, reduction)
}

/// One-hot rows for `targets`, which hold class indices stored as `T`.
fn one_hot<T: Numeric + Real>(targets: &RcTensor<T>, classes: usize) -> Result<RcTensor<T>> {
    let mut array = vec![T::zero(); targets.numel() * classes];
    for (row, &value) in targets.to_vec().iter().enumerate() {
        let class = value
            .to_usize()
            .filter(|&c| value.fract() == T::zero() && c < classes)
            .ok_or_else(|| {
                TensorError::InvalidArgument(format!(
                    "class index {value} is not an integer in [0, {classes})"
                ))
            })?;
        array[row * classes + class] = T::one();
    }
    RcTensor::from_vec(array, vec![targets.numel(), classes])
}

/// Cross entropy between `logits` of shape `(N, C)` and class indices of shape `(N)`.
pub fn cross_entropy<T: Numeric + Real>(
    logits: &RcTensor<T>,
    targets: &RcTensor<T>,
    reduction: Reduction,
) -> Result<RcTensor<T>> {
    if logits.dim() != 2 || targets.dim() != 1 || targets.shape()[0] != logits.shape()[0] {
        return Err(TensorError::InvalidArgument(format!(
            "cross_entropy expects logits (N, C) and targets (N), got {:?} and {:?}",
            logits.shape(),
            targets.shape()
        )));
    }
    let mask = no_grad(|| one_hot(targets, logits.shape()[1]))?;
    let log_probs = functional::log_softmax(logits, 1)?;
    let picked = functional::sum_dim(&functional::mul(&log_probs, &mask)?, 1, false)?;
    reduce(&functional::neg(&picked)?, reduction)
}

/// Binary cross entropy on probabilities. Predictions are clamped to
/// `[eps, 1 - eps]` so the logarithms stay finite.
pub fn binary_cross_entropy<T: Numeric + Real>(
    prediction: &RcTensor<T>,
    target: &RcTensor<T>,
    reduction: Reduction,
) -> Result<RcTensor<T>> {
    check_same_shape(prediction, target)?;
    let eps: T = cast(1e-7)?;
    let p = functional::clamp(prediction, eps, T::one() - eps)?;
    let one = RcTensor::scalar(T::one());
    let positive = functional::mul(target, &functional::ln(&p)?)?;
    let negative = functional::mul(
        &functional::sub(&one, target)?,
        &functional::ln(&functional::sub(&one, &p)?)?,
    )?;
    reduce(&functional::neg(&functional::add(&positive, &negative)?)?, reduction)
}

/// A loss function usable as a value, e.g. passed to the training loop.
pub trait Loss<T: Numeric> {
    fn loss(&self, prediction: &RcTensor<T>, target: &RcTensor<T>) -> Result<RcTensor<T>>;

    fn name(&self) -> &'static str;
}

macro_rules! loss_struct {
    ($(#[$doc:meta])* $name:ident, $func:path) => {
        $(#[$doc])*
        #[derive(Debug, Default, Clone, Copy)]
        pub struct $name {
            pub reduction: Reduction,
        }

        impl $name {
            pub fn new() -> Self {
                $name::default()
            }

            pub fn with_reduction(reduction: Reduction) -> Self {
                $name { reduction }
            }
        }

        impl<T: Numeric + Real> Loss<T> for $name {
            fn loss(&self, prediction: &RcTensor<T>, target: &RcTensor<T>) -> Result<RcTensor<T>> {
                $func(prediction, target, self.reduction)
            }

            fn name(&self) -> &'static str {
                stringify!($name)
            }
        }
    };
}

loss_struct!(
    /// Mean squared error.
    MseLoss,
    mse_loss
);
loss_struct!(L1Loss, l1_loss);
loss_struct!(
    /// Expects raw logits and class indices.
    CrossEntropyLoss,
    cross_entropy
);
loss_struct!(BceLoss, binary_cross_entropy);
