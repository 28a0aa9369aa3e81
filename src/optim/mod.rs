mod adam;
mod sgd;

pub use adam::Adam;
pub use sgd::Sgd;

use crate::error::{Result, TensorError};
use crate::tensor::Numeric;

/// Updates a fixed set of parameters from their accumulated gradients.
pub trait Optimizer<T: Numeric> {
    /// Applies one update. Parameters without a gradient are left untouched.
    fn step(&mut self) -> Result<()>;

    /// Clears the gradient of every parameter.
    fn zero_grad(&self);

    fn learning_rate(&self) -> T;

    fn set_learning_rate(&mut self, learning_rate: T) -> Result<()>;
}

pub(crate) fn check_learning_rate<T: Numeric>(learning_rate: T) -> Result<T> {
    if learning_rate <= T::zero() {
        return Err(TensorError::InvalidArgument(format!(
            "learning rate must be positive, got {learning_rate}"
        )));
    }
    Ok(learning_rate)
}
