use num::traits::real::Real;
use rand::Rng;

use crate::error::{Result, TensorError};
use crate::nn::Module;
use crate::tensor::{cast, functional, with_rng, Numeric, RcTensor};

/// Inverted dropout: in training mode each element is zeroed with probability `p`
/// and the survivors are scaled by `1 / (1 - p)`. In eval mode it is the identity.
#[derive(Debug, Clone)]
pub struct Dropout {
    p: f64,
    training: bool,
}

impl Dropout {
    pub fn new(p: f64) -> Result<Self> {
        if !(0.0..1.0).contains(&p) {
            return Err(TensorError::InvalidArgument(format!(
                "dropout probability must be in [0, 1), got {p}"
            )));
        }
        Ok(Dropout { p, training: true })
    }

    pub fn is_training(&self) -> bool {
        self.training
    }
}

impl<T: Numeric + Real> Module<T> for Dropout {
    fn forward(&self, input: &RcTensor<T>) -> Result<RcTensor<T>> {
        if !self.training || self.p == 0.0 {
            return Ok(input.clone());
        }
        let scale: T = cast(1.0 / (1.0 - self.p))?;
        let mask: Vec<T> = with_rng(|rng| {
            (0..input.numel())
                .map(|_| if rng.gen::<f64>() < self.p { T::zero() } else { scale })
                .collect()
        });
        let mask = RcTensor::from_vec(mask, input.shape().to_vec())?;
        functional::mul(input, &mask)
    }

    fn named_parameters(&self) -> Vec<(String, RcTensor<T>)> {
        vec![]
    }

    fn set_training(&mut self, training: bool) {
        self.training = training;
    }

    fn is_training(&self) -> bool {
        self.training
    }

    fn describe(&self) -> String {
        format!("Dropout(p={})", self.p)
    }
}

/// Flattens every dimension from `start_dim` onwards, `1` by default so the batch
/// dimension is kept.
#[derive(Debug, Clone, Copy)]
pub struct Flatten {
    start_dim: usize,
}

impl Flatten {
    pub fn new() -> Self {
        Flatten { start_dim: 1 }
    }

    pub fn with_start_dim(start_dim: usize) -> Self {
        Flatten { start_dim }
    }
}

impl Default for Flatten {
    fn default() -> Self {
        Flatten::new()
    }
}

impl<T: Numeric> Module<T> for Flatten {
    fn forward(&self, input: &RcTensor<T>) -> Result<RcTensor<T>> {
        functional::flatten(input, self.start_dim)
    }

    fn named_parameters(&self) -> Vec<(String, RcTensor<T>)> {
        vec![]
    }

    fn describe(&self) -> String {
        format!("Flatten(start_dim={})", self.start_dim)
    }
}
