use num::traits::real::Real;

use crate::error::Result;
use crate::nn::Module;
use crate::tensor::{functional, Numeric, RcTensor};

macro_rules! activation {
    ($(#[$doc:meta])* $name:ident, $func:path) => {
        $(#[$doc])*
        #[derive(Debug, Default, Clone, Copy)]
        pub struct $name;

        impl $name {
            pub fn new() -> Self {
                $name
            }
        }

        impl<T: Numeric + Real> Module<T> for $name {
            fn forward(&self, input: &RcTensor<T>) -> Result<RcTensor<T>> {
                $func(input)
            }

            fn named_parameters(&self) -> Vec<(String, RcTensor<T>)> {
                vec![]
            }

            fn describe(&self) -> String {
                format!("{}()", stringify!($name))
            }
        }
    };
}

activation!(
    /// `max(0, x)`
    ReLU,
    functional::relu
);
activation!(Sigmoid, functional::sigmoid);
activation!(Tanh, functional::tanh);

/// `x` for positive inputs and `negative_slope * x` otherwise.
#[derive(Debug, Clone, Copy)]
pub struct LeakyReLU<T: Numeric> {
    negative_slope: T,
}

impl<T: Numeric + Real> LeakyReLU<T> {
    pub fn new(negative_slope: T) -> Self {
        LeakyReLU { negative_slope }
    }
}

impl<T: Numeric + Real> Module<T> for LeakyReLU<T> {
    fn forward(&self, input: &RcTensor<T>) -> Result<RcTensor<T>> {
        let positive = functional::relu(input)?;
        let negative = functional::relu(&functional::neg(input)?)?;
        let slope = RcTensor::scalar(self.negative_slope);
        functional::sub(&positive, &functional::mul(&negative, &slope)?)
    }

    fn named_parameters(&self) -> Vec<(String, RcTensor<T>)> {
        vec![]
    }

    fn describe(&self) -> String {
        format!("LeakyReLU(negative_slope={})", self.negative_slope)
    }
}

/// Softmax along `dim`.
#[derive(Debug, Clone, Copy)]
pub struct Softmax {
    dim: usize,
}

impl Softmax {
    pub fn new(dim: usize) -> Self {
        Softmax { dim }
    }
}

impl<T: Numeric + Real> Module<T> for Softmax {
    fn forward(&self, input: &RcTensor<T>) -> Result<RcTensor<T>> {
        functional::softmax(input, self.dim)
    }

    fn named_parameters(&self) -> Vec<(String, RcTensor<T>)> {
        vec![]
    }

    fn describe(&self) -> String {
        format!("Softmax(dim={})", self.dim)
    }
}
