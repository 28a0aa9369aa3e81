//! A small tensor library with reverse-mode autograd, neural-network layers,
//! optimizers, datasets and parameter checkpoints.
//!
//! ```
//! use light_primer::tensor::RcTensor;
//!
//! let x = RcTensor::scalar(2.0f64).requires_grad_(true).unwrap();
//! let y = &(&x * &x) + &(&x * 3.0) + 1.0;
//! y.backward().unwrap();
//! assert_eq!(x.grad().unwrap().item().unwrap(), 7.0);
//! ```

pub mod checkpoint;
pub mod config;
pub mod data;
pub mod error;
pub mod nn;
pub mod optim;
pub mod tensor;
pub mod train;

pub use error::{Result, TensorError};
