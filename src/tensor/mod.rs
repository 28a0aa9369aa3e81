mod autograd;
mod creation;
mod display;
pub mod functional;
mod numeric;
mod ops;
mod raw_tensor;
mod rc_tensor;
mod types;
mod utils;

pub use autograd::{is_grad_enabled, no_grad, NoGradGuard};
pub use creation::manual_seed;
pub(crate) use creation::with_rng;
pub use numeric::*;
pub(crate) use numeric::cast;
pub use raw_tensor::*;
pub use rc_tensor::*;
pub use types::*;
