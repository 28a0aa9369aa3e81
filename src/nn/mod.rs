mod activation;
mod dropout;
mod feed_forward;
mod linear;
pub mod loss;
pub(crate) mod module;
mod sequential;

pub use activation::{LeakyReLU, ReLU, Sigmoid, Softmax, Tanh};
pub use dropout::{Dropout, Flatten};
pub use feed_forward::{Mlp, TwoLayerNet};
pub use linear::Linear;
pub use loss::{BceLoss, CrossEntropyLoss, L1Loss, Loss, MseLoss, Reduction};
pub use module::Module;
pub use sequential::Sequential;
