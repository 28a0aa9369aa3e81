mod element_wise_ops;
mod misc;
mod reduce;

pub use element_wise_ops::*;
pub use misc::*;
pub use reduce::*;
