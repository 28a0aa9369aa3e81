use crate::tensor::RcTensor;

// Aliases kept for readability in signatures that pass several tensors around.
pub type TensorList<T> = Vec<RcTensor<T>>;

pub type Scalar<T> = RcTensor<T>;
