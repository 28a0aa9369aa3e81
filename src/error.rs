use thiserror::Error;

use crate::tensor::DType;

/// Error type shared by tensors, modules, optimizers and checkpoints.
#[derive(Error, Debug)]
pub enum TensorError {
    #[error("shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        got: Vec<usize>,
    },
    #[error("shapes {left:?} and {right:?} cannot be broadcast together")]
    Broadcast { left: Vec<usize>, right: Vec<usize> },
    #[error("index {index:?} is out of bounds for shape {shape:?}")]
    IndexOutOfBounds {
        index: Vec<usize>,
        shape: Vec<usize>,
    },
    #[error("dimension {dim} is out of range for a tensor with {ndim} dimensions")]
    DimOutOfRange { dim: usize, ndim: usize },
    #[error("cannot matrix-multiply shapes {left:?} and {right:?}")]
    MatmulShape { left: Vec<usize>, right: Vec<usize> },
    #[error("grad can be implicitly created only for single-element outputs, got shape {shape:?}")]
    NotScalar { shape: Vec<usize> },
    #[error("only floating point tensors can require gradients, got {dtype}")]
    IntegerGrad { dtype: DType },
    #[error("requires_grad can only be changed on leaf tensors")]
    NonLeaf,
    #[error("expected dtype {expected}, got {got}")]
    DTypeMismatch { expected: DType, got: DType },
    #[error("missing key in state dict: {0}")]
    MissingKey(String),
    #[error("unexpected key in state dict: {0}")]
    UnexpectedKey(String),
    #[error("unsupported checkpoint format version {0}")]
    FormatVersion(u32),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Toml(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, TensorError>;
