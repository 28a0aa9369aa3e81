pub use num::{One, Zero};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Result, TensorError};

pub use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DType {
    Int32,
    Int64,
    Float32,
    Float64,
}

impl DType {
    pub fn is_floating_point(&self) -> bool {
        matches!(self, DType::Float32 | DType::Float64)
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DType::Int32 => "int32",
            DType::Int64 => "int64",
            DType::Float32 => "float32",
            DType::Float64 => "float64",
        };
        write!(f, "{name}")
    }
}

pub trait Numeric:
    num::Num
    + num::Signed
    + num::NumCast
    + AddAssign
    + Copy
    + PartialOrd
    + fmt::Debug
    + fmt::Display
    + Serialize
    + DeserializeOwned
    + Send
    + Sync
    + 'static
{
    const DTYPE: DType;
}

// https://stackoverflow.com/questions/42381185/specifying-generic-parameter-to-belong-to-a-small-set-of-types
macro_rules! numeric_impl {
    ($($t: ty => $dtype: expr),+) => {
        $(
            impl Numeric for $t {
                const DTYPE: DType = $dtype;
            }
        )+
    }
}

numeric_impl!(i32 => DType::Int32, i64 => DType::Int64, f32 => DType::Float32, f64 => DType::Float64);

/// Converts a primitive into the element type. Floats are truncated towards zero for
/// integer types; values that do not fit are an error.
pub(crate) fn cast<T: Numeric, U: num::ToPrimitive + Copy + fmt::Display>(value: U) -> Result<T> {
    <T as num::NumCast>::from(value).ok_or_else(|| {
        TensorError::InvalidArgument(format!("{value} does not fit in {}", T::DTYPE))
    })
}

#[test]
fn test_dtype_names() {
    assert_eq!(f32::DTYPE.to_string(), "float32");
    assert_eq!(i64::DTYPE.to_string(), "int64");
    assert!(f64::DTYPE.is_floating_point());
    assert!(!i32::DTYPE.is_floating_point());
    assert_eq!(cast::<i32, f64>(2.7).unwrap(), 2);
}

#[test]
fn test_cast_out_of_range() {
    assert!(matches!(
        cast::<i32, usize>(usize::MAX),
        Err(TensorError::InvalidArgument(_))
    ));
    assert!(cast::<i64, f64>(f64::NAN).is_err());
    assert_eq!(cast::<f32, usize>(3).unwrap(), 3.0);
}
