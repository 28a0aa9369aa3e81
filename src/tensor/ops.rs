//! Operator overloads. Operators cannot return `Result`, so a failed operation
//! (usually incompatible shapes) panics with the error message. The `functional`
//! module has the fallible versions.

use std::ops::{Add, Div, Mul, Neg, Sub};

use super::functional;
use super::numeric::Numeric;
use super::rc_tensor::RcTensor;

macro_rules! tensor_binary_op {
    ($trait:ident, $method:ident, $func:path) => {
        impl<T: Numeric> $trait<&RcTensor<T>> for &RcTensor<T> {
            type Output = RcTensor<T>;

            fn $method(self, right: &RcTensor<T>) -> RcTensor<T> {
                match $func(self, right) {
                    Ok(tensor) => tensor,
                    Err(e) => panic!("{}", e),
                }
            }
        }

        impl<T: Numeric> $trait<RcTensor<T>> for RcTensor<T> {
            type Output = RcTensor<T>;

            fn $method(self, right: RcTensor<T>) -> RcTensor<T> {
                (&self).$method(&right)
            }
        }

        impl<T: Numeric> $trait<&RcTensor<T>> for RcTensor<T> {
            type Output = RcTensor<T>;

            fn $method(self, right: &RcTensor<T>) -> RcTensor<T> {
                (&self).$method(right)
            }
        }

        impl<T: Numeric> $trait<RcTensor<T>> for &RcTensor<T> {
            type Output = RcTensor<T>;

            fn $method(self, right: RcTensor<T>) -> RcTensor<T> {
                self.$method(&right)
            }
        }
    };
}

tensor_binary_op!(Add, add, functional::add);
tensor_binary_op!(Sub, sub, functional::sub);
tensor_binary_op!(Mul, mul, functional::mul);
tensor_binary_op!(Div, div, functional::div);

/// Tensor-scalar arithmetic, with the scalar on either side.
macro_rules! scalar_binary_op {
    ($t:ty, $trait:ident, $method:ident) => {
        impl $trait<$t> for &RcTensor<$t> {
            type Output = RcTensor<$t>;

            fn $method(self, right: $t) -> RcTensor<$t> {
                self.$method(&RcTensor::scalar(right))
            }
        }

        impl $trait<$t> for RcTensor<$t> {
            type Output = RcTensor<$t>;

            fn $method(self, right: $t) -> RcTensor<$t> {
                (&self).$method(&RcTensor::scalar(right))
            }
        }

        impl $trait<&RcTensor<$t>> for $t {
            type Output = RcTensor<$t>;

            fn $method(self, right: &RcTensor<$t>) -> RcTensor<$t> {
                (&RcTensor::scalar(self)).$method(right)
            }
        }

        impl $trait<RcTensor<$t>> for $t {
            type Output = RcTensor<$t>;

            fn $method(self, right: RcTensor<$t>) -> RcTensor<$t> {
                (&RcTensor::scalar(self)).$method(&right)
            }
        }
    };
}

macro_rules! scalar_ops {
    ($($t:ty),*) => {
        $(
            scalar_binary_op!($t, Add, add);
            scalar_binary_op!($t, Sub, sub);
            scalar_binary_op!($t, Mul, mul);
            scalar_binary_op!($t, Div, div);
        )*
    };
}

scalar_ops!(i32, i64, f32, f64);

impl<T: Numeric> Neg for &RcTensor<T> {
    type Output = RcTensor<T>;

    fn neg(self) -> RcTensor<T> {
        match functional::neg(self) {
            Ok(tensor) => tensor,
            Err(e) => panic!("{}", e),
        }
    }
}

impl<T: Numeric> Neg for RcTensor<T> {
    type Output = RcTensor<T>;

    fn neg(self) -> RcTensor<T> {
        -&self
    }
}

#[cfg(test)]
mod tests {
    use crate::tensor::RcTensor;

    #[test]
    fn test_element_wise_multiplication() {
        let left = RcTensor::from([1, 2, 3]);
        let right = RcTensor::from([7, 2, 8]);
        assert_eq!(&left * &right, RcTensor::from([7, 4, 24]));
    }

    #[test]
    fn test_owned_and_borrowed_operands() {
        let a = RcTensor::from([1.0, 2.0]);
        let b = RcTensor::from([3.0, 5.0]);
        assert_eq!(a.clone() + b.clone(), RcTensor::from([4.0, 7.0]));
        assert_eq!(&a - b.clone(), RcTensor::from([-2.0, -3.0]));
        assert_eq!(b.clone() / &a, RcTensor::from([3.0, 2.5]));
        assert_eq!(-a, RcTensor::from([-1.0, -2.0]));
    }

    #[test]
    fn test_scalar_operands() {
        let x = RcTensor::from([2.0, 4.0]);
        assert_eq!(&x * 3.0, RcTensor::from([6.0, 12.0]));
        assert_eq!(1.0 - &x, RcTensor::from([-1.0, -3.0]));
        assert_eq!(8.0 / x.clone(), RcTensor::from([4.0, 2.0]));
        assert_eq!(RcTensor::from([1i64, 2]) + 10, RcTensor::from([11i64, 12]));
    }

    #[test]
    #[should_panic(expected = "broadcast")]
    fn test_incompatible_shapes_panic() {
        let _ = &RcTensor::from([1.0, 2.0]) + &RcTensor::from([1.0, 2.0, 3.0]);
    }
}
