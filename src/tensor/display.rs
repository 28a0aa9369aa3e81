use std::fmt;

use super::numeric::*;
use super::rc_tensor::RcTensor;

const INDENT: &str = "tensor(";

fn format_element<T: Numeric>(value: T) -> String {
    if T::DTYPE.is_floating_point() {
        format!("{value:.4}")
    } else {
        format!("{value}")
    }
}

/// Writes the nested bracket representation of `data` laid out as `shape`.
fn write_nested<T: Numeric>(
    out: &mut String,
    data: &[T],
    shape: &[usize],
    depth: usize,
) {
    match shape {
        [] => out.push_str(&format_element(data[0])),
        [_] => {
            out.push('[');
            let items: Vec<String> = data.iter().map(|&v| format_element(v)).collect();
            out.push_str(&items.join(", "));
            out.push(']');
        }
        [rows, rest @ ..] => {
            let stride: usize = rest.iter().product();
            let separator = format!(
                ",{}{}",
                "\n".repeat(rest.len()),
                " ".repeat(INDENT.len() + depth + 1)
            );
            out.push('[');
            for row in 0..*rows {
                if row > 0 {
                    out.push_str(&separator);
                }
                write_nested(out, &data[row * stride..(row + 1) * stride], rest, depth + 1);
            }
            out.push(']');
        }
    }
}

impl<T: Numeric> fmt::Display for RcTensor<T> {
    /// ```
    /// # use light_primer::tensor::*;
    /// let x = RcTensor::<f64>::from([[1.0, 2.0], [3.0, 4.0]]).requires_grad_(true).unwrap();
    /// assert_eq!(
    ///     x.to_string(),
    ///     "tensor([[1.0000, 2.0000],\n        [3.0000, 4.0000]], requires_grad=True)"
    /// );
    /// assert_eq!((&x + 1.0).sum().to_string(), "tensor(14.0000, grad_fn=<SumBackward>)");
    /// ```
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut body = String::new();
        write_nested(&mut body, &self.data(), self.shape(), 0);
        write!(f, "{INDENT}{body}")?;
        if let Some(name) = self.grad_fn_name() {
            write!(f, ", grad_fn=<{name}>")?;
        } else if self.requires_grad() {
            write!(f, ", requires_grad=True")?;
        }
        if !T::DTYPE.is_floating_point() && T::DTYPE != DType::Int64 {
            write!(f, ", dtype={}", T::DTYPE)?;
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use crate::tensor::RcTensor;

    #[test]
    fn test_display_vector_and_scalar() {
        assert_eq!(
            RcTensor::from([1.5, -2.0]).to_string(),
            "tensor([1.5000, -2.0000])"
        );
        assert_eq!(RcTensor::scalar(3.0).to_string(), "tensor(3.0000)");
        assert_eq!(RcTensor::from([1i64, 2]).to_string(), "tensor([1, 2])");
        assert_eq!(
            RcTensor::from([1i32, 2]).to_string(),
            "tensor([1, 2], dtype=int32)"
        );
    }

    #[test]
    fn test_display_3d() {
        let tensor = RcTensor::<i64>::new((0..8).collect(), vec![2, 2, 2]);
        assert_eq!(
            tensor.to_string(),
            "tensor([[[0, 1],\n         [2, 3]],\n\n        [[4, 5],\n         [6, 7]]])"
        );
    }

    #[test]
    fn test_display_empty() {
        assert_eq!(RcTensor::<f64>::zeros(&[0]).to_string(), "tensor([])");
    }
}
