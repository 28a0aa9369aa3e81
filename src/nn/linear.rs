use num::traits::real::Real;

use crate::error::{Result, TensorError};
use crate::nn::Module;
use crate::tensor::{functional, Numeric, RcTensor};

/// `y = x W^T + b`, with `W` of shape `(out_features, in_features)`.
#[derive(Debug)]
pub struct Linear<T>
where
    T: Numeric,
{
    pub weight: RcTensor<T>,
    pub bias: Option<RcTensor<T>>,
}

impl<T> Linear<T>
where
    T: Numeric + Real,
{
    /// Weight and bias drawn from `U(-1/sqrt(in), 1/sqrt(in))`.
    pub fn new(in_features: usize, out_features: usize) -> Result<Self> {
        Self::with_bias(in_features, out_features, true)
    }

    pub fn with_bias(in_features: usize, out_features: usize, bias: bool) -> Result<Self> {
        if in_features == 0 || out_features == 0 {
            return Err(TensorError::InvalidArgument(format!(
                "Linear needs non-zero sizes, got in={in_features} out={out_features}"
            )));
        }
        let bound = 1.0 / (in_features as f64).sqrt();
        let weight = RcTensor::uniform(&[out_features, in_features], -bound, bound)?
            .requires_grad_(true)?;
        let bias = match bias {
            true => Some(RcTensor::uniform(&[out_features], -bound, bound)?.requires_grad_(true)?),
            false => None,
        };
        Ok(Linear { weight, bias })
    }

    /// Wraps existing tensors, e.g. to start from known values.
    pub fn from_tensors(weight: RcTensor<T>, bias: Option<RcTensor<T>>) -> Result<Self> {
        if weight.dim() != 2 {
            return Err(TensorError::InvalidArgument(format!(
                "Linear weight must be 2-d, got shape {:?}",
                weight.shape()
            )));
        }
        if let Some(bias) = bias.as_ref() {
            if bias.shape() != [weight.shape()[0]] {
                return Err(TensorError::ShapeMismatch {
                    expected: vec![weight.shape()[0]],
                    got: bias.shape().to_vec(),
                });
            }
        }
        let weight = weight.requires_grad_(true)?;
        let bias = bias.map(|b| b.requires_grad_(true)).transpose()?;
        Ok(Linear { weight, bias })
    }

    pub fn in_features(&self) -> usize {
        self.weight.shape()[1]
    }

    pub fn out_features(&self) -> usize {
        self.weight.shape()[0]
    }
}

impl<T: Numeric + Real> Module<T> for Linear<T> {
    fn forward(&self, input: &RcTensor<T>) -> Result<RcTensor<T>> {
        let y = input.matmul(&self.weight.t()?)?;
        match self.bias.as_ref() {
            Some(bias) => functional::add(&y, bias),
            None => Ok(y),
        }
    }

    fn named_parameters(&self) -> Vec<(String, RcTensor<T>)> {
        let mut params = vec![("weight".to_string(), self.weight.clone())];
        if let Some(bias) = self.bias.as_ref() {
            params.push(("bias".to_string(), bias.clone()));
        }
        params
    }

    fn describe(&self) -> String {
        format!(
            "Linear(in_features={}, out_features={}, bias={})",
            self.in_features(),
            self.out_features(),
            self.bias.is_some()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layer_forward() {
        let layer = Linear::from_tensors(
            RcTensor::new_with_filler(vec![2, 2], 1.0),
            Some(RcTensor::new_with_filler(vec![2], 1.0)),
        )
        .unwrap();
        let input = RcTensor::new(vec![1.0, 2.0], vec![1, 2]);
        let res = layer.forward(&input).unwrap();
        assert_eq!(res, RcTensor::new(vec![4.0, 4.0], vec![1, 2]));
    }

    #[test]
    fn test_layer_gradients() {
        let layer = Linear::from_tensors(
            RcTensor::from([[1.0, -2.0], [-1.1, 0.7]]),
            Some(RcTensor::new_with_filler(vec![2], 1.0)),
        )
        .unwrap();
        let input = RcTensor::from([[1.0, 2.0], [3.0, -1.0]]);
        layer.forward(&input).unwrap().sum().backward().unwrap();
        // d sum(x W^T + b) / dW[o][i] = sum over the batch of x[n][i]
        assert_eq!(
            layer.weight.grad().unwrap(),
            RcTensor::from([[4.0, 1.0], [4.0, 1.0]])
        );
        assert_eq!(layer.bias.as_ref().unwrap().grad().unwrap(), RcTensor::from([2.0, 2.0]));
    }

    #[test]
    fn test_layer_unbatched_input() {
        let layer = Linear::from_tensors(RcTensor::from([[1.0, 2.0, 3.0]]), None).unwrap();
        let res = layer.forward(&RcTensor::from([1.0, 1.0, 1.0])).unwrap();
        assert_eq!(res, RcTensor::from([6.0]));
    }

    #[test]
    fn test_init_bounds_and_shapes() {
        let layer = Linear::<f32>::new(16, 3).unwrap();
        assert_eq!(layer.weight.shape(), &[3, 16]);
        assert_eq!(layer.bias.as_ref().unwrap().shape(), &[3]);
        assert!(layer.weight.to_vec().iter().all(|w| w.abs() <= 0.25));
        assert!(layer.weight.requires_grad());
        assert_eq!(layer.num_parameters(), 3 * 16 + 3);
        assert!(Linear::<f32>::new(0, 3).is_err());
    }

    #[test]
    fn test_mismatched_bias_is_an_error() {
        let mut layer = Linear::<f64>::new(3, 2).unwrap();
        layer.bias = Some(RcTensor::zeros(&[3]));
        assert!(matches!(
            layer.forward(&RcTensor::ones(&[1, 3])),
            Err(TensorError::Broadcast { .. })
        ));
    }

    #[test]
    fn test_wrong_input_width() {
        let layer = Linear::<f64>::new(3, 2).unwrap();
        assert!(matches!(
            layer.forward(&RcTensor::zeros(&[4, 5])),
            Err(TensorError::MatmulShape { .. })
        ));
    }
}
