use num::traits::real::Real;

use crate::error::{Result, TensorError};
use crate::optim::{check_learning_rate, Optimizer};
use crate::tensor::{Numeric, TensorList};

/// Stochastic gradient descent with optional momentum and L2 weight decay.
///
/// Per parameter: `g = grad + weight_decay * p`, `v = momentum * v + g`,
/// `p -= lr * v`. Without momentum this is plain `p -= lr * g`.
#[derive(Debug)]
pub struct Sgd<T: Numeric + Real> {
    params: TensorList<T>,
    learning_rate: T,
    momentum: T,
    weight_decay: T,
    velocity: Vec<Option<Vec<T>>>,
}

impl<T: Numeric + Real> Sgd<T> {
    pub fn new(params: TensorList<T>, learning_rate: T) -> Result<Self> {
        let velocity = vec![None; params.len()];
        Ok(Sgd {
            params,
            learning_rate: check_learning_rate(learning_rate)?,
            momentum: T::zero(),
            weight_decay: T::zero(),
            velocity,
        })
    }

    pub fn with_momentum(mut self, momentum: T) -> Result<Self> {
        if momentum < T::zero() || momentum >= T::one() {
            return Err(TensorError::InvalidArgument(format!(
                "momentum must be in [0, 1), got {momentum}"
            )));
        }
        self.momentum = momentum;
        Ok(self)
    }

    pub fn with_weight_decay(mut self, weight_decay: T) -> Result<Self> {
        if weight_decay < T::zero() {
            return Err(TensorError::InvalidArgument(format!(
                "weight decay must be non-negative, got {weight_decay}"
            )));
        }
        self.weight_decay = weight_decay;
        Ok(self)
    }
}

impl<T: Numeric + Real> Optimizer<T> for Sgd<T> {
    fn step(&mut self) -> Result<()> {
        for (param, velocity) in self.params.iter().zip(self.velocity.iter_mut()) {
            let grad = match param.grad() {
                Some(grad) => grad.to_vec(),
                None => continue,
            };
            let (lr, momentum, weight_decay) = (self.learning_rate, self.momentum, self.weight_decay);
            param.update_data(|data| {
                let update: Vec<T> = grad
                    .iter()
                    .zip(data.iter())
                    .map(|(&g, &p)| g + weight_decay * p)
                    .collect();
                let update = if momentum > T::zero() {
                    let v = velocity.get_or_insert_with(|| vec![T::zero(); update.len()]);
                    for (v, &g) in v.iter_mut().zip(update.iter()) {
                        *v = momentum * *v + g;
                    }
                    v.clone()
                } else {
                    update
                };
                for (p, u) in data.iter_mut().zip(update) {
                    *p = *p - lr * u;
                }
            });
        }
        Ok(())
    }

    fn zero_grad(&self) {
        self.params.iter().for_each(|p| p.zero_grad());
    }

    fn learning_rate(&self) -> T {
        self.learning_rate
    }

    fn set_learning_rate(&mut self, learning_rate: T) -> Result<()> {
        self.learning_rate = check_learning_rate(learning_rate)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tensor::RcTensor;

    #[test]
    fn test_plain_step() {
        let p = RcTensor::from([1.0, 2.0]).requires_grad_(true).unwrap();
        let mut sgd = Sgd::new(vec![p.clone()], 0.1).unwrap();
        (&p * &p).sum().backward().unwrap();
        sgd.step().unwrap();
        // grad = 2p, so p -= 0.1 * 2p
        for (v, e) in p.to_vec().iter().zip([0.8, 1.6]) {
            assert!((v - e).abs() < 1e-12);
        }
        assert!(p.is_leaf());
    }

    #[test]
    fn test_momentum_accumulates() {
        let p = RcTensor::scalar(0.0).requires_grad_(true).unwrap();
        let mut sgd = Sgd::new(vec![p.clone()], 1.0)
            .unwrap()
            .with_momentum(0.5)
            .unwrap();
        for _ in 0..2 {
            sgd.zero_grad();
            // constant gradient of 1
            p.sum().backward().unwrap();
            sgd.step().unwrap();
        }
        // v1 = 1, v2 = 0.5 + 1
        assert_eq!(p.item().unwrap(), -2.5);
    }

    #[test]
    fn test_weight_decay() {
        let p = RcTensor::from([2.0]).requires_grad_(true).unwrap();
        let mut sgd = Sgd::new(vec![p.clone()], 0.5)
            .unwrap()
            .with_weight_decay(0.5)
            .unwrap();
        (&p * 0.0f64).sum().backward().unwrap();
        sgd.step().unwrap();
        assert_eq!(p.to_vec(), vec![1.5]);
    }

    #[test]
    fn test_skips_params_without_grad() {
        let p = RcTensor::from([1.0]).requires_grad_(true).unwrap();
        let mut sgd = Sgd::new(vec![p.clone()], 0.1).unwrap();
        sgd.step().unwrap();
        assert_eq!(p.to_vec(), vec![1.0]);
    }

    #[test]
    fn test_invalid_hyperparameters() {
        assert!(Sgd::<f64>::new(vec![], 0.0).is_err());
        assert!(Sgd::<f64>::new(vec![], 0.1).unwrap().with_momentum(1.0).is_err());
        assert!(Sgd::<f64>::new(vec![], 0.1).unwrap().with_weight_decay(-1.0).is_err());
        let mut sgd = Sgd::<f64>::new(vec![], 0.1).unwrap();
        assert!(sgd.set_learning_rate(-0.1).is_err());
        sgd.set_learning_rate(0.2).unwrap();
        assert_eq!(sgd.learning_rate(), 0.2);
    }
}
