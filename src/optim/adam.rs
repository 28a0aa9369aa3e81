use num::traits::real::Real;

use crate::error::{Result, TensorError};
use crate::optim::{check_learning_rate, Optimizer};
use crate::tensor::{cast, Numeric, TensorList};

#[derive(Debug, Clone)]
struct Moments<T> {
    first: Vec<T>,
    second: Vec<T>,
}

/// Adam with bias-corrected first and second moment estimates.
#[derive(Debug)]
pub struct Adam<T: Numeric + Real> {
    params: TensorList<T>,
    learning_rate: T,
    beta1: T,
    beta2: T,
    eps: T,
    step_count: i32,
    moments: Vec<Option<Moments<T>>>,
}

impl<T: Numeric + Real> Adam<T> {
    /// Defaults: `betas = (0.9, 0.999)`, `eps = 1e-8`.
    pub fn new(params: TensorList<T>, learning_rate: T) -> Result<Self> {
        let moments = vec![None; params.len()];
        Ok(Adam {
            params,
            learning_rate: check_learning_rate(learning_rate)?,
            beta1: cast(0.9)?,
            beta2: cast(0.999)?,
            eps: cast(1e-8)?,
            step_count: 0,
            moments,
        })
    }

    pub fn with_betas(mut self, beta1: T, beta2: T) -> Result<Self> {
        for beta in [beta1, beta2] {
            if beta < T::zero() || beta >= T::one() {
                return Err(TensorError::InvalidArgument(format!(
                    "Adam betas must be in [0, 1), got {beta}"
                )));
            }
        }
        self.beta1 = beta1;
        self.beta2 = beta2;
        Ok(self)
    }

    pub fn with_eps(mut self, eps: T) -> Result<Self> {
        if eps <= T::zero() {
            return Err(TensorError::InvalidArgument(format!(
                "Adam eps must be positive, got {eps}"
            )));
        }
        self.eps = eps;
        Ok(self)
    }
}

impl<T: Numeric + Real> Optimizer<T> for Adam<T> {
    fn step(&mut self) -> Result<()> {
        self.step_count += 1;
        let (lr, beta1, beta2, eps) = (self.learning_rate, self.beta1, self.beta2, self.eps);
        let correction1 = T::one() - beta1.powi(self.step_count);
        let correction2 = T::one() - beta2.powi(self.step_count);
        for (param, moments) in self.params.iter().zip(self.moments.iter_mut()) {
            let grad = match param.grad() {
                Some(grad) => grad.to_vec(),
                None => continue,
            };
            let moments = moments.get_or_insert_with(|| Moments {
                first: vec![T::zero(); grad.len()],
                second: vec![T::zero(); grad.len()],
            });
            param.update_data(|data| {
                for (i, p) in data.iter_mut().enumerate() {
                    let g = grad[i];
                    moments.first[i] = beta1 * moments.first[i] + (T::one() - beta1) * g;
                    moments.second[i] = beta2 * moments.second[i] + (T::one() - beta2) * g * g;
                    let m_hat = moments.first[i] / correction1;
                    let v_hat = moments.second[i] / correction2;
                    *p = *p - lr * m_hat / (v_hat.sqrt() + eps);
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
