use std::cell::RefCell;

use num::traits::real::Real;
use num::ToPrimitive;
use rand::prelude::*;
use rand::rngs::StdRng;
use rand::distributions::{Standard, Uniform};
use rand_distr::{Normal, StandardNormal};

use super::numeric::*;
use super::rc_tensor::RcTensor;
use super::utils::numel;
use crate::error::{Result, TensorError};

const DEFAULT_SEED: u64 = 42;

thread_local! {
    static RNG: RefCell<StdRng> = RefCell::new(StdRng::seed_from_u64(DEFAULT_SEED));
}

/// Reseeds the generator behind `rand`, `randn`, weight init, dropout and shuffling
/// on this thread.
pub fn manual_seed(seed: u64) {
    RNG.with(|rng| *rng.borrow_mut() = StdRng::seed_from_u64(seed));
}

/// Runs `f` with this thread's seeded generator.
pub(crate) fn with_rng<R>(f: impl FnOnce(&mut StdRng) -> R) -> R {
    RNG.with(|rng| f(&mut rng.borrow_mut()))
}

impl<T: Numeric> RcTensor<T> {
    pub fn full(shape: &[usize], value: T) -> RcTensor<T> {
        RcTensor::new_with_filler(shape.to_vec(), value)
    }

    pub fn zeros(shape: &[usize]) -> RcTensor<T> {
        RcTensor::full(shape, T::zero())
    }

    pub fn ones(shape: &[usize]) -> RcTensor<T> {
        RcTensor::full(shape, T::one())
    }

    pub fn zeros_like(other: &RcTensor<T>) -> RcTensor<T> {
        RcTensor::zeros(other.shape())
    }

    pub fn ones_like(other: &RcTensor<T>) -> RcTensor<T> {
        RcTensor::ones(other.shape())
    }

    /// `[start, end)` in increments of `step`. The length is fixed up front as
    /// `ceil((end - start) / step)` so float steps do not overshoot `end`.
    pub fn arange(start: T, end: T, step: T) -> Result<RcTensor<T>> {
        if step == T::zero() {
            return Err(TensorError::InvalidArgument("arange step must be non-zero".into()));
        }
        let span = (end - start).to_f64().zip(step.to_f64()).ok_or_else(|| {
            TensorError::InvalidArgument(format!("arange({start}, {end}, {step}) is out of range"))
        })?;
        let len = (span.0 / span.1).ceil().max(0.0) as usize;
        let array = (0..len)
            .map(|i| Ok(start + cast::<T, _>(i)? * step))
            .collect::<Result<Vec<T>>>()?;
        RcTensor::from_vec(array, vec![len])
    }

    /// Identity matrix of size `n x n`.
    pub fn eye(n: usize) -> RcTensor<T> {
        let tensor = RcTensor::zeros(&[n, n]);
        tensor.update_data(|data| {
            for i in 0..n {
                data[i * n + i] = T::one();
            }
        });
        tensor
    }
}

impl<T: Numeric + Real> RcTensor<T> {
    /// `steps` evenly spaced values from `start` to `end`, both included.
    pub fn linspace(start: T, end: T, steps: usize) -> Result<RcTensor<T>> {
        let array = match steps {
            0 => vec![],
            1 => vec![start],
            _ => {
                let step = (end - start) / cast::<T, _>(steps - 1)?;
                (0..steps)
                    .map(|i| Ok(start + step * cast::<T, _>(i)?))
                    .collect::<Result<Vec<T>>>()?
            }
        };
        RcTensor::from_vec(array, vec![steps])
    }

    /// Samples from `U(low, high)`.
    pub fn uniform(shape: &[usize], low: f64, high: f64) -> Result<RcTensor<T>> {
        if low >= high {
            return Err(TensorError::InvalidArgument(format!(
                "uniform range is empty: [{low}, {high})"
            )));
        }
        let distribution = Uniform::new(low, high);
        let array = with_rng(|rng| {
            (0..numel(shape))
                .map(|_| cast(distribution.sample(rng)))
                .collect::<Result<Vec<T>>>()
        })?;
        RcTensor::from_vec(array, shape.to_vec())
    }

    /// Samples from `U(0, 1)`.
    pub fn rand(shape: &[usize]) -> RcTensor<T>
    where
        Standard: Distribution<T>,
    {
        let array: Vec<T> = with_rng(|rng| (0..numel(shape)).map(|_| rng.gen()).collect());
        RcTensor::new(array, shape.to_vec())
    }

    /// Samples from `N(mean, std)`.
    pub fn normal(shape: &[usize], mean: f64, std: f64) -> Result<RcTensor<T>> {
        let distribution = Normal::new(mean, std)
            .map_err(|e| TensorError::InvalidArgument(format!("normal distribution: {e}")))?;
        let array = with_rng(|rng| {
            (0..numel(shape))
                .map(|_| cast(distribution.sample(rng)))
                .collect::<Result<Vec<T>>>()
        })?;
        RcTensor::from_vec(array, shape.to_vec())
    }

    /// Samples from the standard normal distribution.
    pub fn randn(shape: &[usize]) -> RcTensor<T>
    where
        StandardNormal: Distribution<T>,
    {
        let array: Vec<T> = with_rng(|rng| {
            (0..numel(shape))
                .map(|_| rng.sample(StandardNormal))
                .collect()
        });
        RcTensor::new(array, shape.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zeros_ones_full() {
        assert_eq!(RcTensor::<f64>::zeros(&[2, 3]).to_vec(), vec![0.0; 6]);
        assert_eq!(RcTensor::<i64>::ones(&[2]).to_vec(), vec![1, 1]);
        let filled = RcTensor::full(&[2, 2], 7);
        assert_eq!(filled.shape(), &[2, 2]);
        assert_eq!(RcTensor::ones_like(&filled).to_vec(), vec![1; 4]);
    }

    #[test]
    fn test_arange() {
        assert_eq!(RcTensor::arange(0, 5, 1).unwrap().to_vec(), vec![0, 1, 2, 3, 4]);
        assert_eq!(RcTensor::arange(3, 0, -1).unwrap().to_vec(), vec![3, 2, 1]);
        assert_eq!(RcTensor::arange(0.0, 1.0, 0.25).unwrap().shape(), &[4]);
        assert_eq!(RcTensor::arange(0, 5, 2).unwrap().to_vec(), vec![0, 2, 4]);
        assert_eq!(RcTensor::arange(5, 0, 1).unwrap().numel(), 0);
        assert!(RcTensor::arange(0, 3, 0).is_err());
    }

    #[test]
    fn test_arange_float_step_stays_below_end() {
        let values = RcTensor::<f64>::arange(0.0, 1.0, 0.1).unwrap().to_vec();
        assert_eq!(values.len(), 10);
        assert!((values[9] - 0.9).abs() < 1e-12);
        assert_eq!(RcTensor::<f32>::arange(1.0, 0.0, -0.1).unwrap().numel(), 10);
        assert_eq!(RcTensor::<f64>::arange(0.0, 1.05, 0.5).unwrap().to_vec(), vec![0.0, 0.5, 1.0]);
    }

    #[test]
    fn test_linspace() {
        let points = RcTensor::linspace(0.0, 1.0, 5).unwrap();
        assert_eq!(points.to_vec(), vec![0.0, 0.25, 0.5, 0.75, 1.0]);
        assert_eq!(RcTensor::<f64>::linspace(2.0, 3.0, 1).unwrap().to_vec(), vec![2.0]);
    }

    #[test]
    fn test_eye() {
        assert_eq!(
            RcTensor::<i32>::eye(3),
            RcTensor::from([[1, 0, 0], [0, 1, 0], [0, 0, 1]])
        );
    }

    #[test]
    fn test_seeded_sampling_is_reproducible() {
        manual_seed(7);
        let first = RcTensor::<f64>::randn(&[4, 4]);
        manual_seed(7);
        let second = RcTensor::<f64>::randn(&[4, 4]);
        assert_eq!(first, second);
    }

    #[test]
    fn test_rand_in_unit_interval() {
        let samples = RcTensor::<f32>::rand(&[100]);
        assert!(samples.to_vec().iter().all(|&v| (0.0..=1.0).contains(&v)));
    }

    #[test]
    fn test_uniform_bounds() {
        let samples = RcTensor::<f64>::uniform(&[50], -0.5, 0.5).unwrap();
        assert!(samples.to_vec().iter().all(|&v| (-0.5..0.5).contains(&v)));
        assert!(RcTensor::<f64>::uniform(&[1], 1.0, 1.0).is_err());
        assert!(RcTensor::<f64>::normal(&[1], 0.0, -1.0).is_err());
    }
}
