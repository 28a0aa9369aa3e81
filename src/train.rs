//! The training loop: forward, loss, zero grad, backward, step.

use num::traits::real::Real;
use num::ToPrimitive;
use tracing::{debug, info};

use crate::config::TrainConfig;
use crate::data::{DataLoader, Dataset};
use crate::error::{Result, TensorError};
use crate::nn::{Loss, Module};
use crate::optim::Optimizer;
use crate::tensor::{cast, no_grad, Numeric, RcTensor};

/// Mean loss of every epoch, in order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrainHistory<T> {
    pub epoch_losses: Vec<T>,
}

impl<T: Numeric> TrainHistory<T> {
    pub fn final_loss(&self) -> Option<T> {
        self.epoch_losses.last().copied()
    }
}

/// One optimisation step on a single batch; returns the loss before the update.
pub fn train_step<T, M, O, L>(
    model: &M,
    optimizer: &mut O,
    loss_fn: &L,
    inputs: &RcTensor<T>,
    targets: &RcTensor<T>,
) -> Result<T>
where
    T: Numeric,
    M: Module<T> + ?Sized,
    O: Optimizer<T> + ?Sized,
    L: Loss<T> + ?Sized,
{
    let prediction = model.forward(inputs)?;
    let loss = loss_fn.loss(&prediction, targets)?;
    optimizer.zero_grad();
    loss.backward()?;
    optimizer.step()?;
    loss.item()
}

/// Trains for `config.epochs` passes over `loader`, logging the mean epoch loss
/// every `config.log_every` epochs.
pub fn fit<T, M, O, L, D>(
    model: &mut M,
    optimizer: &mut O,
    loss_fn: &L,
    loader: &DataLoader<T, D>,
    config: &TrainConfig,
) -> Result<TrainHistory<T>>
where
    T: Numeric + Real,
    M: Module<T> + ?Sized,
    O: Optimizer<T> + ?Sized,
    L: Loss<T> + ?Sized,
    D: Dataset<T>,
{
    if loader.is_empty() {
        return Err(TensorError::InvalidArgument(
            "cannot train on an empty data loader".into(),
        ));
    }
    model.train();
    info!(
        epochs = config.epochs,
        batches = loader.len(),
        loss = loss_fn.name(),
        "starting training"
    );
    let mut history = TrainHistory {
        epoch_losses: Vec::with_capacity(config.epochs),
    };
    for epoch in 1..=config.epochs {
        let mut total = T::zero();
        let mut batches = 0usize;
        for batch in loader.iter() {
            let (inputs, targets) = batch?;
            total += train_step(model, optimizer, loss_fn, &inputs, &targets)?;
            batches += 1;
        }
        let epoch_loss = total / cast::<T, _>(batches)?;
        debug!(epoch, loss = %epoch_loss, "epoch finished");
        if epoch % config.log_every.max(1) == 0 || epoch == config.epochs {
            info!(epoch, loss = %epoch_loss, "training");
        }
        history.epoch_losses.push(epoch_loss);
    }
    Ok(history)
}

/// Mean batch loss in eval mode, without recording a graph. The model's previous
/// train/eval mode is restored afterwards.
pub fn evaluate<T, M, L, D>(model: &mut M, loss_fn: &L, loader: &DataLoader<T, D>) -> Result<T>
where
    T: Numeric + Real,
    M: Module<T> + ?Sized,
    L: Loss<T> + ?Sized,
    D: Dataset<T>,
{
    let was_training = model.is_training();
    model.eval();
    let result = no_grad(|| {
        let mut total = T::zero();
        let mut batches = 0usize;
        for batch in loader.iter() {
            let (inputs, targets) = batch?;
            total += loss_fn.loss(&model.forward(&inputs)?, &targets)?.item()?;
            batches += 1;
        }
        if batches == 0 {
            return Err(TensorError::InvalidArgument(
                "cannot evaluate on an empty data loader".into(),
            ));
        }
        Ok(total / cast::<T, _>(batches)?)
    });
    model.set_training(was_training);
    result
}

/// Fraction of rows of `logits` whose argmax equals the class index in `targets`.
pub fn accuracy<T: Numeric>(logits: &RcTensor<T>, targets: &RcTensor<T>) -> Result<f64> {
    if logits.dim() != 2 || targets.shape() != [logits.shape()[0]] {
        return Err(TensorError::InvalidArgument(format!(
            "accuracy expects logits (N, C) and targets (N), got {:?} and {:?}",
            logits.shape(),
            targets.shape()
        )));
    }
    let predicted = logits.argmax(1)?.to_vec();
    if predicted.is_empty() {
        return Ok(0.0);
    }
    let correct = predicted
        .iter()
        .zip(targets.to_vec())
        .filter(|&(&p, t)| t.to_i64() == Some(p))
        .count();
    Ok(correct as f64 / predicted.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::TensorDataset;
    use crate::nn::{Dropout, Linear, MseLoss, Sequential};
    use crate::optim::Sgd;
    use crate::tensor::manual_seed;

    fn line_loader() -> DataLoader<f64, TensorDataset<f64>> {
        let xs: Vec<f64> = (0..20).map(|i| i as f64 / 10.0 - 1.0).collect();
        let ys: Vec<f64> = xs.iter().map(|x| 3.0 * x + 2.0).collect();
        let dataset = TensorDataset::new(
            RcTensor::new(xs, vec![20, 1]),
            RcTensor::new(ys, vec![20, 1]),
        )
        .unwrap();
        DataLoader::new(dataset, 5).unwrap()
    }

    #[test]
    fn test_fit_linear_regression() {
        manual_seed(1);
        let mut model = Linear::<f64>::new(1, 1).unwrap();
        let mut optimizer = Sgd::new(model.parameters(), 0.1).unwrap();
        let config = TrainConfig {
            epochs: 100,
            log_every: 25,
            ..TrainConfig::default()
        };
        let loader = line_loader();
        let history = fit(&mut model, &mut optimizer, &MseLoss::new(), &loader, &config).unwrap();
        assert_eq!(history.epoch_losses.len(), 100);
        assert!(history.final_loss().unwrap() < 1e-3);
        assert!((model.weight.item().unwrap() - 3.0).abs() < 0.05);

        let eval_loss = evaluate(&mut model, &MseLoss::new(), &loader).unwrap();
        assert!(eval_loss < 1e-3);
        assert!(model.weight.grad().is_some());
    }

    #[test]
    fn test_train_step_reduces_loss() {
        manual_seed(2);
        let model = Linear::<f64>::new(1, 1).unwrap();
        let mut optimizer = Sgd::new(model.parameters(), 0.1).unwrap();
        let x = RcTensor::from([[1.0], [2.0]]);
        let y = RcTensor::from([[5.0], [8.0]]);
        let first = train_step(&model, &mut optimizer, &MseLoss::new(), &x, &y).unwrap();
        let second = train_step(&model, &mut optimizer, &MseLoss::new(), &x, &y).unwrap();
        assert!(second < first);
    }

    #[test]
    fn test_evaluate_restores_previous_mode() {
        manual_seed(4);
        let mut model = Sequential::<f64>::new()
            .add(Linear::new(1, 1).unwrap())
            .add(Dropout::new(0.5).unwrap());
        let loader = line_loader();

        model.eval();
        evaluate(&mut model, &MseLoss::new(), &loader).unwrap();
        assert!(!model.is_training());

        model.train();
        evaluate(&mut model, &MseLoss::new(), &loader).unwrap();
        assert!(model.is_training());
    }

    #[test]
    fn test_accuracy() {
        let logits = RcTensor::from([[0.9, 0.1], [0.2, 0.8], [0.6, 0.4], [0.3, 0.7]]);
        let targets = RcTensor::from([0.0, 1.0, 1.0, 1.0]);
        assert_eq!(accuracy(&logits, &targets).unwrap(), 0.75);
        assert!(accuracy(&logits, &RcTensor::from([0.0])).is_err());
    }
}
