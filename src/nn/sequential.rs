use crate::error::Result;
use crate::nn::module::prefixed;
use crate::nn::Module;
use crate::tensor::{Numeric, RcTensor};

/// Runs its children in order. Children are named by their position, so the
/// first layer's weight is `0.weight`.
pub struct Sequential<T: Numeric> {
    layers: Vec<Box<dyn Module<T>>>,
    training: bool,
}

impl<T: Numeric> Sequential<T> {
    pub fn new() -> Self {
        Sequential {
            layers: Vec::new(),
            training: true,
        }
    }

    /// Appends a layer, builder style.
    #[allow(clippy::should_implement_trait)]
    pub fn add(mut self, layer: impl Module<T> + 'static) -> Self {
        self.layers.push(Box::new(layer));
        self
    }

    pub fn push(&mut self, layer: Box<dyn Module<T>>) {
        self.layers.push(layer);
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

impl<T: Numeric> Default for Sequential<T> {
    fn default() -> Self {
        Sequential::new()
    }
}

impl<T: Numeric> Module<T> for Sequential<T> {
    fn forward(&self, input: &RcTensor<T>) -> Result<RcTensor<T>> {
        self.layers
            .iter()
            .try_fold(input.clone(), |prev, layer| layer.forward(&prev))
    }

    fn named_parameters(&self) -> Vec<(String, RcTensor<T>)> {
        self.layers
            .iter()
            .enumerate()
            .flat_map(|(i, layer)| prefixed(&i.to_string(), layer.named_parameters()))
            .collect()
    }

    fn is_training(&self) -> bool {
        self.training
    }

    fn set_training(&mut self, training: bool) {
        self.training = training;
        self.layers
            .iter_mut()
            .for_each(|layer| layer.set_training(training));
    }

    fn describe(&self) -> String {
        let children: Vec<String> = self
            .layers
            .iter()
            .enumerate()
            .map(|(i, layer)| format!("  ({i}): {}", layer.describe()))
            .collect();
        format!("Sequential(\n{}\n)", children.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nn::{Dropout, Linear, ReLU};

    #[test]
    fn test_sequential_names_and_forward() {
        let model = Sequential::new()
            .add(Linear::<f64>::new(3, 4).unwrap())
            .add(ReLU)
            .add(Linear::<f64>::new(4, 2).unwrap());
        let names: Vec<String> = model.named_parameters().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["0.weight", "0.bias", "2.weight", "2.bias"]);
        assert_eq!(model.len(), 3);
        let out = model.forward(&RcTensor::ones(&[5, 3])).unwrap();
        assert_eq!(out.shape(), &[5, 2]);
    }

    #[test]
    fn test_sequential_eval_reaches_children() {
        let mut model = Sequential::<f64>::new().add(Dropout::new(0.9).unwrap());
        model.eval();
        let input = RcTensor::ones(&[50]);
        assert_eq!(model.forward(&input).unwrap(), input);
        assert!(model.describe().contains("(0): Dropout(p=0.9)"));
    }
}
