use num::traits::real::Real;

use crate::error::{Result, TensorError};
use crate::nn::module::prefixed;
use crate::nn::{Linear, Module};
use crate::tensor::{functional, Numeric, RcTensor};

/// Two linear layers with a ReLU in between: `fc2(relu(fc1(x)))`.
#[derive(Debug)]
pub struct TwoLayerNet<T: Numeric> {
    pub fc1: Linear<T>,
    pub fc2: Linear<T>,
}

impl<T: Numeric + Real> TwoLayerNet<T> {
    pub fn new(input_size: usize, hidden_size: usize, output_size: usize) -> Result<Self> {
        Ok(TwoLayerNet {
            fc1: Linear::new(input_size, hidden_size)?,
            fc2: Linear::new(hidden_size, output_size)?,
        })
    }
}

impl<T: Numeric + Real> Module<T> for TwoLayerNet<T> {
    fn forward(&self, input: &RcTensor<T>) -> Result<RcTensor<T>> {
        let hidden = functional::relu(&self.fc1.forward(input)?)?;
        self.fc2.forward(&hidden)
    }

    fn named_parameters(&self) -> Vec<(String, RcTensor<T>)> {
        let mut params = prefixed("fc1", self.fc1.named_parameters());
        params.extend(prefixed("fc2", self.fc2.named_parameters()));
        params
    }

    fn describe(&self) -> String {
        format!(
            "TwoLayerNet(\n  (fc1): {}\n  (relu): ReLU()\n  (fc2): {}\n)",
            self.fc1.describe(),
            self.fc2.describe()
        )
    }
}

/// A stack of linear layers with ReLU between them; the last layer has no activation.
#[derive(Debug)]
pub struct Mlp<T>
where
    T: Numeric,
{
    layers: Vec<Linear<T>>,
}

impl<T: Numeric + Real> Mlp<T> {
    /// `sizes` lists the width of every layer including input and output,
    /// e.g. `[2, 32, 32, 1]`.
    pub fn new(sizes: &[usize]) -> Result<Mlp<T>> {
        if sizes.len() < 2 {
            return Err(TensorError::InvalidArgument(format!(
                "Mlp needs at least an input and an output size, got {sizes:?}"
            )));
        }
        let layers = sizes
            .windows(2)
            .map(|pair| Linear::new(pair[0], pair[1]))
            .collect::<Result<Vec<_>>>()?;
        Ok(Mlp { layers })
    }

    pub fn from_layers(layers: Vec<Linear<T>>) -> Mlp<T> {
        Mlp { layers }
    }

    pub fn layers(&self) -> &[Linear<T>] {
        &self.layers
    }
}

impl<T: Numeric + Real> Module<T> for Mlp<T> {
    fn forward(&self, input: &RcTensor<T>) -> Result<RcTensor<T>> {
        let last = self.layers.len().saturating_sub(1);
        self.layers
            .iter()
            .enumerate()
            .try_fold(input.clone(), |prev, (i, layer)| {
                let out = layer.forward(&prev)?;
                if i < last {
                    functional::relu(&out)
                } else {
                    Ok(out)
                }
            })
    }

    fn named_parameters(&self) -> Vec<(String, RcTensor<T>)> {
        self.layers
            .iter()
            .enumerate()
            .flat_map(|(i, layer)| prefixed(&format!("layers.{i}"), layer.named_parameters()))
            .collect()
    }

    fn describe(&self) -> String {
        let layers: Vec<String> = self.layers.iter().map(|l| l.describe()).collect();
        format!("Mlp({})", layers.join(" -> ReLU -> "))
    }
}
