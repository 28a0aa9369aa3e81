use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TensorError};

/// Hyper-parameters of the training walkthrough. Every field has a default, so a
/// TOML file only needs the keys it changes:
///
/// ```toml
/// epochs = 200
/// learning_rate = 0.05
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrainConfig {
    pub epochs: usize,
    pub learning_rate: f64,
    pub batch_size: usize,
    pub hidden_size: usize,
    /// Log the loss every this many epochs.
    pub log_every: usize,
    pub seed: u64,
    pub momentum: f64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        TrainConfig {
            epochs: 100,
            learning_rate: 0.01,
            batch_size: 16,
            hidden_size: 16,
            log_every: 10,
            seed: 42,
            momentum: 0.0,
        }
    }
}

impl TrainConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: TrainConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn validate(&self) -> Result<()> {
        if self.epochs == 0 || self.batch_size == 0 || self.hidden_size == 0 || self.log_every == 0
        {
            return Err(TensorError::InvalidArgument(
                "epochs, batch_size, hidden_size and log_every must be positive".into(),
            ));
        }
        if self.learning_rate <= 0.0 {
            return Err(TensorError::InvalidArgument(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        if !(0.0..1.0).contains(&self.momentum) {
            return Err(TensorError::InvalidArgument(format!(
                "momentum must be in [0, 1), got {}",
                self.momentum
            )));
        }
        Ok(())
    }
}
