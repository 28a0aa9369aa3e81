use crate::checkpoint::StateDict;
use crate::error::{Result, TensorError};
use crate::tensor::{no_grad, Numeric, RcTensor, TensorList};

/// A building block of a network: parameters plus a forward computation.
///
/// Implementors provide `forward`, `named_parameters` and `describe`; the rest is
/// derived from the parameter list. Containers override `set_training` to reach
/// their children.
pub trait Module<T: Numeric> {
    fn forward(&self, input: &RcTensor<T>) -> Result<RcTensor<T>>;

    /// Parameters with dotted names, e.g. `fc1.weight`.
    fn named_parameters(&self) -> Vec<(String, RcTensor<T>)>;

    /// A one-line summary, e.g. `Linear(in_features=4, out_features=2, bias=true)`.
    fn describe(&self) -> String;

    fn parameters(&self) -> TensorList<T> {
        self.named_parameters()
            .into_iter()
            .map(|(_, param)| param)
            .collect()
    }

    fn zero_grad(&self) {
        self.parameters().iter().for_each(|p| p.zero_grad());
    }

    fn num_parameters(&self) -> usize {
        self.parameters().iter().map(|p| p.numel()).sum()
    }

    fn set_training(&mut self, _training: bool) {}

    /// Modules without a train/eval distinction always report training mode.
    fn is_training(&self) -> bool {
        true
    }

    fn train(&mut self) {
        self.set_training(true);
    }

    fn eval(&mut self) {
        self.set_training(false);
    }

    /// Detached snapshot of every parameter, keyed by its dotted name.
    fn state_dict(&self) -> StateDict<T> {
        self.named_parameters()
            .into_iter()
            .map(|(name, param)| (name, param.detach()))
            .collect()
    }

    /// Copies values from `state_dict` into the existing parameters. Missing,
    /// unexpected and mis-shaped entries are errors, and nothing is written
    /// unless every entry matches.
    fn load_state_dict(&self, state_dict: &StateDict<T>) -> Result<()> {
        let params = self.named_parameters();
        for (name, param) in params.iter() {
            let value = state_dict
                .get(name)
                .ok_or_else(|| TensorError::MissingKey(name.clone()))?;
            if value.shape() != param.shape() {
                return Err(TensorError::ShapeMismatch {
                    expected: param.shape().to_vec(),
                    got: value.shape().to_vec(),
                });
            }
        }
        if let Some(name) = state_dict
            .keys()
            .find(|key| !params.iter().any(|(name, _)| name == *key))
        {
            return Err(TensorError::UnexpectedKey(name.clone()));
        }
        no_grad(|| {
            params
                .iter()
                .try_for_each(|(name, param)| param.copy_from(&state_dict[name]))
        })
    }
}

/// Prefixes child parameter names with `prefix.`.
pub(crate) fn prefixed<T: Numeric>(
    prefix: &str,
    params: Vec<(String, RcTensor<T>)>,
) -> Vec<(String, RcTensor<T>)> {
    params
        .into_iter()
        .map(|(name, param)| (format!("{prefix}.{name}"), param))
        .collect()
}
