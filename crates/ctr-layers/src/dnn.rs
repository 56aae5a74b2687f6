//! Deep feedforward network (DNN).
//!
//! This module provides the [`DNN`] struct, a stack of dense layers each
//! followed by optional batch normalization, an activation and dropout.

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::activation_layer::{ActivationLayer, ActivationType};
use crate::dense::Dense;
use crate::dropout::Dropout;
use crate::error::LayerError;
use crate::initializer::Initializer;
use crate::layer::Layer;
use crate::normalization::BatchNorm;
use crate::tensor::Tensor;

/// Configuration for building a DNN.
///
/// # Example
///
/// ```
/// use ctr_layers::dnn::DNNConfig;
/// use ctr_layers::activation_layer::ActivationType;
///
/// let config = DNNConfig::new(128, vec![64, 32])
///     .with_activation(ActivationType::ReLU)
///     .with_dropout(0.2);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DNNConfig {
    /// Input dimension
    pub input_dim: usize,
    /// Output width of each hidden layer
    pub hidden_units: Vec<usize>,
    /// Activation applied after every hidden layer
    pub activation: ActivationType,
    /// Dropout rate (0.0 to disable)
    pub dropout_rate: f32,
    /// Whether to batch-normalize each layer's pre-activation
    pub use_bn: bool,
    /// Standard deviation of the normal kernel initializer
    pub init_std: f32,
    /// Seed for the dropout mask
    pub seed: u64,
}

impl DNNConfig {
    /// Creates a new DNN configuration.
    pub fn new(input_dim: usize, hidden_units: Vec<usize>) -> Self {
        Self {
            input_dim,
            hidden_units,
            activation: ActivationType::ReLU,
            dropout_rate: 0.0,
            use_bn: false,
            init_std: 1e-4,
            seed: 1024,
        }
    }

    /// Sets the hidden activation.
    pub fn with_activation(mut self, activation: ActivationType) -> Self {
        self.activation = activation;
        self
    }

    /// Sets the dropout rate.
    pub fn with_dropout(mut self, rate: f32) -> Self {
        self.dropout_rate = rate;
        self
    }

    /// Enables or disables batch normalization.
    pub fn with_batch_norm(mut self, use_bn: bool) -> Self {
        self.use_bn = use_bn;
        self
    }

    /// Sets the kernel initializer standard deviation.
    pub fn with_init_std(mut self, init_std: f32) -> Self {
        self.init_std = init_std;
        self
    }

    /// Sets the dropout seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), LayerError> {
        if self.input_dim == 0 {
            return Err(LayerError::config("Input dimension must be positive"));
        }
        if self.hidden_units.is_empty() {
            return Err(LayerError::config("hidden_units is empty"));
        }
        if let Some(i) = self.hidden_units.iter().position(|&d| d == 0) {
            return Err(LayerError::config(format!(
                "Layer {} has zero output dimension",
                i
            )));
        }
        if !(0.0..1.0).contains(&self.dropout_rate) {
            return Err(LayerError::config("Dropout rate must be in [0, 1)"));
        }
        if !(self.init_std >= 0.0) {
            return Err(LayerError::config("init_std must be non-negative"));
        }
        Ok(())
    }

    /// Builds the DNN, drawing kernels from an RNG seeded with `seed`.
    pub fn build(self) -> Result<DNN, LayerError> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        DNN::from_config(self, &mut rng)
    }
}

/// A deep feedforward network.
///
/// Every hidden layer computes `dropout(act(bn(x W + b)))`; batch norm is
/// present only when `use_bn` is set.
///
/// # Example
///
/// ```
/// use ctr_layers::dnn::DNNConfig;
/// use ctr_layers::layer::Layer;
/// use ctr_layers::tensor::Tensor;
///
/// let dnn = DNNConfig::new(16, vec![8, 4]).build().unwrap();
/// let output = dnn.forward(&Tensor::ones(&[3, 16])).unwrap();
/// assert_eq!(output.shape(), &[3, 4]);
/// ```
#[derive(Debug, Clone)]
pub struct DNN {
    /// Dense layers
    linears: Vec<Dense>,
    /// Batch norm layers (empty when disabled)
    bns: Vec<BatchNorm>,
    /// Activation layers (one per dense layer)
    activations: Vec<ActivationLayer>,
    /// Shared dropout
    dropout: Dropout,
    /// Configuration used to build this DNN
    config: DNNConfig,
    /// Whether in training mode
    training: bool,
}

impl DNN {
    /// Creates a DNN from a configuration using the given RNG for kernels.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid
    pub fn from_config(config: DNNConfig, rng: &mut StdRng) -> Result<Self, LayerError> {
        config.validate()?;

        let mut linears = Vec::with_capacity(config.hidden_units.len());
        let mut bns = Vec::new();
        let mut activations = Vec::with_capacity(config.hidden_units.len());

        let mut prev_dim = config.input_dim;
        for &units in &config.hidden_units {
            linears.push(Dense::new_with_initializer(
                prev_dim,
                units,
                Initializer::normal(config.init_std),
                true,
                rng,
            ));
            if config.use_bn {
                bns.push(BatchNorm::new(units));
            }
            activations.push(ActivationLayer::from_activation_type(config.activation));
            prev_dim = units;
        }

        let dropout = Dropout::new(config.dropout_rate, config.seed)?;

        Ok(Self {
            linears,
            bns,
            activations,
            dropout,
            config,
            training: false,
        })
    }

    /// Returns the number of layers in the DNN.
    pub fn num_layers(&self) -> usize {
        self.linears.len()
    }

    /// Returns a reference to the dense layers.
    pub fn linears(&self) -> &[Dense] {
        &self.linears
    }

    /// Returns the configuration used to build this DNN.
    pub fn config(&self) -> &DNNConfig {
        &self.config
    }

    /// Returns the input dimension.
    pub fn input_dim(&self) -> usize {
        self.config.input_dim
    }

    /// Returns the output dimension.
    pub fn output_dim(&self) -> usize {
        self.config.hidden_units.last().copied().unwrap_or(0)
    }
}

impl Layer for DNN {
    fn forward(&self, input: &Tensor) -> Result<Tensor, LayerError> {
        if input.ndim() != 2 || input.shape()[1] != self.config.input_dim {
            return Err(LayerError::ShapeMismatch {
                expected: vec![input.shape().first().copied().unwrap_or(0), self.config.input_dim],
                actual: input.shape().to_vec(),
            });
        }

        let mut x = input.clone();
        for (i, (linear, activation)) in self.linears.iter().zip(&self.activations).enumerate() {
            x = linear.forward(&x)?;
            if let Some(bn) = self.bns.get(i) {
                x = bn.forward(&x)?;
            }
            x = activation.forward(&x)?;
            x = self.dropout.forward(&x)?;
        }

        Ok(x)
    }

    fn parameters(&self) -> Vec<&Tensor> {
        self.named_parameters().into_iter().map(|(_, p)| p).collect()
    }

    fn parameters_mut(&mut self) -> Vec<&mut Tensor> {
        let mut params = Vec::new();
        for linear in &mut self.linears {
            params.extend(linear.parameters_mut());
        }
        for bn in &mut self.bns {
            params.extend(bn.parameters_mut());
        }
        for activation in &mut self.activations {
            params.extend(activation.parameters_mut());
        }
        params
    }

    fn named_parameters(&self) -> Vec<(String, &Tensor)> {
        let mut params = Vec::new();
        for (i, linear) in self.linears.iter().enumerate() {
            for (name, p) in linear.named_parameters() {
                params.push((format!("linears.{}.{}", i, name), p));
            }
        }
        for (i, bn) in self.bns.iter().enumerate() {
            for (name, p) in bn.named_parameters() {
                params.push((format!("bn.{}.{}", i, name), p));
            }
        }
        for (i, activation) in self.activations.iter().enumerate() {
            for (name, p) in activation.named_parameters() {
                params.push((format!("activation_layers.{}.{}", i, name), p));
            }
        }
        params
    }

    fn name(&self) -> &str {
        "DNN"
    }

    fn is_training(&self) -> bool {
        self.training
    }

    fn set_training(&mut self, training: bool) {
        self.training = training;
        self.dropout.set_training(training);
        for bn in &mut self.bns {
            bn.set_training(training);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dnn_config_invalid() {
        assert!(DNNConfig::new(0, vec![4]).validate().is_err());

        let err = DNNConfig::new(8, vec![]).validate().unwrap_err();
        assert!(err.to_string().contains("hidden_units is empty"));

        assert!(DNNConfig::new(8, vec![4, 0]).validate().is_err());
        assert!(DNNConfig::new(8, vec![4]).with_dropout(1.0).validate().is_err());
        assert!(DNNConfig::new(8, vec![4]).with_init_std(-1.0).validate().is_err());
    }

    #[test]
    fn test_dnn_forward_shape() {
        let dnn = DNNConfig::new(10, vec![5, 2]).build().unwrap();
        let output = dnn.forward(&Tensor::ones(&[3, 10])).unwrap();
        assert_eq!(output.shape(), &[3, 2]);
        assert_eq!(dnn.output_dim(), 2);
        assert_eq!(dnn.num_layers(), 2);
    }

    #[test]
    fn test_dnn_rejects_wrong_width() {
        let dnn = DNNConfig::new(10, vec![5]).build().unwrap();
        assert!(dnn.forward(&Tensor::ones(&[3, 9])).is_err());
    }

    #[test]
    fn test_dnn_parameter_names() {
        let dnn = DNNConfig::new(4, vec![3, 2])
            .with_batch_norm(true)
            .with_activation(ActivationType::PReLU)
            .build()
            .unwrap();
        let names: Vec<String> = dnn.named_parameters().into_iter().map(|(n, _)| n).collect();
        assert!(names.contains(&"linears.0.weight".to_string()));
        assert!(names.contains(&"linears.1.bias".to_string()));
        assert!(names.contains(&"bn.0.running_var".to_string()));
        assert!(names.contains(&"activation_layers.1.weight".to_string()));
        assert_eq!(names.len(), dnn.parameters().len());
    }

    #[test]
    fn test_dnn_is_seeded() {
        let a = DNNConfig::new(6, vec![4]).with_init_std(0.1).build().unwrap();
        let b = DNNConfig::new(6, vec![4]).with_init_std(0.1).build().unwrap();
        assert_eq!(a.linears()[0].weights(), b.linears()[0].weights());
    }

    #[test]
    fn test_dropout_only_in_training() {
        let mut dnn = DNNConfig::new(8, vec![8])
            .with_activation(ActivationType::Linear)
            .with_init_std(0.5)
            .with_dropout(0.5)
            .build()
            .unwrap();
        let input = Tensor::ones(&[4, 8]);
        let eval_a = dnn.forward(&input).unwrap();
        let eval_b = dnn.forward(&input).unwrap();
        assert_eq!(eval_a, eval_b);

        dnn.set_training(true);
        let train = dnn.forward(&input).unwrap();
        assert!(train.data().iter().any(|&x| x == 0.0));
    }
}
