//! Activation selection by name, shared by the DNN and other layers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::activation::{Linear, PReLU, ReLU, Sigmoid, Tanh, GELU};
use crate::error::LayerError;
use crate::layer::Layer;
use crate::tensor::Tensor;

/// Activation functions selectable from configuration.
///
/// Parsed case-insensitively from `relu`, `sigmoid`, `tanh`, `gelu`, `prelu`
/// and `linear`; serialized as the lowercase name.
///
/// ```
/// use ctr_layers::activation_layer::ActivationType;
///
/// let act: ActivationType = "ReLU".parse().unwrap();
/// assert_eq!(act, ActivationType::ReLU);
/// assert!("dice2".parse::<ActivationType>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ActivationType {
    /// Rectified Linear Unit
    #[default]
    ReLU,
    /// Sigmoid function
    Sigmoid,
    /// Hyperbolic tangent
    Tanh,
    /// Gaussian Error Linear Unit
    GELU,
    /// Parametric ReLU with a learnable slope
    PReLU,
    /// Identity
    Linear,
}

impl ActivationType {
    /// Returns the canonical lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivationType::ReLU => "relu",
            ActivationType::Sigmoid => "sigmoid",
            ActivationType::Tanh => "tanh",
            ActivationType::GELU => "gelu",
            ActivationType::PReLU => "prelu",
            ActivationType::Linear => "linear",
        }
    }
}

impl fmt::Display for ActivationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActivationType {
    type Err = LayerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "relu" => Ok(ActivationType::ReLU),
            "sigmoid" => Ok(ActivationType::Sigmoid),
            "tanh" => Ok(ActivationType::Tanh),
            "gelu" => Ok(ActivationType::GELU),
            "prelu" => Ok(ActivationType::PReLU),
            "linear" | "none" => Ok(ActivationType::Linear),
            other => Err(LayerError::config(format!(
                "unsupported activation '{}': expected relu, sigmoid, tanh, gelu, prelu or linear",
                other
            ))),
        }
    }
}

impl TryFrom<String> for ActivationType {
    type Error = LayerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ActivationType> for String {
    fn from(value: ActivationType) -> Self {
        value.as_str().to_string()
    }
}

/// Activation layer built from an [`ActivationType`].
#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, Clone)]
pub enum ActivationLayer {
    /// See [`ReLU`].
    ReLU(ReLU),
    /// See [`Sigmoid`].
    Sigmoid(Sigmoid),
    /// See [`Tanh`].
    Tanh(Tanh),
    /// See [`GELU`].
    GELU(GELU),
    /// See [`PReLU`].
    PReLU(PReLU),
    /// See [`Linear`].
    Linear(Linear),
}

impl ActivationLayer {
    /// Instantiates the activation.
    pub fn from_activation_type(activation: ActivationType) -> Self {
        match activation {
            ActivationType::ReLU => ActivationLayer::ReLU(ReLU::new()),
            ActivationType::Sigmoid => ActivationLayer::Sigmoid(Sigmoid::new()),
            ActivationType::Tanh => ActivationLayer::Tanh(Tanh::new()),
            ActivationType::GELU => ActivationLayer::GELU(GELU::new()),
            ActivationType::PReLU => ActivationLayer::PReLU(PReLU::default()),
            ActivationType::Linear => ActivationLayer::Linear(Linear::new()),
        }
    }

    fn inner(&self) -> &dyn Layer {
        match self {
            Self::ReLU(a) => a,
            Self::Sigmoid(a) => a,
            Self::Tanh(a) => a,
            Self::GELU(a) => a,
            Self::PReLU(a) => a,
            Self::Linear(a) => a,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn Layer {
        match self {
            Self::ReLU(a) => a,
            Self::Sigmoid(a) => a,
            Self::Tanh(a) => a,
            Self::GELU(a) => a,
            Self::PReLU(a) => a,
            Self::Linear(a) => a,
        }
    }
}

impl Layer for ActivationLayer {
    fn forward(&self, input: &Tensor) -> Result<Tensor, LayerError> {
        self.inner().forward(input)
    }

    fn parameters(&self) -> Vec<&Tensor> {
        self.inner().parameters()
    }

    fn parameters_mut(&mut self) -> Vec<&mut Tensor> {
        self.inner_mut().parameters_mut()
    }

    fn named_parameters(&self) -> Vec<(String, &Tensor)> {
        self.inner().named_parameters()
    }

    fn name(&self) -> &str {
        self.inner().name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_names() {
        assert_eq!("relu".parse::<ActivationType>().unwrap(), ActivationType::ReLU);
        assert_eq!("PReLU".parse::<ActivationType>().unwrap(), ActivationType::PReLU);
        assert_eq!("linear".parse::<ActivationType>().unwrap(), ActivationType::Linear);
        assert!("dice".parse::<ActivationType>().is_err());
    }

    #[test]
    fn test_serde_as_string() {
        let json = serde_json::to_string(&ActivationType::Sigmoid).unwrap();
        assert_eq!(json, "\"sigmoid\"");
        let back: ActivationType = serde_json::from_str("\"tanh\"").unwrap();
        assert_eq!(back, ActivationType::Tanh);
        assert!(serde_json::from_str::<ActivationType>("\"swish\"").is_err());
    }

    #[test]
    fn test_activation_layer_dispatch() {
        let layer = ActivationLayer::from_activation_type(ActivationType::ReLU);
        let out = layer
            .forward(&Tensor::from_data(&[2], vec![-1.0, 1.0]))
            .unwrap();
        assert_eq!(out.data(), &[0.0, 1.0]);
        assert_eq!(layer.name(), "ReLU");

        let prelu = ActivationLayer::from_activation_type(ActivationType::PReLU);
        assert_eq!(prelu.parameters().len(), 1);
    }
}
