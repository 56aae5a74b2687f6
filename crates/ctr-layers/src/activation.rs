//! Activation function layers.
//!
//! This module provides the element-wise activations used by the DNN and
//! prediction layers: ReLU, Sigmoid, Tanh, GELU, PReLU and the identity.

use crate::error::LayerError;
use crate::layer::Layer;
use crate::tensor::Tensor;
use serde::{Deserialize, Serialize};

/// Rectified Linear Unit (ReLU) activation function.
///
/// Computes `f(x) = max(0, x)` element-wise.
///
/// # Example
///
/// ```
/// use ctr_layers::activation::ReLU;
/// use ctr_layers::layer::Layer;
/// use ctr_layers::tensor::Tensor;
///
/// let relu = ReLU::new();
/// let input = Tensor::from_data(&[2, 2], vec![-1.0, 0.0, 1.0, 2.0]);
/// let output = relu.forward(&input).unwrap();
/// assert_eq!(output.data(), &[0.0, 0.0, 1.0, 2.0]);
/// ```
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ReLU;

impl ReLU {
    /// Creates a new ReLU activation layer.
    pub fn new() -> Self {
        Self
    }
}

impl Layer for ReLU {
    fn forward(&self, input: &Tensor) -> Result<Tensor, LayerError> {
        Ok(input.map(|x| x.max(0.0)))
    }

    fn parameters(&self) -> Vec<&Tensor> {
        vec![]
    }

    fn parameters_mut(&mut self) -> Vec<&mut Tensor> {
        vec![]
    }

    fn name(&self) -> &str {
        "ReLU"
    }
}

/// Sigmoid activation function.
///
/// Computes `f(x) = 1 / (1 + exp(-x))` element-wise.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Sigmoid;

impl Sigmoid {
    /// Creates a new Sigmoid activation layer.
    pub fn new() -> Self {
        Self
    }

    /// Numerically stable scalar sigmoid.
    pub fn apply(x: f32) -> f32 {
        if x >= 0.0 {
            1.0 / (1.0 + (-x).exp())
        } else {
            let e = x.exp();
            e / (1.0 + e)
        }
    }
}

impl Layer for Sigmoid {
    fn forward(&self, input: &Tensor) -> Result<Tensor, LayerError> {
        Ok(input.map(Sigmoid::apply))
    }

    fn parameters(&self) -> Vec<&Tensor> {
        vec![]
    }

    fn parameters_mut(&mut self) -> Vec<&mut Tensor> {
        vec![]
    }

    fn name(&self) -> &str {
        "Sigmoid"
    }
}

/// Hyperbolic tangent activation function.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Tanh;

impl Tanh {
    /// Creates a new Tanh activation layer.
    pub fn new() -> Self {
        Self
    }
}

impl Layer for Tanh {
    fn forward(&self, input: &Tensor) -> Result<Tensor, LayerError> {
        Ok(input.map(f32::tanh))
    }

    fn parameters(&self) -> Vec<&Tensor> {
        vec![]
    }

    fn parameters_mut(&mut self) -> Vec<&mut Tensor> {
        vec![]
    }

    fn name(&self) -> &str {
        "Tanh"
    }
}

/// Gaussian Error Linear Unit (GELU) activation function.
///
/// We use the approximation: `GELU(x) ≈ 0.5 * x * (1 + tanh(sqrt(2/pi) * (x + 0.044715 * x^3)))`
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct GELU;

impl GELU {
    const SQRT_2_OVER_PI: f32 = 0.797_884_6;
    const COEFF: f32 = 0.044_715;

    /// Creates a new GELU activation layer.
    pub fn new() -> Self {
        Self
    }
}

impl Layer for GELU {
    fn forward(&self, input: &Tensor) -> Result<Tensor, LayerError> {
        Ok(input.map(|x| {
            0.5 * x * (1.0 + (Self::SQRT_2_OVER_PI * (x + Self::COEFF * x * x * x)).tanh())
        }))
    }

    fn parameters(&self) -> Vec<&Tensor> {
        vec![]
    }

    fn parameters_mut(&mut self) -> Vec<&mut Tensor> {
        vec![]
    }

    fn name(&self) -> &str {
        "GELU"
    }
}

/// Parametric ReLU (PReLU) activation function.
///
/// Computes `f(x) = x` if x > 0, else `alpha * x`, where alpha is a learnable parameter.
///
/// # Example
///
/// ```
/// use ctr_layers::activation::PReLU;
/// use ctr_layers::layer::Layer;
/// use ctr_layers::tensor::Tensor;
///
/// let prelu = PReLU::new(0.25);
/// let input = Tensor::from_data(&[2, 2], vec![-2.0, -1.0, 1.0, 2.0]);
/// let output = prelu.forward(&input).unwrap();
/// assert!((output.data()[0] - (-0.5)).abs() < 1e-6);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PReLU {
    /// Learnable alpha parameter (negative slope)
    alpha: Tensor,
}

impl PReLU {
    /// Creates a new PReLU activation layer with the specified initial alpha.
    pub fn new(initial_alpha: f32) -> Self {
        Self {
            alpha: Tensor::from_data(&[1], vec![initial_alpha]),
        }
    }

    /// Returns the current alpha value.
    pub fn alpha(&self) -> f32 {
        self.alpha.data()[0]
    }
}

impl Default for PReLU {
    fn default() -> Self {
        Self::new(0.25)
    }
}

impl Layer for PReLU {
    fn forward(&self, input: &Tensor) -> Result<Tensor, LayerError> {
        let alpha = self.alpha();
        Ok(input.map(|x| if x > 0.0 { x } else { alpha * x }))
    }

    fn parameters(&self) -> Vec<&Tensor> {
        vec![&self.alpha]
    }

    fn parameters_mut(&mut self) -> Vec<&mut Tensor> {
        vec![&mut self.alpha]
    }

    fn named_parameters(&self) -> Vec<(String, &Tensor)> {
        vec![("weight".to_string(), &self.alpha)]
    }

    fn name(&self) -> &str {
        "PReLU"
    }
}

/// Identity activation.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Linear;

impl Linear {
    /// Creates a new identity activation layer.
    pub fn new() -> Self {
        Self
    }
}

impl Layer for Linear {
    fn forward(&self, input: &Tensor) -> Result<Tensor, LayerError> {
        Ok(input.clone())
    }

    fn parameters(&self) -> Vec<&Tensor> {
        vec![]
    }

    fn parameters_mut(&mut self) -> Vec<&mut Tensor> {
        vec![]
    }

    fn name(&self) -> &str {
        "Linear"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_relu() {
        let input = Tensor::from_data(&[4], vec![-2.0, -0.5, 0.5, 2.0]);
        let output = ReLU::new().forward(&input).unwrap();
        assert_eq!(output.data(), &[0.0, 0.0, 0.5, 2.0]);
    }

    #[test]
    fn test_sigmoid_is_stable() {
        let input = Tensor::from_data(&[3], vec![-100.0, 0.0, 100.0]);
        let output = Sigmoid::new().forward(&input).unwrap();
        assert!(output.data().iter().all(|x| x.is_finite()));
        assert_relative_eq!(output.data()[1], 0.5);
        assert!(output.data()[0] < 1e-6);
        assert!(output.data()[2] > 1.0 - 1e-6);
    }

    #[test]
    fn test_tanh_and_gelu() {
        let input = Tensor::from_data(&[2], vec![0.0, 10.0]);
        let t = Tanh::new().forward(&input).unwrap();
        assert_relative_eq!(t.data()[0], 0.0);
        let g = GELU::new().forward(&input).unwrap();
        assert_relative_eq!(g.data()[0], 0.0);
        assert_relative_eq!(g.data()[1], 10.0, epsilon = 1e-3);
    }

    #[test]
    fn test_prelu_parameters() {
        let prelu = PReLU::default();
        assert_eq!(prelu.parameters().len(), 1);
        assert_eq!(prelu.named_parameters()[0].0, "weight");
        assert_relative_eq!(prelu.alpha(), 0.25);
    }

    #[test]
    fn test_linear_is_identity() {
        let input = Tensor::from_data(&[2], vec![-1.0, 3.0]);
        assert_eq!(Linear::new().forward(&input).unwrap(), input);
    }
}
