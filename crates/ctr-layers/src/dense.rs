//! Fully connected layer, the `nn.Linear` of the DNN tower and the output
//! projections.

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::error::LayerError;
use crate::initializer::Initializer;
use crate::layer::Layer;
use crate::tensor::Tensor;

/// `y = xW + b` for `x: [B, in]`, `W: [in, out]` and an optional `b: [out]`.
///
/// Parameters are named `weight` and `bias`.
///
/// # Example
///
/// ```
/// use ctr_layers::dense::Dense;
/// use ctr_layers::layer::Layer;
/// use ctr_layers::tensor::Tensor;
///
/// let projection = Dense::new_no_bias(16, 1);
/// let logits = projection.forward(&Tensor::ones(&[8, 16])).unwrap();
/// assert_eq!(logits.shape(), &[8, 1]);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dense {
    weights: Tensor,
    bias: Option<Tensor>,
    in_features: usize,
    out_features: usize,
}

impl Dense {
    /// Creates a new dense layer with Xavier-uniform weights and zero bias.
    ///
    /// Uses a fixed seed; models that need reproducibility across layers
    /// should call [`Dense::new_with_initializer`] with a shared RNG.
    pub fn new(in_features: usize, out_features: usize) -> Self {
        let mut rng = StdRng::seed_from_u64(0);
        Self::new_with_initializer(
            in_features,
            out_features,
            Initializer::XavierUniform,
            true,
            &mut rng,
        )
    }

    /// Like [`Dense::new`] but without a bias term.
    pub fn new_no_bias(in_features: usize, out_features: usize) -> Self {
        let mut rng = StdRng::seed_from_u64(0);
        Self::new_with_initializer(
            in_features,
            out_features,
            Initializer::XavierUniform,
            false,
            &mut rng,
        )
    }

    /// Creates a new dense layer with a custom weight initializer.
    ///
    /// The bias, when present, starts at zero.
    pub fn new_with_initializer(
        in_features: usize,
        out_features: usize,
        weight_init: Initializer,
        use_bias: bool,
        rng: &mut StdRng,
    ) -> Self {
        let weights = weight_init.initialize(&[in_features, out_features], rng);
        let bias = use_bias.then(|| Tensor::zeros(&[out_features]));

        Self {
            weights,
            bias,
            in_features,
            out_features,
        }
    }

    /// Wraps existing parameters.
    ///
    /// # Errors
    ///
    /// Returns an error unless `weights` is 2D and `bias` has one entry per
    /// output
    pub fn from_weights(weights: Tensor, bias: Option<Tensor>) -> Result<Self, LayerError> {
        if weights.ndim() != 2 {
            return Err(LayerError::config(format!(
                "Weights must be 2D, got {}D",
                weights.ndim()
            )));
        }
        if let Some(b) = &bias {
            if b.shape() != [weights.shape()[1]] {
                return Err(LayerError::ShapeMismatch {
                    expected: vec![weights.shape()[1]],
                    actual: b.shape().to_vec(),
                });
            }
        }

        let in_features = weights.shape()[0];
        let out_features = weights.shape()[1];
        Ok(Self {
            weights,
            bias,
            in_features,
            out_features,
        })
    }

    /// Input width.
    pub fn in_features(&self) -> usize {
        self.in_features
    }

    /// Output width.
    pub fn out_features(&self) -> usize {
        self.out_features
    }

    /// The `[in, out]` weight matrix.
    pub fn weights(&self) -> &Tensor {
        &self.weights
    }

    /// Mutable access to the weight matrix.
    pub fn weights_mut(&mut self) -> &mut Tensor {
        &mut self.weights
    }

    /// Returns the bias tensor, if the layer has one.
    pub fn bias(&self) -> Option<&Tensor> {
        self.bias.as_ref()
    }

    /// Whether a bias is added.
    pub fn has_bias(&self) -> bool {
        self.bias.is_some()
    }
}

impl Layer for Dense {
    fn forward(&self, input: &Tensor) -> Result<Tensor, LayerError> {
        if input.ndim() != 2 {
            return Err(LayerError::forward(format!(
                "Dense expects 2D input, got {}D",
                input.ndim()
            )));
        }
        let in_dim = input.shape()[1];
        if in_dim != self.in_features {
            return Err(LayerError::InvalidInputDimension {
                expected: self.in_features,
                actual: in_dim,
            });
        }

        let output = input.matmul(&self.weights);
        Ok(match &self.bias {
            Some(bias) => output.add(bias),
            None => output,
        })
    }

    fn parameters(&self) -> Vec<&Tensor> {
        let mut params = vec![&self.weights];
        if let Some(bias) = &self.bias {
            params.push(bias);
        }
        params
    }

    fn parameters_mut(&mut self) -> Vec<&mut Tensor> {
        let mut params = vec![&mut self.weights];
        if let Some(bias) = &mut self.bias {
            params.push(bias);
        }
        params
    }

    fn named_parameters(&self) -> Vec<(String, &Tensor)> {
        let mut params = vec![("weight".to_string(), &self.weights)];
        if let Some(bias) = &self.bias {
            params.push(("bias".to_string(), bias));
        }
        params
    }

    fn name(&self) -> &str {
        "Dense"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shapes_of_parameters() {
        let layer = Dense::new(19, 8);
        assert_eq!((layer.in_features(), layer.out_features()), (19, 8));
        assert_eq!(layer.weights().shape(), &[19, 8]);
        assert_eq!(layer.bias().map(|b| b.shape().to_vec()), Some(vec![8]));
        assert!(layer.bias().map(|b| b.data().iter().all(|&v| v == 0.0)).unwrap_or(false));
    }

    #[test]
    fn test_affine_map() {
        let weights = Tensor::from_data(&[2, 1], vec![2.0, -1.0]);
        let bias = Tensor::from_data(&[1], vec![0.5]);
        let layer = Dense::from_weights(weights, Some(bias)).unwrap();

        let input = Tensor::from_data(&[2, 2], vec![1.0, 1.0, 3.0, 2.0]);
        let output = layer.forward(&input).unwrap();
        assert_eq!(output.data(), &[1.5, 4.5]);
    }

    #[test]
    fn test_rejects_wrong_width_or_rank() {
        let layer = Dense::new(4, 2);
        let err = layer.forward(&Tensor::ones(&[3, 5])).unwrap_err();
        assert!(matches!(err, LayerError::InvalidInputDimension { expected: 4, actual: 5 }));
        assert!(layer.forward(&Tensor::ones(&[3, 1, 4])).is_err());
    }

    #[test]
    fn test_without_bias() {
        let layer = Dense::new_no_bias(6, 1);
        assert_eq!(layer.parameters().len(), 1);
        assert!(!layer.has_bias());
        assert_eq!(layer.named_parameters()[0].0, "weight");
    }

    #[test]
    fn test_from_weights_checks_bias() {
        let weights = Tensor::ones(&[3, 2]);
        assert!(Dense::from_weights(weights.clone(), Some(Tensor::zeros(&[3]))).is_err());
        assert!(Dense::from_weights(Tensor::ones(&[6]), None).is_err());
        assert!(Dense::from_weights(weights, Some(Tensor::zeros(&[2]))).is_ok());
    }
}
