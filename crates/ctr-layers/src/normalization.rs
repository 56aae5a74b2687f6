//! Batch normalization over the feature axis of 2D inputs.

use serde::{Deserialize, Serialize};

use crate::error::LayerError;
use crate::layer::Layer;
use crate::tensor::Tensor;

/// Batch Normalization layer.
///
/// `y = (x - mean) / sqrt(var + eps) * gamma + beta`, where `mean`/`var` are
/// the batch statistics in training mode and the running statistics in
/// inference mode. Running statistics are exposed as parameters so they
/// travel with checkpoints.
///
/// # Example
///
/// ```
/// use ctr_layers::normalization::BatchNorm;
/// use ctr_layers::layer::Layer;
/// use ctr_layers::tensor::Tensor;
///
/// let bn = BatchNorm::new(4);
/// let output = bn.forward(&Tensor::ones(&[8, 4])).unwrap();
/// assert_eq!(output.shape(), &[8, 4]);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchNorm {
    /// Learnable scale parameter (gamma)
    gamma: Tensor,
    /// Learnable shift parameter (beta)
    beta: Tensor,
    /// Running mean for inference
    running_mean: Tensor,
    /// Running variance for inference
    running_var: Tensor,
    /// Small constant for numerical stability
    eps: f32,
    /// Number of features
    num_features: usize,
    /// Whether in training mode
    training: bool,
}

impl BatchNorm {
    /// Creates a new Batch Normalization layer with `eps = 1e-5`.
    pub fn new(num_features: usize) -> Self {
        Self::with_eps(num_features, 1e-5)
    }

    /// Creates a Batch Normalization layer with custom epsilon.
    pub fn with_eps(num_features: usize, eps: f32) -> Self {
        Self {
            gamma: Tensor::ones(&[num_features]),
            beta: Tensor::zeros(&[num_features]),
            running_mean: Tensor::zeros(&[num_features]),
            running_var: Tensor::ones(&[num_features]),
            eps,
            num_features,
            training: false,
        }
    }

    /// Returns the number of features.
    pub fn num_features(&self) -> usize {
        self.num_features
    }

    /// Returns references to running mean/var.
    pub fn running_stats(&self) -> (&Tensor, &Tensor) {
        (&self.running_mean, &self.running_var)
    }

    fn batch_stats(input: &Tensor) -> (Tensor, Tensor) {
        let mean = input.mean_axis(0);
        let m = input.shape()[0];
        let n = input.shape()[1];
        let mut var = vec![0.0; n];
        for i in 0..m {
            for (j, v) in var.iter_mut().enumerate() {
                let diff = input.data()[i * n + j] - mean.data()[j];
                *v += diff * diff;
            }
        }
        let count = m.max(1) as f32;
        let var = var.into_iter().map(|v| v / count).collect();
        (mean, Tensor::from_data(&[n], var))
    }
}

impl Layer for BatchNorm {
    fn forward(&self, input: &Tensor) -> Result<Tensor, LayerError> {
        if input.ndim() != 2 {
            return Err(LayerError::forward(format!(
                "BatchNorm expects 2D input, got {}D",
                input.ndim()
            )));
        }
        if input.shape()[1] != self.num_features {
            return Err(LayerError::InvalidInputDimension {
                expected: self.num_features,
                actual: input.shape()[1],
            });
        }

        let (mean, var) = if self.training {
            Self::batch_stats(input)
        } else {
            (self.running_mean.clone(), self.running_var.clone())
        };

        let dim = self.num_features;
        let output: Vec<f32> = input
            .data()
            .iter()
            .enumerate()
            .map(|(idx, &x)| {
                let j = idx % dim;
                let x_norm = (x - mean.data()[j]) / (var.data()[j] + self.eps).sqrt();
                self.gamma.data()[j] * x_norm + self.beta.data()[j]
            })
            .collect();

        Tensor::try_from_data(input.shape(), output)
    }

    fn parameters(&self) -> Vec<&Tensor> {
        vec![
            &self.gamma,
            &self.beta,
            &self.running_mean,
            &self.running_var,
        ]
    }

    fn parameters_mut(&mut self) -> Vec<&mut Tensor> {
        vec![
            &mut self.gamma,
            &mut self.beta,
            &mut self.running_mean,
            &mut self.running_var,
        ]
    }

    fn named_parameters(&self) -> Vec<(String, &Tensor)> {
        vec![
            ("weight".to_string(), &self.gamma),
            ("bias".to_string(), &self.beta),
            ("running_mean".to_string(), &self.running_mean),
            ("running_var".to_string(), &self.running_var),
        ]
    }

    fn name(&self) -> &str {
        "BatchNorm"
    }

    fn is_training(&self) -> bool {
        self.training
    }

    fn set_training(&mut self, training: bool) {
        self.training = training;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_inference_uses_running_stats() {
        let bn = BatchNorm::new(2);
        let input = Tensor::from_data(&[2, 2], vec![1.0, 2.0, 3.0, 4.0]);
        let output = bn.forward(&input).unwrap();
        // running mean 0, var 1 -> (x / sqrt(1 + eps))
        for (o, i) in output.data().iter().zip(input.data()) {
            assert_relative_eq!(*o, i / (1.0f32 + 1e-5).sqrt(), epsilon = 1e-6);
        }
    }

    #[test]
    fn test_training_normalizes_batch() {
        let mut bn = BatchNorm::new(3);
        bn.set_training(true);
        let input = Tensor::from_data(&[2, 3], vec![1.0, 2.0, 3.0, 3.0, 6.0, 9.0]);
        let output = bn.forward(&input).unwrap();
        let col_means = output.mean_axis(0);
        for &m in col_means.data() {
            assert_relative_eq!(m, 0.0, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_shape_checks() {
        let bn = BatchNorm::new(3);
        assert!(bn.forward(&Tensor::ones(&[2, 4])).is_err());
        assert!(bn.forward(&Tensor::ones(&[2, 3, 1])).is_err());
    }

    #[test]
    fn test_named_parameters() {
        let bn = BatchNorm::new(3);
        let names: Vec<String> = bn.named_parameters().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["weight", "bias", "running_mean", "running_var"]);
    }
}
