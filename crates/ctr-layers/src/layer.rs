//! The [`Layer`] trait shared by every building block.

use crate::error::LayerError;
use crate::tensor::Tensor;

/// A differentiable building block with learnable parameters.
///
/// Parameter names returned by [`Layer::named_parameters`] are relative to
/// the layer; models prefix them (`dnn.linears.0.weight`) to build state
/// dicts and regularisation lists.
///
/// # Example
///
/// ```
/// use ctr_layers::dense::Dense;
/// use ctr_layers::layer::Layer;
/// use ctr_layers::tensor::Tensor;
///
/// let layer = Dense::new(128, 64);
/// let input = Tensor::zeros(&[32, 128]); // batch of 32, input dim 128
/// let output = layer.forward(&input).unwrap();
/// assert_eq!(output.shape(), &[32, 64]);
/// ```
pub trait Layer: Send + Sync {
    /// Runs the layer on a batch.
    ///
    /// # Errors
    ///
    /// Returns a [`LayerError`] if the input shape does not fit the layer
    fn forward(&self, input: &Tensor) -> Result<Tensor, LayerError>;

    /// Returns references to the layer's learnable parameters.
    fn parameters(&self) -> Vec<&Tensor>;

    /// Returns mutable references to the layer's learnable parameters.
    fn parameters_mut(&mut self) -> Vec<&mut Tensor>;

    /// Returns the layer's parameters keyed by a stable, dotted name.
    ///
    /// The default implementation numbers the parameters in the order of
    /// [`Layer::parameters`].
    fn named_parameters(&self) -> Vec<(String, &Tensor)> {
        self.parameters()
            .into_iter()
            .enumerate()
            .map(|(i, p)| (i.to_string(), p))
            .collect()
    }

    /// Returns the name of the layer for debugging and logging purposes.
    fn name(&self) -> &str {
        "Layer"
    }

    /// Returns whether the layer is in training mode.
    fn is_training(&self) -> bool {
        false
    }

    /// Switches dropout and batch statistics on or off.
    fn set_training(&mut self, _training: bool) {}

    /// Returns the total number of learnable scalars.
    fn num_parameters(&self) -> usize {
        self.parameters().iter().map(|p| p.numel()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Scales its input by a learnable scalar.
    struct Scale {
        factor: Tensor,
    }

    impl Layer for Scale {
        fn forward(&self, input: &Tensor) -> Result<Tensor, LayerError> {
            Ok(input.scale(self.factor.data()[0]))
        }

        fn parameters(&self) -> Vec<&Tensor> {
            vec![&self.factor]
        }

        fn parameters_mut(&mut self) -> Vec<&mut Tensor> {
            vec![&mut self.factor]
        }
    }

    #[test]
    fn test_defaults() {
        let mut scale = Scale {
            factor: Tensor::from_data(&[1], vec![3.0]),
        };
        let out = scale.forward(&Tensor::ones(&[2, 2])).unwrap();
        assert_eq!(out.data(), &[3.0; 4]);

        assert_eq!(scale.name(), "Layer");
        assert_eq!(scale.num_parameters(), 1);
        assert_eq!(scale.named_parameters()[0].0, "0");

        // training mode is a no-op for stateless layers
        scale.set_training(true);
        assert!(!scale.is_training());

        scale.parameters_mut()[0].data_mut()[0] = -1.0;
        assert_eq!(scale.forward(&Tensor::ones(&[1, 1])).unwrap().data(), &[-1.0]);
    }
}
