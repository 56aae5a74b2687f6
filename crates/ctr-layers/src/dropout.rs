//! Inverted dropout.

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::LayerError;
use crate::layer::Layer;
use crate::tensor::Tensor;

/// Dropout layer.
///
/// In training mode each unit is zeroed with probability `rate` and the
/// survivors are scaled by `1 / (1 - rate)`. In inference mode the input is
/// returned unchanged. The mask RNG sits behind a mutex so the layer can
/// run from a shared reference.
#[derive(Debug)]
pub struct Dropout {
    rate: f32,
    training: bool,
    rng: Mutex<StdRng>,
}

impl Dropout {
    /// Creates a dropout layer.
    ///
    /// # Errors
    ///
    /// Returns an error if `rate` is outside `[0, 1)`.
    pub fn new(rate: f32, seed: u64) -> Result<Self, LayerError> {
        if !(0.0..1.0).contains(&rate) {
            return Err(LayerError::config(format!(
                "dropout rate must be in [0, 1), got {}",
                rate
            )));
        }
        Ok(Self {
            rate,
            training: false,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        })
    }

    /// Returns the drop probability.
    pub fn rate(&self) -> f32 {
        self.rate
    }
}

impl Clone for Dropout {
    fn clone(&self) -> Self {
        Self {
            rate: self.rate,
            training: self.training,
            rng: Mutex::new(self.rng.lock().clone()),
        }
    }
}

impl Layer for Dropout {
    fn forward(&self, input: &Tensor) -> Result<Tensor, LayerError> {
        if !self.training || self.rate == 0.0 {
            return Ok(input.clone());
        }

        let keep = 1.0 - self.rate;
        let mut rng = self.rng.lock();
        let data: Vec<f32> = input
            .data()
            .iter()
            .map(|&x| {
                if rng.gen::<f32>() < self.rate {
                    0.0
                } else {
                    x / keep
                }
            })
            .collect();
        Tensor::try_from_data(input.shape(), data)
    }

    fn parameters(&self) -> Vec<&Tensor> {
        vec![]
    }

    fn parameters_mut(&mut self) -> Vec<&mut Tensor> {
        vec![]
    }

    fn name(&self) -> &str {
        "Dropout"
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

    #[test]
    fn test_invalid_rate() {
        assert!(Dropout::new(1.0, 0).is_err());
        assert!(Dropout::new(-0.1, 0).is_err());
        assert!(Dropout::new(0.0, 0).is_ok());
    }

    #[test]
    fn test_inference_is_identity() {
        let dropout = Dropout::new(0.5, 7).unwrap();
        let input = Tensor::ones(&[4, 8]);
        assert_eq!(dropout.forward(&input).unwrap(), input);
    }

    #[test]
    fn test_training_drops_and_rescales() {
        let mut dropout = Dropout::new(0.5, 7).unwrap();
        dropout.set_training(true);

        let input = Tensor::ones(&[64, 64]);
        let output = dropout.forward(&input).unwrap();

        let zeros = output.data().iter().filter(|&&x| x == 0.0).count();
        assert!(output.data().iter().all(|&x| x == 0.0 || x == 2.0));
        assert!(zeros > 1500 && zeros < 2600);
    }
}
