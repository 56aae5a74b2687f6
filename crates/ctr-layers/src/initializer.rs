//! Weight initialization strategies.
//!
//! Every random initializer draws from a caller-supplied [`StdRng`], so a model
//! built from one seed always starts from the same weights.

use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::tensor::Tensor;

/// Initialization strategy for a parameter tensor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub enum Initializer {
    /// All zeros.
    #[default]
    Zeros,
    /// All ones.
    Ones,
    /// Constant value.
    Constant(f32),
    /// Normal distribution `N(mean, std)`.
    Normal {
        /// Mean of the distribution.
        mean: f32,
        /// Standard deviation of the distribution.
        std: f32,
    },
    /// Glorot/Xavier uniform initialization, `U(-a, a)` with
    /// `a = sqrt(6 / (fan_in + fan_out))`.
    XavierUniform,
}

impl Initializer {
    /// Zero-mean normal initializer with the given standard deviation.
    pub fn normal(std: f32) -> Self {
        Initializer::Normal { mean: 0.0, std }
    }

    /// Creates a tensor of `shape` using this strategy.
    pub fn initialize(&self, shape: &[usize], rng: &mut StdRng) -> Tensor {
        match *self {
            Initializer::Zeros => Tensor::zeros(shape),
            Initializer::Ones => Tensor::ones(shape),
            Initializer::Constant(value) => Tensor::full(shape, value),
            Initializer::Normal { mean, std } => Tensor::randn(shape, mean, std, rng),
            Initializer::XavierUniform => {
                let (fan_in, fan_out) = compute_fans(shape);
                let limit = (6.0 / (fan_in + fan_out).max(1.0)).sqrt();
                Tensor::rand_uniform(shape, -limit, limit, rng)
            }
        }
    }
}

/// Fan-in/fan-out of a weight shape.
///
/// The second dimension is the input side and the first the output side;
/// trailing dimensions form the receptive field.
fn compute_fans(shape: &[usize]) -> (f32, f32) {
    match shape.len() {
        0 => (1.0, 1.0),
        1 => (shape[0] as f32, shape[0] as f32),
        _ => {
            let receptive: usize = shape[2..].iter().product();
            let fan_in = (shape[1] * receptive) as f32;
            let fan_out = (shape[0] * receptive) as f32;
            (fan_in, fan_out)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_constant_initializers() {
        let mut rng = StdRng::seed_from_u64(0);
        assert!(Initializer::Zeros
            .initialize(&[3, 4], &mut rng)
            .data()
            .iter()
            .all(|&x| x == 0.0));
        assert!(Initializer::Constant(0.25)
            .initialize(&[2], &mut rng)
            .data()
            .iter()
            .all(|&x| x == 0.25));
    }

    #[test]
    fn test_normal_std() {
        let mut rng = StdRng::seed_from_u64(1024);
        let t = Initializer::normal(0.01).initialize(&[100, 100], &mut rng);
        let mean = t.mean();
        let var = t.map(|x| (x - mean) * (x - mean)).mean();
        assert!(mean.abs() < 1e-3);
        assert!((var.sqrt() - 0.01).abs() < 1e-3);
    }

    #[test]
    fn test_xavier_bounds() {
        let mut rng = StdRng::seed_from_u64(3);
        // [E, P, E] kernel: fan_in = P * E, fan_out = E * E
        let t = Initializer::XavierUniform.initialize(&[4, 6, 4], &mut rng);
        let limit = (6.0f32 / (24.0 + 16.0)).sqrt();
        assert!(t.data().iter().all(|&x| x.abs() <= limit));
    }

    #[test]
    fn test_compute_fans() {
        assert_eq!(compute_fans(&[3, 5]), (5.0, 3.0));
        assert_eq!(compute_fans(&[4, 6, 4]), (24.0, 16.0));
        assert_eq!(compute_fans(&[7]), (7.0, 7.0));
    }
}
