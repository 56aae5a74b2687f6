//! Regularization utilities for learnable parameters.

use serde::{Deserialize, Serialize};

use crate::tensor::Tensor;

/// Regularizer types supported for layer parameters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq)]
pub enum Regularizer {
    /// No regularization.
    #[default]
    None,
    /// L1 regularization with coefficient.
    L1(f32),
    /// L2 regularization with coefficient.
    L2(f32),
    /// Combined L1 + L2 regularization.
    L1L2 {
        /// L1 coefficient.
        l1: f32,
        /// L2 coefficient.
        l2: f32,
    },
}

impl Regularizer {
    /// Builds the regularizer matching a pair of coefficients.
    pub fn from_coefficients(l1: f32, l2: f32) -> Self {
        match (l1 != 0.0, l2 != 0.0) {
            (false, false) => Regularizer::None,
            (true, false) => Regularizer::L1(l1),
            (false, true) => Regularizer::L2(l2),
            (true, true) => Regularizer::L1L2 { l1, l2 },
        }
    }

    /// Returns the regularization loss for the given parameter tensor.
    pub fn loss(&self, param: &Tensor) -> f32 {
        match *self {
            Regularizer::None => 0.0,
            Regularizer::L1(lambda) => param.abs().sum() * lambda,
            Regularizer::L2(lambda) => param.sqr().sum() * lambda,
            Regularizer::L1L2 { l1, l2 } => param.abs().sum() * l1 + param.sqr().sum() * l2,
        }
    }

    /// Returns true when the regularizer contributes nothing.
    pub fn is_none(&self) -> bool {
        matches!(self, Regularizer::None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_loss() {
        let p = Tensor::from_data(&[3], vec![1.0, -2.0, 3.0]);
        assert_eq!(Regularizer::None.loss(&p), 0.0);
        assert_relative_eq!(Regularizer::L1(0.5).loss(&p), 3.0);
        assert_relative_eq!(Regularizer::L2(0.1).loss(&p), 1.4, epsilon = 1e-6);
        assert_relative_eq!(
            Regularizer::L1L2 { l1: 0.5, l2: 0.1 }.loss(&p),
            4.4,
            epsilon = 1e-6
        );
    }

    #[test]
    fn test_from_coefficients() {
        assert_eq!(Regularizer::from_coefficients(0.0, 0.0), Regularizer::None);
        assert_eq!(Regularizer::from_coefficients(0.0, 1e-5), Regularizer::L2(1e-5));
        assert!(matches!(
            Regularizer::from_coefficients(0.1, 0.2),
            Regularizer::L1L2 { .. }
        ));
    }
}
