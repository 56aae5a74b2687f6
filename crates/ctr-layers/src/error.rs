//! Errors raised while building layers or running a forward pass.

use thiserror::Error;

/// Error type for layer operations.
///
/// Construction problems (bad sizes, unknown kernel or task names) are
/// [`LayerError::ConfigError`]; everything detected on a batch is one of the
/// shape, forward or embedding variants.
#[derive(Debug, Error)]
pub enum LayerError {
    /// Shape mismatch between expected and actual tensor shapes.
    #[error("Shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        /// The expected shape
        expected: Vec<usize>,
        /// The actual shape that was provided
        actual: Vec<usize>,
    },

    /// The last input axis does not match the layer's input width.
    #[error("Invalid input dimension: expected {expected}, got {actual}")]
    InvalidInputDimension {
        /// The expected input dimension
        expected: usize,
        /// The actual input dimension
        actual: usize,
    },

    /// Error during forward pass computation.
    #[error("Forward pass error: {message}")]
    ForwardError {
        /// Description of the forward pass error
        message: String,
    },

    /// Configuration error for the layer.
    #[error("Configuration error: {message}")]
    ConfigError {
        /// Description of the configuration error
        message: String,
    },

    /// An id is negative, NaN or outside the vocabulary.
    #[error("Embedding lookup error: {message}")]
    EmbeddingError {
        /// Which id failed and why
        message: String,
    },

    /// A named parameter was requested that the layer does not own.
    #[error("Unknown parameter: {name}")]
    UnknownParameter {
        /// The requested parameter name
        name: String,
    },
}

impl LayerError {
    /// Shorthand for a [`LayerError::ConfigError`].
    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// Shorthand for a [`LayerError::ForwardError`].
    pub fn forward(message: impl Into<String>) -> Self {
        Self::ForwardError {
            message: message.into(),
        }
    }
}

/// Result type alias for layer operations.
pub type LayerResult<T> = Result<T, LayerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_helpers_pick_variant() {
        assert!(matches!(LayerError::config("x"), LayerError::ConfigError { .. }));
        assert!(matches!(LayerError::forward("x"), LayerError::ForwardError { .. }));
    }

    #[test]
    fn test_messages_carry_context() {
        let err = LayerError::config("kernel_type must be mat, vec or num");
        assert_eq!(
            err.to_string(),
            "Configuration error: kernel_type must be mat, vec or num"
        );

        let err = LayerError::ShapeMismatch {
            expected: vec![4, 3, 8],
            actual: vec![4, 2, 8],
        };
        assert_eq!(err.to_string(), "Shape mismatch: expected [4, 3, 8], got [4, 2, 8]");

        let err = LayerError::UnknownParameter {
            name: "dnn.linears.9.weight".to_string(),
        };
        assert!(err.to_string().ends_with("dnn.linears.9.weight"));
    }
}
