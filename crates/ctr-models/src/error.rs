//! Error types for the ctr-models crate.
//!
//! [`ModelError`] covers model construction, input validation, metrics and
//! checkpoint IO. Failures inside a layer surface unchanged through
//! [`ModelError::Layer`].

use std::path::PathBuf;

use ctr_layers::LayerError;
use thiserror::Error;

/// The main error type for ctr-models operations.
#[derive(Debug, Error)]
pub enum ModelError {
    /// Error raised by a layer.
    #[error(transparent)]
    Layer(#[from] LayerError),

    /// The outer product kernel type is not one of `mat`, `vec`, `num`.
    #[error("kernel_type must be mat, vec or num, got '{kernel_type}'")]
    InvalidKernelType {
        /// The rejected kernel type.
        kernel_type: String,
    },

    /// The requested device is not available in this build.
    #[error("Unsupported device '{device}': only cpu is available")]
    UnsupportedDevice {
        /// The requested device string.
        device: String,
    },

    /// Sparse features declare different embedding dimensions where a
    /// common one is required.
    #[error("embedding_dim of SparseFeat and VarlenSparseFeat must be same in this model, got {dims:?}")]
    MixedEmbeddingDims {
        /// The distinct dimensions found.
        dims: Vec<usize>,
    },

    /// Dense feature columns were given to a model that does not accept them.
    #[error("DenseFeat is not supported in this model: {names:?}")]
    DenseNotSupported {
        /// Names of the offending columns.
        names: Vec<String>,
    },

    /// A feature name is not present in the feature index.
    #[error("Unknown feature: {name}")]
    UnknownFeature {
        /// The missing feature name.
        name: String,
    },

    /// Invalid input batch.
    #[error("Invalid input: {message}")]
    InvalidInput {
        /// A description of the problem.
        message: String,
    },

    /// Error during configuration parsing or validation.
    #[error("Configuration error: {message}")]
    ConfigError {
        /// A description of the configuration error.
        message: String,
    },

    /// Metric computation failed.
    #[error("Metric error: {message}")]
    MetricError {
        /// A description of the metric error.
        message: String,
    },

    /// A checkpoint does not match the model it is loaded into.
    #[error("State dict error: {message}")]
    StateDict {
        /// A description of the mismatch.
        message: String,
    },

    /// I/O error while reading or writing a file.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path where the error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// JSON (de)serialization failed.
    #[error("Serialization error: {0}")]
    Serialization(#[source] serde_json::Error),

    /// Checkpoint version mismatch.
    #[error("Version mismatch: expected {expected}, found {found}")]
    VersionMismatch {
        /// Expected version.
        expected: u32,
        /// Found version.
        found: u32,
    },
}

impl ModelError {
    /// Shorthand for a [`ModelError::ConfigError`].
    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// Shorthand for a [`ModelError::InvalidInput`].
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }
}

/// A specialized Result type for ctr-models operations.
pub type Result<T> = std::result::Result<T, ModelError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layer_error_is_transparent() {
        let err: ModelError = LayerError::config("kernel_type must be mat, vec or num").into();
        assert_eq!(
            err.to_string(),
            "Configuration error: kernel_type must be mat, vec or num"
        );
    }

    #[test]
    fn test_error_display() {
        let err = ModelError::UnsupportedDevice {
            device: "cuda:0".to_string(),
        };
        assert!(err.to_string().contains("cuda:0"));

        let err = ModelError::VersionMismatch {
            expected: 1,
            found: 2,
        };
        assert_eq!(err.to_string(), "Version mismatch: expected 1, found 2");
    }
}
