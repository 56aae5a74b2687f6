//! Neural network layers for CTR models.
//!
//! This crate provides the building blocks of click-through-rate models:
//!
//! - **Tensor**: a small row-major `f32` tensor with the reshaping helpers
//!   the layers need
//! - **Dense / DNN**: fully connected layers and a configurable feedforward
//!   stack with batch norm and dropout
//! - **Embeddings**: dense embedding tables and masked sequence pooling
//! - **Interaction**: inner and kernel-weighted outer products of field pairs
//! - **Prediction**: the task-specific output layer
//!
//! # Quick Start
//!
//! ```
//! use ctr_layers::prelude::*;
//!
//! let dnn = DNNConfig::new(16, vec![8, 4])
//!     .with_activation(ActivationType::ReLU)
//!     .build()
//!     .unwrap();
//!
//! let output = dnn.forward(&Tensor::ones(&[32, 16])).unwrap();
//! assert_eq!(output.shape(), &[32, 4]);
//! ```
//!
//! # Layer Trait
//!
//! All layers implement the [`Layer`] trait, which provides a unified
//! interface for forward passes and parameter access:
//!
//! ```
//! use ctr_layers::prelude::*;
//!
//! fn process_layer<L: Layer>(layer: &L, input: &Tensor) -> Tensor {
//!     layer.forward(input).unwrap()
//! }
//! ```
//!
//! # Product Layers
//!
//! ```
//! use ctr_layers::interaction::{KernelType, OuterProductLayer};
//! use ctr_layers::tensor::Tensor;
//! use rand::SeedableRng;
//!
//! let mut rng = rand::rngs::StdRng::seed_from_u64(1024);
//! let outer = OuterProductLayer::new(3, 4, KernelType::Mat, &mut rng).unwrap();
//! let fields = vec![Tensor::ones(&[2, 1, 4]); 3];
//! assert_eq!(outer.forward_fields(&fields).unwrap().shape(), &[2, 3]);
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod activation;
pub mod activation_layer;
pub mod dense;
pub mod dnn;
pub mod dropout;
pub mod embedding;
pub mod error;
pub mod initializer;
pub mod interaction;
pub mod layer;
pub mod merge;
pub mod normalization;
pub mod prediction;
pub mod regularizer;
pub mod tensor;

// Re-export main types at crate level
pub use activation::{Linear, PReLU, ReLU, Sigmoid, Tanh, GELU};
pub use activation_layer::{ActivationLayer, ActivationType};
pub use dense::Dense;
pub use dnn::{DNNConfig, DNN};
pub use dropout::Dropout;
pub use embedding::{EmbeddingDict, EmbeddingTable, PoolingMode, SequencePooling};
pub use error::{LayerError, LayerResult};
pub use initializer::Initializer;
pub use interaction::{InnerProductLayer, KernelType, OuterProductLayer};
pub use layer::Layer;
pub use merge::{combined_dnn_input, concat_fun};
pub use normalization::BatchNorm;
pub use prediction::{PredictionLayer, Task};
pub use regularizer::Regularizer;
pub use tensor::Tensor;

/// Prelude module for convenient imports.
///
/// Import everything commonly needed with:
/// ```
/// use ctr_layers::prelude::*;
/// ```
pub mod prelude {
    pub use crate::activation::{Linear, PReLU, ReLU, Sigmoid, Tanh, GELU};
    pub use crate::activation_layer::{ActivationLayer, ActivationType};
    pub use crate::dense::Dense;
    pub use crate::dnn::{DNNConfig, DNN};
    pub use crate::dropout::Dropout;
    pub use crate::embedding::{EmbeddingDict, EmbeddingTable, PoolingMode, SequencePooling};
    pub use crate::error::{LayerError, LayerResult};
    pub use crate::initializer::Initializer;
    pub use crate::interaction::{InnerProductLayer, KernelType, OuterProductLayer};
    pub use crate::layer::Layer;
    pub use crate::merge::{combined_dnn_input, concat_fun};
    pub use crate::normalization::BatchNorm;
    pub use crate::prediction::{PredictionLayer, Task};
    pub use crate::regularizer::Regularizer;
    pub use crate::tensor::Tensor;
}
