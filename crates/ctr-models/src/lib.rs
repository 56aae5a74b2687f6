//! Feature columns, the shared model base and the Product-based Neural
//! Network for click-through-rate prediction.
//!
//! - **Feature columns**: sparse, sequence and dense column descriptions and
//!   the layout of the input matrix they imply
//! - **Base model**: embedding tables, input slicing, regularisation
//!   bookkeeping, batched prediction and evaluation
//! - **Meta transformation**: optional domain-conditioned gating of field
//!   embeddings
//! - **PNN**: the product layer feeding a DNN
//! - **Checkpoints**: JSON model specs and parameter snapshots
//!
//! # Example
//!
//! ```
//! use ctr_models::prelude::*;
//!
//! let columns: Vec<FeatureColumn> = vec![
//!     SparseFeat::new("user", 100).with_embedding_dim(8).into(),
//!     SparseFeat::new("item", 200).with_embedding_dim(8).into(),
//!     DenseFeat::new("price", 1).into(),
//! ];
//! let config = PnnConfig::default()
//!     .with_hidden_units(vec![32, 16])
//!     .with_products(true, true);
//! let mut model = PNN::new(columns, config).unwrap();
//!
//! let x = Tensor::from_data(&[2, 3], vec![1.0, 5.0, 0.3, 7.0, 9.0, 1.2]);
//! let p = model.predict(&x, 256).unwrap();
//! assert_eq!(p.shape(), &[2, 1]);
//! ```
//!
//! # Modules
//!
//! - [`feature`]: Feature column types and input layout.
//! - [`base`]: [`BaseModel`] and the [`Model`] trait.
//! - [`meta`]: The meta transformation.
//! - [`pnn`]: [`PNN`] and [`PnnConfig`].
//! - [`metrics`]: Evaluation metrics.
//! - [`checkpoint`]: Model specs and checkpoints.
//! - [`error`]: Error types for the library.

#![warn(missing_docs)]

pub mod base;
pub mod checkpoint;
pub mod error;
pub mod feature;
pub mod meta;
pub mod metrics;
pub mod pnn;

pub use base::{BaseConfig, BaseModel, Device, Model, RegularizationWeight};
pub use checkpoint::{Checkpoint, Checkpointer, JsonCheckpointer, ModelSpec, CHECKPOINT_VERSION};
pub use error::{ModelError, Result};
pub use feature::{
    build_input_features, compute_input_dim, get_feature_names, DenseFeat, FeatureColumn,
    FeatureIndex, SparseFeat, VarLenSparseFeat,
};
pub use meta::{MetaConfig, MetaTransformation, METATRANS_FLAG};
pub use metrics::Metric;
pub use pnn::{PnnConfig, PNN};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::base::{BaseModel, Model};
    pub use crate::checkpoint::{Checkpoint, Checkpointer, JsonCheckpointer, ModelSpec};
    pub use crate::error::{ModelError, Result};
    pub use crate::feature::{DenseFeat, FeatureColumn, SparseFeat, VarLenSparseFeat};
    pub use crate::metrics::Metric;
    pub use crate::pnn::{PnnConfig, PNN};
    pub use ctr_layers::{KernelType, PoolingMode, Task, Tensor};
}
