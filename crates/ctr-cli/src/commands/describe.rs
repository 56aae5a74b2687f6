//! Describe Command Implementation

use anyhow::Result;
use clap::Args;
use ctr_models::Model;
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;

use super::{load_model, write_json};

/// Build a model from its spec and report its dimensions
///
/// # Example
///
/// ```bash
/// ctr describe --spec /path/to/spec.json
/// ```
#[derive(Args, Debug, Clone)]
pub struct DescribeCommand {
    /// Model spec (feature columns and hyperparameters) as JSON
    #[arg(long, short = 's', env = "CTR_SPEC")]
    pub spec: PathBuf,

    /// Checkpoint whose parameters are used for the regularisation loss
    #[arg(long, short = 'c', env = "CTR_CHECKPOINT")]
    pub checkpoint: Option<PathBuf>,
}

/// Dimensions of a built model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelSummary {
    /// Number of input columns
    pub input_width: usize,
    /// Sparse and sequence fields
    pub fields: usize,
    /// Field pairs
    pub pairs: usize,
    /// Width of the inner and outer product signals
    pub product_out_dim: usize,
    /// Width of the DNN input
    pub dnn_input_dim: usize,
    /// Scalar parameters
    pub parameters: usize,
    /// Current regularisation loss
    pub regularization_loss: f32,
}

impl DescribeCommand {
    /// Builds the model and collects its summary.
    pub fn summarize(&self) -> Result<ModelSummary> {
        let model = load_model(&self.spec, self.checkpoint.as_deref())?;
        Ok(ModelSummary {
            input_width: model.base().feature_index().width(),
            fields: model.num_inputs(),
            pairs: model.num_pairs(),
            product_out_dim: model.product_out_dim(),
            dnn_input_dim: model.dnn_input_dim(),
            parameters: model.num_parameters(),
            regularization_loss: model.regularization_loss()?,
        })
    }

    /// Execute the describe command
    pub fn run(&self) -> Result<()> {
        let summary = self.summarize()?;
        info!(
            input_width = summary.input_width,
            fields = summary.fields,
            pairs = summary.pairs,
            product_out_dim = summary.product_out_dim,
            dnn_input_dim = summary.dnn_input_dim,
            parameters = summary.parameters,
            regularization_loss = summary.regularization_loss,
            "Model summary"
        );
        write_json(&summary, None)
    }
}
