//! Predict Command Implementation

use anyhow::{Context, Result};
use clap::Args;
use ctr_models::Model;
use std::path::PathBuf;
use tracing::info;

use super::{load_model, read_rows, write_json};

/// Score the rows of a JSON input file
///
/// The input is a JSON array of rows laid out like the spec's feature
/// columns. Predictions are written as a JSON array, one value per row.
///
/// # Example
///
/// ```bash
/// ctr predict --spec spec.json --checkpoint model.json --input rows.json
/// ```
#[derive(Args, Debug, Clone)]
pub struct PredictCommand {
    /// Model spec (feature columns and hyperparameters) as JSON
    #[arg(long, short = 's', env = "CTR_SPEC")]
    pub spec: PathBuf,

    /// Checkpoint to load parameters from; seeded weights otherwise
    #[arg(long, short = 'c', env = "CTR_CHECKPOINT")]
    pub checkpoint: Option<PathBuf>,

    /// JSON array of input rows
    #[arg(long, short = 'i')]
    pub input: PathBuf,

    /// Rows per prediction batch
    #[arg(long, default_value = "256", env = "CTR_BATCH_SIZE")]
    pub batch_size: usize,

    /// Where to write predictions; stdout when omitted
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,
}

impl PredictCommand {
    /// Computes one prediction per input row.
    pub fn predictions(&self) -> Result<Vec<f32>> {
        let mut model = load_model(&self.spec, self.checkpoint.as_deref())?;
        let x = read_rows(&self.input, model.base().feature_index().width())?;
        let pred = model
            .predict(&x, self.batch_size)
            .context("Prediction failed")?;
        Ok(pred.into_data())
    }

    /// Execute the predict command
    pub fn run(&self) -> Result<()> {
        let predictions = self.predictions()?;
        info!(rows = predictions.len(), "Prediction finished");
        write_json(&predictions, self.output.as_deref())
    }
}
