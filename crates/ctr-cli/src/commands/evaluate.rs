//! Evaluate Command Implementation

use anyhow::{Context, Result};
use clap::Args;
use ctr_models::Model;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::info;

use super::{load_model, read_rows, write_json};

/// Score input rows and compute metrics against labels
///
/// # Example
///
/// ```bash
/// ctr evaluate --spec spec.json --checkpoint model.json \
///     --input rows.json --labels labels.json --metrics auc,logloss
/// ```
#[derive(Args, Debug, Clone)]
pub struct EvaluateCommand {
    /// Model spec (feature columns and hyperparameters) as JSON
    #[arg(long, short = 's', env = "CTR_SPEC")]
    pub spec: PathBuf,

    /// Checkpoint to load parameters from; seeded weights otherwise
    #[arg(long, short = 'c', env = "CTR_CHECKPOINT")]
    pub checkpoint: Option<PathBuf>,

    /// JSON array of input rows
    #[arg(long, short = 'i')]
    pub input: PathBuf,

    /// JSON array of labels, one per row
    #[arg(long, short = 'l')]
    pub labels: PathBuf,

    /// Metrics to compute
    #[arg(long, value_delimiter = ',', default_value = "auc,logloss")]
    pub metrics: Vec<String>,

    /// Rows per prediction batch
    #[arg(long, default_value = "256", env = "CTR_BATCH_SIZE")]
    pub batch_size: usize,
}

impl EvaluateCommand {
    /// Computes every requested metric.
    pub fn scores(&self) -> Result<BTreeMap<String, f64>> {
        let mut model = load_model(&self.spec, self.checkpoint.as_deref())?;
        let x = read_rows(&self.input, model.base().feature_index().width())?;

        let json = std::fs::read_to_string(&self.labels)
            .with_context(|| format!("Failed to read labels {:?}", self.labels))?;
        let labels: Vec<f32> = serde_json::from_str(&json)
            .with_context(|| format!("Labels {:?} must be a JSON array of numbers", self.labels))?;

        model
            .evaluate(&x, &labels, self.batch_size, &self.metrics)
            .context("Evaluation failed")
    }

    /// Execute the evaluate command
    pub fn run(&self) -> Result<()> {
        let scores = self.scores()?;
        for (name, value) in &scores {
            info!(metric = %name, value, "Evaluation result");
        }
        write_json(&scores, None)
    }
}
