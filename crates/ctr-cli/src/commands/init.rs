//! Init Command Implementation
//!
//! Writes a checkpoint holding the seeded initial parameters of a model.

use anyhow::{Context, Result};
use clap::Args;
use ctr_models::checkpoint::{Checkpoint, Checkpointer, JsonCheckpointer, ModelSpec};
use std::path::PathBuf;
use tracing::{info, warn};

/// Write a freshly initialised checkpoint
///
/// # Example
///
/// ```bash
/// ctr init --spec spec.json --output model.json
/// ```
#[derive(Args, Debug, Clone)]
pub struct InitCommand {
    /// Model spec (feature columns and hyperparameters) as JSON
    #[arg(long, short = 's', env = "CTR_SPEC")]
    pub spec: PathBuf,

    /// Checkpoint file to write
    #[arg(long, short = 'o', env = "CTR_CHECKPOINT")]
    pub output: PathBuf,

    /// Overwrite an existing checkpoint
    #[arg(long)]
    pub overwrite: bool,

    /// Pretty-print the checkpoint JSON
    #[arg(long)]
    pub pretty: bool,
}

impl InitCommand {
    /// Execute the init command
    pub fn run(&self) -> Result<()> {
        if self.output.exists() {
            if self.overwrite {
                warn!("Output path exists, overwriting: {:?}", self.output);
            } else {
                anyhow::bail!(
                    "Output path already exists: {:?}. Use --overwrite to replace.",
                    self.output
                );
            }
        }

        let spec = ModelSpec::from_json_file(&self.spec)
            .with_context(|| format!("Failed to load model spec {:?}", self.spec))?;
        let model = spec.build().context("Failed to build model")?;
        let checkpoint = Checkpoint::from_model(spec, &model);

        let checkpointer = JsonCheckpointer {
            pretty: self.pretty,
        };
        checkpointer
            .save(&self.output, &checkpoint)
            .context("Failed to write checkpoint")?;

        info!("Checkpoint written to: {:?}", self.output);
        Ok(())
    }
}
