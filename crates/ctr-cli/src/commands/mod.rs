//! CLI Command Implementations
//!
//! - [`describe`]: Build a model from its spec and report its dimensions
//! - [`init`]: Write a freshly initialised checkpoint
//! - [`predict`]: Score rows of a JSON input file
//! - [`evaluate`]: Score rows and compute metrics against labels

mod describe;
mod evaluate;
mod init;
mod predict;

pub use describe::{DescribeCommand, ModelSummary};
pub use evaluate::EvaluateCommand;
pub use init::InitCommand;
pub use predict::PredictCommand;

use anyhow::{Context, Result};
use ctr_layers::Tensor;
use ctr_models::checkpoint::{Checkpointer, JsonCheckpointer, ModelSpec};
use ctr_models::{Model, PNN};
use std::path::Path;
use tracing::{info, warn};

/// Builds the model described by `spec_path`, loading parameters from
/// `checkpoint` when given.
pub(crate) fn load_model(spec_path: &Path, checkpoint: Option<&Path>) -> Result<PNN> {
    let spec = ModelSpec::from_json_file(spec_path)
        .with_context(|| format!("Failed to load model spec {:?}", spec_path))?;
    let mut model = spec.build().context("Failed to build model")?;

    if let Some(path) = checkpoint {
        let restored = JsonCheckpointer::new()
            .restore(path)
            .with_context(|| format!("Failed to restore checkpoint {:?}", path))?;
        if restored.spec != spec {
            warn!(
                checkpoint = %path.display(),
                "Checkpoint was written for a different spec"
            );
        }
        model
            .load_state_dict(&restored.state)
            .context("Checkpoint does not match the model")?;
        info!(parameters = restored.state.len(), "Loaded checkpoint parameters");
    }

    Ok(model)
}

/// Reads a JSON array of rows into a `[rows, width]` tensor.
///
/// An empty array yields `[0, width]`, so it reaches the model as an empty
/// batch of the right width.
pub(crate) fn read_rows(path: &Path, width: usize) -> Result<Tensor> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read input {:?}", path))?;
    let rows: Vec<Vec<f32>> = serde_json::from_str(&json)
        .with_context(|| format!("Input {:?} must be a JSON array of rows", path))?;
    let x = if rows.is_empty() {
        Tensor::zeros(&[0, width])
    } else {
        Tensor::from_rows(&rows).with_context(|| format!("Malformed input {:?}", path))?
    };
    info!(rows = x.shape()[0], width = x.shape()[1], "Read input rows");
    Ok(x)
}

/// Writes `value` as JSON to `output`, or to stdout when no path is given.
pub(crate) fn write_json<T: serde::Serialize>(value: &T, output: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    match output {
        Some(path) => {
            std::fs::write(path, json).with_context(|| format!("Failed to write {:?}", path))?;
            info!(path = %path.display(), "Wrote output");
        }
        None => println!("{}", json),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_rows_rejects_ragged_input() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("rows.json");
        std::fs::write(&path, "[[1, 2], [3]]").unwrap();
        assert!(read_rows(&path, 2).is_err());

        std::fs::write(&path, "[[1, 2], [3, 4]]").unwrap();
        assert_eq!(read_rows(&path, 2).unwrap().shape(), &[2, 2]);
    }

    #[test]
    fn test_read_rows_empty_keeps_width() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("rows.json");
        std::fs::write(&path, "[]").unwrap();
        assert_eq!(read_rows(&path, 5).unwrap().shape(), &[0, 5]);
    }

    #[test]
    fn test_load_model_missing_spec() {
        let tmp = tempfile::tempdir().unwrap();
        let err = load_model(&tmp.path().join("missing.json"), None).unwrap_err();
        assert!(err.to_string().contains("Failed to load model spec"));
    }
}
