//! Model specs and JSON checkpoints.
//!
//! A [`ModelSpec`] describes a model: its feature columns and its
//! [`PnnConfig`]. A [`Checkpoint`] pairs a spec with every parameter
//! tensor, so a checkpoint alone is enough to rebuild a trained model.
//!
//! ```no_run
//! use ctr_models::checkpoint::{Checkpoint, Checkpointer, JsonCheckpointer, ModelSpec};
//! use std::path::Path;
//!
//! fn main() -> ctr_models::Result<()> {
//!     let spec = ModelSpec::from_json_file(Path::new("spec.json"))?;
//!     let model = spec.build()?;
//!
//!     let checkpointer = JsonCheckpointer::pretty();
//!     checkpointer.save(Path::new("model.json"), &Checkpoint::from_model(spec, &model))?;
//!
//!     let restored = checkpointer.restore(Path::new("model.json"))?.into_model()?;
//!     Ok(())
//! }
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use ctr_layers::Tensor;
use serde::{Deserialize, Serialize};

use crate::base::Model;
use crate::error::{ModelError, Result};
use crate::feature::FeatureColumn;
use crate::pnn::{PnnConfig, PNN};

/// Version written into every checkpoint.
pub const CHECKPOINT_VERSION: u32 = 1;

/// Feature columns plus model hyperparameters.
///
/// ```
/// use ctr_models::checkpoint::ModelSpec;
///
/// let spec: ModelSpec = serde_json::from_str(r#"{
///     "feature_columns": [
///         {"type": "sparse", "name": "user", "vocabulary_size": 100},
///         {"type": "sparse", "name": "item", "vocabulary_size": 50, "embedding_dim": 4},
///         {"type": "dense", "name": "price"}
///     ],
///     "model": {"dnn_hidden_units": [16, 8], "use_outter": true}
/// }"#).unwrap();
/// assert_eq!(spec.feature_columns.len(), 3);
/// assert!(spec.model.use_outer);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSpec {
    /// Columns in input order
    pub feature_columns: Vec<FeatureColumn>,
    /// Model hyperparameters
    #[serde(default)]
    pub model: PnnConfig,
}

impl ModelSpec {
    /// Creates a spec.
    pub fn new(feature_columns: Vec<FeatureColumn>, model: PnnConfig) -> Self {
        Self {
            feature_columns,
            model,
        }
    }

    /// Parses a spec from JSON text.
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(ModelError::Serialization)
    }

    /// Reads a spec from a JSON file.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| ModelError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let spec = Self::from_json_str(&json)?;
        tracing::debug!(
            path = %path.display(),
            columns = spec.feature_columns.len(),
            "Loaded model spec"
        );
        Ok(spec)
    }

    /// Builds a freshly initialised model.
    pub fn build(&self) -> Result<PNN> {
        PNN::new(self.feature_columns.clone(), self.model.clone())
    }
}

/// A versioned spec together with its parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Format version
    pub version: u32,
    /// The model description
    pub spec: ModelSpec,
    /// Parameters by name
    pub state: BTreeMap<String, Tensor>,
}

impl Checkpoint {
    /// Captures the parameters of `model`.
    pub fn from_model(spec: ModelSpec, model: &impl Model) -> Self {
        Self {
            version: CHECKPOINT_VERSION,
            spec,
            state: model.state_dict(),
        }
    }

    /// Rebuilds the model described by the spec and loads the parameters.
    ///
    /// # Errors
    ///
    /// Returns an error if the version is unknown, the spec does not build,
    /// or the state does not match the model
    pub fn into_model(self) -> Result<PNN> {
        self.check_version()?;
        let mut model = self.spec.build()?;
        model.load_state_dict(&self.state)?;
        Ok(model)
    }

    fn check_version(&self) -> Result<()> {
        if self.version != CHECKPOINT_VERSION {
            return Err(ModelError::VersionMismatch {
                expected: CHECKPOINT_VERSION,
                found: self.version,
            });
        }
        Ok(())
    }
}

/// Saves and restores checkpoints.
pub trait Checkpointer: Send + Sync {
    /// Writes `checkpoint` to `path`, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or I/O fails.
    fn save(&self, path: &Path, checkpoint: &Checkpoint) -> Result<()>;

    /// Reads a checkpoint from `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing or corrupted, or if it was
    /// written with another format version.
    fn restore(&self, path: &Path) -> Result<Checkpoint>;
}

/// JSON checkpoint files.
#[derive(Debug, Clone, Default)]
pub struct JsonCheckpointer {
    /// Whether to pretty-print JSON output.
    pub pretty: bool,
}

impl JsonCheckpointer {
    /// Create a new JSON checkpointer.
    pub fn new() -> Self {
        Self { pretty: false }
    }

    /// Create a new JSON checkpointer with pretty printing.
    pub fn pretty() -> Self {
        Self { pretty: true }
    }
}

impl Checkpointer for JsonCheckpointer {
    fn save(&self, path: &Path, checkpoint: &Checkpoint) -> Result<()> {
        tracing::info!(
            path = %path.display(),
            parameters = checkpoint.state.len(),
            "Saving checkpoint"
        );

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| ModelError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let json = if self.pretty {
            serde_json::to_string_pretty(checkpoint)
        } else {
            serde_json::to_string(checkpoint)
        }
        .map_err(ModelError::Serialization)?;

        std::fs::write(path, json).map_err(|e| ModelError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        tracing::debug!(
            path = %path.display(),
            size = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0),
            "Checkpoint saved"
        );
        Ok(())
    }

    fn restore(&self, path: &Path) -> Result<Checkpoint> {
        tracing::info!(path = %path.display(), "Restoring checkpoint");

        let json = std::fs::read_to_string(path).map_err(|e| ModelError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let checkpoint: Checkpoint =
            serde_json::from_str(&json).map_err(ModelError::Serialization)?;
        checkpoint.check_version()?;

        tracing::info!(
            path = %path.display(),
            version = checkpoint.version,
            parameters = checkpoint.state.len(),
            "Checkpoint restored"
        );
        Ok(checkpoint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::{DenseFeat, SparseFeat};
    use tempfile::tempdir;

    fn spec() -> ModelSpec {
        ModelSpec::new(
            vec![
                SparseFeat::new("user", 8).into(),
                SparseFeat::new("item", 8).into(),
                DenseFeat::new("price", 1).into(),
            ],
            PnnConfig::default().with_hidden_units(vec![4]),
        )
    }

    #[test]
    fn test_save_restore() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("ckpt.json");

        let spec = spec();
        let model = spec.build().unwrap();
        let checkpoint = Checkpoint::from_model(spec, &model);

        let checkpointer = JsonCheckpointer::pretty();
        checkpointer.save(&path, &checkpoint).unwrap();
        let restored = checkpointer.restore(&path).unwrap();
        assert_eq!(restored, checkpoint);
    }

    #[test]
    fn test_restore_missing_file() {
        let dir = tempdir().unwrap();
        let err = JsonCheckpointer::new()
            .restore(&dir.path().join("missing.json"))
            .unwrap_err();
        assert!(matches!(err, ModelError::Io { .. }));
    }

    #[test]
    fn test_version_mismatch() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("old.json");
        let spec = spec();
        let model = spec.build().unwrap();
        let mut checkpoint = Checkpoint::from_model(spec, &model);
        checkpoint.version = 0;

        let checkpointer = JsonCheckpointer::new();
        checkpointer.save(&path, &checkpoint).unwrap();
        let err = checkpointer.restore(&path).unwrap_err();
        assert!(matches!(
            err,
            ModelError::VersionMismatch {
                expected: 1,
                found: 0
            }
        ));
        assert!(checkpoint.into_model().is_err());
    }

    #[test]
    fn test_corrupted_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{not json").unwrap();
        let err = JsonCheckpointer::new().restore(&path).unwrap_err();
        assert!(matches!(err, ModelError::Serialization(_)));
    }

    #[test]
    fn test_spec_rejects_invalid_kernel() {
        let json = r#"{
            "feature_columns": [{"type": "sparse", "name": "a", "vocabulary_size": 3}],
            "model": {"kernel_type": "diag"}
        }"#;
        assert!(ModelSpec::from_json_str(json).is_err());
    }
}
