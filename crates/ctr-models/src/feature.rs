//! Feature columns and the input layout they induce.
//!
//! A model is described by a list of [`FeatureColumn`]s. Every column owns a
//! contiguous range of columns in the `[batch, width]` input matrix; the
//! mapping is computed by [`build_input_features`] and recorded in a
//! [`FeatureIndex`].
//!
//! # Overview
//!
//! - [`SparseFeat`]: a categorical id looked up in an embedding table.
//! - [`DenseFeat`]: one or more continuous values fed straight to the DNN.
//! - [`VarLenSparseFeat`]: a padded id sequence pooled to one embedding.

use std::ops::Range;

use ctr_layers::PoolingMode;
use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};

const DEFAULT_GROUP_NAME: &str = "default_group";

fn default_embedding_dim() -> usize {
    4
}

fn default_group_name() -> String {
    DEFAULT_GROUP_NAME.to_string()
}

fn default_dimension() -> usize {
    1
}

/// Embedding dimension as written in a feature definition: a number or
/// `"auto"`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
enum EmbeddingDimDef {
    Fixed(usize),
    Named(String),
}

impl Default for EmbeddingDimDef {
    fn default() -> Self {
        EmbeddingDimDef::Fixed(default_embedding_dim())
    }
}

#[derive(Debug, Clone, Deserialize)]
struct SparseFeatDef {
    name: String,
    vocabulary_size: usize,
    #[serde(default)]
    embedding_dim: EmbeddingDimDef,
    #[serde(default)]
    embedding_name: Option<String>,
    #[serde(default = "default_group_name")]
    group_name: String,
}

/// A categorical feature occupying one input column.
///
/// # Examples
///
/// ```
/// use ctr_models::feature::SparseFeat;
///
/// let feat = SparseFeat::new("user_id", 100).with_embedding_dim(8);
/// assert_eq!(feat.embedding_name(), "user_id");
/// assert_eq!(feat.embedding_dim(), 8);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SparseFeatDef")]
pub struct SparseFeat {
    name: String,
    vocabulary_size: usize,
    embedding_dim: usize,
    embedding_name: String,
    group_name: String,
}

impl SparseFeat {
    /// Creates a sparse feature with the default embedding dimension (4).
    pub fn new(name: impl Into<String>, vocabulary_size: usize) -> Self {
        let name = name.into();
        Self {
            embedding_name: name.clone(),
            name,
            vocabulary_size,
            embedding_dim: default_embedding_dim(),
            group_name: default_group_name(),
        }
    }

    /// Creates a sparse feature whose embedding dimension is derived from
    /// the vocabulary size as `6 * vocabulary_size^0.25`.
    pub fn with_auto_dim(name: impl Into<String>, vocabulary_size: usize) -> Self {
        let dim = auto_embedding_dim(vocabulary_size);
        Self::new(name, vocabulary_size).with_embedding_dim(dim)
    }

    /// Sets the embedding dimension.
    pub fn with_embedding_dim(mut self, embedding_dim: usize) -> Self {
        self.embedding_dim = embedding_dim;
        self
    }

    /// Shares the embedding table registered under `embedding_name`.
    pub fn with_embedding_name(mut self, embedding_name: impl Into<String>) -> Self {
        self.embedding_name = embedding_name.into();
        self
    }

    /// Sets the group name.
    pub fn with_group_name(mut self, group_name: impl Into<String>) -> Self {
        self.group_name = group_name.into();
        self
    }

    /// Returns the feature name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the vocabulary size.
    pub fn vocabulary_size(&self) -> usize {
        self.vocabulary_size
    }

    /// Returns the embedding dimension.
    pub fn embedding_dim(&self) -> usize {
        self.embedding_dim
    }

    /// Returns the name of the embedding table this feature reads.
    pub fn embedding_name(&self) -> &str {
        &self.embedding_name
    }

    /// Returns the group name.
    pub fn group_name(&self) -> &str {
        &self.group_name
    }
}

impl TryFrom<SparseFeatDef> for SparseFeat {
    type Error = ModelError;

    fn try_from(def: SparseFeatDef) -> Result<Self> {
        let embedding_dim = match def.embedding_dim {
            EmbeddingDimDef::Fixed(dim) => dim,
            EmbeddingDimDef::Named(s) if s == "auto" => auto_embedding_dim(def.vocabulary_size),
            EmbeddingDimDef::Named(s) => {
                return Err(ModelError::config(format!(
                    "embedding_dim must be a number or \"auto\", got '{}'",
                    s
                )))
            }
        };
        Ok(Self {
            embedding_name: def.embedding_name.unwrap_or_else(|| def.name.clone()),
            name: def.name,
            vocabulary_size: def.vocabulary_size,
            embedding_dim,
            group_name: def.group_name,
        })
    }
}

fn auto_embedding_dim(vocabulary_size: usize) -> usize {
    (6.0 * (vocabulary_size as f64).powf(0.25)) as usize
}

/// A padded sequence of categorical ids pooled into one embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarLenSparseFeat {
    /// The underlying sparse feature (name, vocabulary, embedding)
    pub sparsefeat: SparseFeat,
    /// Number of id columns
    pub maxlen: usize,
    /// Pooling applied over the valid positions
    #[serde(default)]
    pub combiner: PoolingMode,
    /// Optional column holding the sequence length
    #[serde(default)]
    pub length_name: Option<String>,
}

impl VarLenSparseFeat {
    /// Creates a sequence feature with mean pooling and no length column.
    pub fn new(sparsefeat: SparseFeat, maxlen: usize) -> Self {
        Self {
            sparsefeat,
            maxlen,
            combiner: PoolingMode::default(),
            length_name: None,
        }
    }

    /// Sets the pooling mode.
    pub fn with_combiner(mut self, combiner: PoolingMode) -> Self {
        self.combiner = combiner;
        self
    }

    /// Reads the valid length from the named column.
    pub fn with_length_name(mut self, length_name: impl Into<String>) -> Self {
        self.length_name = Some(length_name.into());
        self
    }

    /// Returns the feature name.
    pub fn name(&self) -> &str {
        self.sparsefeat.name()
    }

    /// Returns the embedding dimension.
    pub fn embedding_dim(&self) -> usize {
        self.sparsefeat.embedding_dim()
    }

    /// Returns the name of the embedding table this feature reads.
    pub fn embedding_name(&self) -> &str {
        self.sparsefeat.embedding_name()
    }
}

/// A continuous feature occupying `dimension` input columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseFeat {
    /// The feature name
    pub name: String,
    /// Number of values
    #[serde(default = "default_dimension")]
    pub dimension: usize,
}

impl DenseFeat {
    /// Creates a dense feature.
    pub fn new(name: impl Into<String>, dimension: usize) -> Self {
        Self {
            name: name.into(),
            dimension,
        }
    }
}

/// Any feature column, tagged by `"type"` in JSON.
///
/// ```
/// use ctr_models::feature::FeatureColumn;
///
/// let json = r#"[
///     {"type": "sparse", "name": "item", "vocabulary_size": 50, "embedding_dim": 8},
///     {"type": "dense", "name": "price"}
/// ]"#;
/// let columns: Vec<FeatureColumn> = serde_json::from_str(json).unwrap();
/// assert_eq!(columns[0].name(), "item");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FeatureColumn {
    /// See [`SparseFeat`].
    Sparse(SparseFeat),
    /// See [`DenseFeat`].
    Dense(DenseFeat),
    /// See [`VarLenSparseFeat`].
    #[serde(rename = "varlen_sparse")]
    VarLenSparse(VarLenSparseFeat),
}

impl FeatureColumn {
    /// Returns the column name.
    pub fn name(&self) -> &str {
        match self {
            FeatureColumn::Sparse(f) => f.name(),
            FeatureColumn::Dense(f) => &f.name,
            FeatureColumn::VarLenSparse(f) => f.name(),
        }
    }

    /// Returns the embedding dimension of sparse and sequence columns.
    pub fn embedding_dim(&self) -> Option<usize> {
        match self {
            FeatureColumn::Sparse(f) => Some(f.embedding_dim()),
            FeatureColumn::VarLenSparse(f) => Some(f.embedding_dim()),
            FeatureColumn::Dense(_) => None,
        }
    }
}

impl From<SparseFeat> for FeatureColumn {
    fn from(value: SparseFeat) -> Self {
        FeatureColumn::Sparse(value)
    }
}

impl From<DenseFeat> for FeatureColumn {
    fn from(value: DenseFeat) -> Self {
        FeatureColumn::Dense(value)
    }
}

impl From<VarLenSparseFeat> for FeatureColumn {
    fn from(value: VarLenSparseFeat) -> Self {
        FeatureColumn::VarLenSparse(value)
    }
}

/// Ordered map from feature name to its column range in the input matrix.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeatureIndex {
    entries: Vec<(String, Range<usize>)>,
}

impl FeatureIndex {
    fn insert(&mut self, name: &str, range: Range<usize>) {
        self.entries.push((name.to_string(), range));
    }

    /// Returns whether `name` has a column range.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(n, _)| n == name)
    }

    /// Returns the column range of `name`.
    pub fn get(&self, name: &str) -> Option<Range<usize>> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, r)| r.clone())
    }

    /// Returns the column range of `name` or an [`ModelError::UnknownFeature`].
    pub fn range(&self, name: &str) -> Result<Range<usize>> {
        self.get(name).ok_or_else(|| ModelError::UnknownFeature {
            name: name.to_string(),
        })
    }

    /// Total number of input columns.
    pub fn width(&self) -> usize {
        self.entries.iter().map(|(_, r)| r.end).max().unwrap_or(0)
    }

    /// Feature names in column order.
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|(n, _)| n.as_str()).collect()
    }

    /// Iterates over `(name, range)` in column order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Range<usize>)> {
        self.entries.iter().map(|(n, r)| (n.as_str(), r.clone()))
    }
}

/// Assigns every feature column a contiguous range of input columns.
///
/// Sparse features take one column, dense features `dimension` columns and
/// sequence features `maxlen` columns followed by a length column when
/// `length_name` is set. A name seen twice keeps its first range.
pub fn build_input_features(feature_columns: &[FeatureColumn]) -> FeatureIndex {
    let mut index = FeatureIndex::default();
    let mut start = 0;
    for column in feature_columns {
        let name = column.name();
        if index.contains(name) {
            continue;
        }
        match column {
            FeatureColumn::Sparse(_) => {
                index.insert(name, start..start + 1);
                start += 1;
            }
            FeatureColumn::Dense(f) => {
                index.insert(name, start..start + f.dimension);
                start += f.dimension;
            }
            FeatureColumn::VarLenSparse(f) => {
                index.insert(name, start..start + f.maxlen);
                start += f.maxlen;
                if let Some(length_name) = &f.length_name {
                    if !index.contains(length_name) {
                        index.insert(length_name, start..start + 1);
                        start += 1;
                    }
                }
            }
        }
    }
    index
}

/// Returns the input names in column order.
pub fn get_feature_names(feature_columns: &[FeatureColumn]) -> Vec<String> {
    build_input_features(feature_columns)
        .names()
        .into_iter()
        .map(String::from)
        .collect()
}

/// Width of the DNN input contributed by `feature_columns`.
///
/// The sparse part counts one slot per sparse or sequence column when
/// `feature_group` is set and the sum of their embedding dimensions
/// otherwise; the dense part is the sum of dense dimensions.
pub fn compute_input_dim(
    feature_columns: &[FeatureColumn],
    include_sparse: bool,
    include_dense: bool,
    feature_group: bool,
) -> usize {
    let mut sparse_dim = 0;
    let mut dense_dim = 0;
    for column in feature_columns {
        match column {
            FeatureColumn::Dense(f) => dense_dim += f.dimension,
            FeatureColumn::Sparse(_) | FeatureColumn::VarLenSparse(_) => {
                sparse_dim += if feature_group {
                    1
                } else {
                    column.embedding_dim().unwrap_or(0)
                };
            }
        }
    }

    let mut input_dim = 0;
    if include_sparse {
        input_dim += sparse_dim;
    }
    if include_dense {
        input_dim += dense_dim;
    }
    input_dim
}

/// Sparse feature columns, in order.
pub fn sparse_columns(feature_columns: &[FeatureColumn]) -> Vec<&SparseFeat> {
    feature_columns
        .iter()
        .filter_map(|c| match c {
            FeatureColumn::Sparse(f) => Some(f),
            _ => None,
        })
        .collect()
}

/// Dense feature columns, in order.
pub fn dense_columns(feature_columns: &[FeatureColumn]) -> Vec<&DenseFeat> {
    feature_columns
        .iter()
        .filter_map(|c| match c {
            FeatureColumn::Dense(f) => Some(f),
            _ => None,
        })
        .collect()
}

/// Sequence feature columns, in order.
pub fn varlen_columns(feature_columns: &[FeatureColumn]) -> Vec<&VarLenSparseFeat> {
    feature_columns
        .iter()
        .filter_map(|c| match c {
            FeatureColumn::VarLenSparse(f) => Some(f),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn columns() -> Vec<FeatureColumn> {
        vec![
            SparseFeat::new("user", 10).into(),
            DenseFeat::new("price", 2).into(),
            VarLenSparseFeat::new(SparseFeat::new("hist", 10).with_embedding_name("user"), 3)
                .with_length_name("hist_len")
                .into(),
            SparseFeat::new("item", 5).into(),
        ]
    }

    #[test]
    fn test_sparse_defaults() {
        let feat = SparseFeat::new("user", 10);
        assert_eq!(feat.embedding_dim(), 4);
        assert_eq!(feat.embedding_name(), "user");
        assert_eq!(feat.group_name(), "default_group");
    }

    #[test]
    fn test_auto_dim() {
        // 6 * 1000^0.25 = 33.7, 6 * 100^0.25 = 18.97
        assert_eq!(SparseFeat::with_auto_dim("user", 1000).embedding_dim(), 33);
        assert_eq!(SparseFeat::with_auto_dim("user", 100).embedding_dim(), 18);
    }

    #[test]
    fn test_build_input_features() {
        let index = build_input_features(&columns());
        assert_eq!(index.get("user"), Some(0..1));
        assert_eq!(index.get("price"), Some(1..3));
        assert_eq!(index.get("hist"), Some(3..6));
        assert_eq!(index.get("hist_len"), Some(6..7));
        assert_eq!(index.get("item"), Some(7..8));
        assert_eq!(index.width(), 8);
        assert!(index.range("missing").is_err());
    }

    #[test]
    fn test_duplicate_names_keep_first_range() {
        let cols: Vec<FeatureColumn> = vec![
            SparseFeat::new("user", 10).into(),
            SparseFeat::new("user", 10).into(),
        ];
        let index = build_input_features(&cols);
        assert_eq!(index.width(), 1);
        assert_eq!(get_feature_names(&cols), vec!["user".to_string()]);
    }

    #[test]
    fn test_compute_input_dim() {
        let cols = columns();
        assert_eq!(compute_input_dim(&cols, true, false, true), 3);
        assert_eq!(compute_input_dim(&cols, true, true, false), 14);
        assert_eq!(compute_input_dim(&cols, false, true, false), 2);
    }

    #[test]
    fn test_column_filters() {
        let cols = columns();
        assert_eq!(sparse_columns(&cols).len(), 2);
        assert_eq!(dense_columns(&cols).len(), 1);
        assert_eq!(varlen_columns(&cols)[0].embedding_name(), "user");
    }

    #[test]
    fn test_json_columns() {
        let json = r#"[
            {"type": "sparse", "name": "user", "vocabulary_size": 1000, "embedding_dim": "auto"},
            {"type": "dense", "name": "price"},
            {"type": "varlen_sparse", "sparsefeat": {"name": "hist", "vocabulary_size": 10},
             "maxlen": 4, "combiner": "sum"}
        ]"#;
        let cols: Vec<FeatureColumn> = serde_json::from_str(json).unwrap();
        assert_eq!(cols[0].embedding_dim(), Some(33));
        match &cols[1] {
            FeatureColumn::Dense(f) => assert_eq!(f.dimension, 1),
            other => panic!("unexpected column {:?}", other),
        }
        match &cols[2] {
            FeatureColumn::VarLenSparse(f) => {
                assert_eq!(f.combiner, PoolingMode::Sum);
                assert_eq!(f.maxlen, 4);
            }
            other => panic!("unexpected column {:?}", other),
        }

        let back: Vec<FeatureColumn> =
            serde_json::from_str(&serde_json::to_string(&cols).unwrap()).unwrap();
        assert_eq!(back, cols);
    }

    #[test]
    fn test_json_rejects_bad_embedding_dim() {
        let json = r#"{"type": "sparse", "name": "u", "vocabulary_size": 3, "embedding_dim": "big"}"#;
        assert!(serde_json::from_str::<FeatureColumn>(json).is_err());
    }
}
