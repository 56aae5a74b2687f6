//! Embedding tables and sequence pooling.
//!
//! This module provides [`EmbeddingTable`], a dense `[vocabulary_size, dim]`
//! lookup table for categorical ids, [`EmbeddingDict`], the ordered set of
//! tables a model owns, and [`SequencePooling`], which reduces a padded
//! sequence of embeddings to one vector per sample.

use std::fmt;
use std::str::FromStr;

use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::error::LayerError;
use crate::layer::Layer;
use crate::tensor::Tensor;

/// A dense embedding table.
///
/// # Example
///
/// ```
/// use ctr_layers::embedding::EmbeddingTable;
/// use rand::SeedableRng;
///
/// let mut rng = rand::rngs::StdRng::seed_from_u64(0);
/// let table = EmbeddingTable::new(10, 4, 1e-4, &mut rng);
/// let out = table.lookup(&[1, 2, 1]).unwrap();
/// assert_eq!(out.shape(), &[3, 4]);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingTable {
    /// Number of distinct ids
    vocabulary_size: usize,
    /// Embedding dimension
    dim: usize,
    /// Weight matrix of shape [vocabulary_size, dim]
    weight: Tensor,
}

impl EmbeddingTable {
    /// Creates a table with weights drawn from `N(0, init_std)`.
    pub fn new(vocabulary_size: usize, dim: usize, init_std: f32, rng: &mut StdRng) -> Self {
        Self {
            vocabulary_size,
            dim,
            weight: Tensor::randn(&[vocabulary_size, dim], 0.0, init_std, rng),
        }
    }

    /// Creates a table from an existing weight matrix.
    ///
    /// # Errors
    ///
    /// Returns an error if `weight` is not 2D
    pub fn from_weight(weight: Tensor) -> Result<Self, LayerError> {
        if weight.ndim() != 2 {
            return Err(LayerError::EmbeddingError {
                message: format!("embedding weight must be 2D, got {:?}", weight.shape()),
            });
        }
        Ok(Self {
            vocabulary_size: weight.shape()[0],
            dim: weight.shape()[1],
            weight,
        })
    }

    /// Returns the vocabulary size.
    pub fn vocabulary_size(&self) -> usize {
        self.vocabulary_size
    }

    /// Returns the embedding dimension.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Returns the weight matrix.
    pub fn weight(&self) -> &Tensor {
        &self.weight
    }

    /// Looks up embeddings for `ids`, returning `[ids.len(), dim]`.
    ///
    /// # Errors
    ///
    /// Returns an [`LayerError::EmbeddingError`] for ids outside the vocabulary
    pub fn lookup(&self, ids: &[usize]) -> Result<Tensor, LayerError> {
        if let Some(&bad) = ids.iter().find(|&&id| id >= self.vocabulary_size) {
            return Err(LayerError::EmbeddingError {
                message: format!(
                    "id {} out of range for vocabulary of size {}",
                    bad, self.vocabulary_size
                ),
            });
        }
        self.weight.select_rows(ids)
    }
}

/// Converts a float-encoded id to an index.
///
/// Ids arrive inside the `f32` input matrix, so they are truncated the way an
/// integer cast would; negative and non-finite values are rejected.
pub fn id_from_value(value: f32) -> Result<usize, LayerError> {
    if !value.is_finite() || value < 0.0 {
        return Err(LayerError::EmbeddingError {
            message: format!("invalid id value {}", value),
        });
    }
    Ok(value as usize)
}

impl Layer for EmbeddingTable {
    /// Looks up every element of an id tensor, appending the embedding axis.
    fn forward(&self, input: &Tensor) -> Result<Tensor, LayerError> {
        let ids = input
            .data()
            .iter()
            .map(|&v| id_from_value(v))
            .collect::<Result<Vec<_>, _>>()?;
        let rows = self.lookup(&ids)?;
        let mut shape = input.shape().to_vec();
        shape.push(self.dim);
        Ok(rows.reshape(&shape))
    }

    fn parameters(&self) -> Vec<&Tensor> {
        vec![&self.weight]
    }

    fn parameters_mut(&mut self) -> Vec<&mut Tensor> {
        vec![&mut self.weight]
    }

    fn named_parameters(&self) -> Vec<(String, &Tensor)> {
        vec![("weight".to_string(), &self.weight)]
    }

    fn name(&self) -> &str {
        "Embedding"
    }
}

/// Embedding tables keyed by embedding name, in insertion order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EmbeddingDict {
    tables: Vec<(String, EmbeddingTable)>,
}

impl EmbeddingDict {
    /// Creates an empty dictionary.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a table. Returns `false` (and keeps the existing table) when
    /// the name is already present.
    pub fn insert(&mut self, name: impl Into<String>, table: EmbeddingTable) -> bool {
        let name = name.into();
        if self.contains(&name) {
            return false;
        }
        self.tables.push((name, table));
        true
    }

    /// Returns whether a table with this name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.tables.iter().any(|(n, _)| n == name)
    }

    /// Returns the table registered under `name`.
    pub fn get(&self, name: &str) -> Option<&EmbeddingTable> {
        self.tables.iter().find(|(n, _)| n == name).map(|(_, t)| t)
    }

    /// Returns the number of tables.
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Returns true if there are no tables.
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Iterates over `(name, table)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &EmbeddingTable)> {
        self.tables.iter().map(|(n, t)| (n.as_str(), t))
    }

    /// Parameters named `{embedding_name}.weight`.
    pub fn named_parameters(&self) -> Vec<(String, &Tensor)> {
        self.tables
            .iter()
            .map(|(n, t)| (format!("{}.weight", n), t.weight()))
            .collect()
    }

    /// Mutable parameters in the same order as [`EmbeddingDict::named_parameters`].
    pub fn parameters_mut(&mut self) -> Vec<&mut Tensor> {
        self.tables.iter_mut().map(|(_, t)| &mut t.weight).collect()
    }
}

/// Reduction applied over a sequence of embeddings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum PoolingMode {
    /// Sum of valid positions
    Sum,
    /// Mean of valid positions
    #[default]
    Mean,
    /// Element-wise max of valid positions
    Max,
}

impl PoolingMode {
    /// Returns the lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            PoolingMode::Sum => "sum",
            PoolingMode::Mean => "mean",
            PoolingMode::Max => "max",
        }
    }
}

impl fmt::Display for PoolingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PoolingMode {
    type Err = LayerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sum" => Ok(PoolingMode::Sum),
            "mean" => Ok(PoolingMode::Mean),
            "max" => Ok(PoolingMode::Max),
            other => Err(LayerError::config(format!(
                "combiner must be sum, mean or max, got '{}'",
                other
            ))),
        }
    }
}

impl TryFrom<String> for PoolingMode {
    type Error = LayerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PoolingMode> for String {
    fn from(value: PoolingMode) -> Self {
        value.as_str().to_string()
    }
}

/// Masked pooling of `[B, L, E]` sequence embeddings to `[B, 1, E]`.
///
/// ```
/// use ctr_layers::embedding::{PoolingMode, SequencePooling};
/// use ctr_layers::tensor::Tensor;
///
/// let pooling = SequencePooling::new(PoolingMode::Sum);
/// let seq = Tensor::ones(&[2, 3, 4]);
/// let mask = Tensor::from_data(&[2, 3], vec![1.0, 1.0, 0.0, 1.0, 0.0, 0.0]);
/// let out = pooling.pool(&seq, &mask).unwrap();
/// assert_eq!(out.shape(), &[2, 1, 4]);
/// assert_eq!(out.data()[0], 2.0);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct SequencePooling {
    mode: PoolingMode,
}

impl SequencePooling {
    /// Creates a pooling layer.
    pub fn new(mode: PoolingMode) -> Self {
        Self { mode }
    }

    /// Returns the pooling mode.
    pub fn mode(&self) -> PoolingMode {
        self.mode
    }

    /// Builds a `[B, maxlen]` validity mask from per-sample lengths.
    pub fn mask_from_lengths(lengths: &[usize], maxlen: usize) -> Tensor {
        let data = lengths
            .iter()
            .flat_map(|&len| (0..maxlen).map(move |l| if l < len { 1.0 } else { 0.0 }))
            .collect();
        Tensor::from_data(&[lengths.len(), maxlen], data)
    }

    /// Pools `seq` over the positions where `mask` is non-zero.
    pub fn pool(&self, seq: &Tensor, mask: &Tensor) -> Result<Tensor, LayerError> {
        if seq.ndim() != 3 {
            return Err(LayerError::forward(format!(
                "SequencePooling expects [batch, len, dim] input, got {:?}",
                seq.shape()
            )));
        }
        let (batch, len, dim) = (seq.shape()[0], seq.shape()[1], seq.shape()[2]);
        if mask.shape() != [batch, len] {
            return Err(LayerError::ShapeMismatch {
                expected: vec![batch, len],
                actual: mask.shape().to_vec(),
            });
        }

        let mut out = vec![0.0f32; batch * dim];
        for b in 0..batch {
            let row = &mut out[b * dim..(b + 1) * dim];
            let valid: Vec<usize> = (0..len).filter(|&l| mask.data()[b * len + l] != 0.0).collect();
            if valid.is_empty() {
                continue;
            }

            match self.mode {
                PoolingMode::Sum | PoolingMode::Mean => {
                    for &l in &valid {
                        let base = (b * len + l) * dim;
                        for (o, &v) in row.iter_mut().zip(&seq.data()[base..base + dim]) {
                            *o += v;
                        }
                    }
                    if self.mode == PoolingMode::Mean {
                        let denom = (valid.len() as f32).max(1e-8);
                        row.iter_mut().for_each(|o| *o /= denom);
                    }
                }
                PoolingMode::Max => {
                    row.iter_mut().for_each(|o| *o = f32::NEG_INFINITY);
                    for &l in &valid {
                        let base = (b * len + l) * dim;
                        for (o, &v) in row.iter_mut().zip(&seq.data()[base..base + dim]) {
                            *o = o.max(v);
                        }
                    }
                }
            }
        }

        Tensor::try_from_data(&[batch, 1, dim], out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::SeedableRng;

    fn table() -> EmbeddingTable {
        let weight = Tensor::from_data(&[3, 2], vec![0.0, 0.1, 1.0, 1.1, 2.0, 2.1]);
        EmbeddingTable::from_weight(weight).unwrap()
    }

    #[test]
    fn test_lookup_rows() {
        let out = table().lookup(&[2, 0]).unwrap();
        assert_eq!(out.data(), &[2.0, 2.1, 0.0, 0.1]);
    }

    #[test]
    fn test_lookup_out_of_range() {
        let err = table().lookup(&[3]).unwrap_err();
        assert!(matches!(err, LayerError::EmbeddingError { .. }));
    }

    #[test]
    fn test_forward_appends_dim() {
        let ids = Tensor::from_data(&[2, 1], vec![1.0, 2.0]);
        let out = table().forward(&ids).unwrap();
        assert_eq!(out.shape(), &[2, 1, 2]);
        assert_eq!(out.data(), &[1.0, 1.1, 2.0, 2.1]);

        assert!(table().forward(&Tensor::full(&[1, 1], -1.0)).is_err());
        assert!(table().forward(&Tensor::full(&[1, 1], f32::NAN)).is_err());
    }

    #[test]
    fn test_init_is_seeded_and_small() {
        let mut a = StdRng::seed_from_u64(3);
        let mut b = StdRng::seed_from_u64(3);
        let ta = EmbeddingTable::new(20, 4, 1e-4, &mut a);
        let tb = EmbeddingTable::new(20, 4, 1e-4, &mut b);
        assert_eq!(ta.weight(), tb.weight());
        assert!(ta.weight().data().iter().all(|v| v.abs() < 1e-2));
    }

    #[test]
    fn test_dict_keeps_first_table() {
        let mut dict = EmbeddingDict::new();
        assert!(dict.insert("user", table()));
        assert!(!dict.insert("user", table()));
        assert_eq!(dict.len(), 1);
        assert_eq!(dict.named_parameters()[0].0, "user.weight");
        assert!(dict.get("item").is_none());
    }

    #[test]
    fn test_pooling_modes() {
        let seq = Tensor::from_data(&[1, 3, 2], vec![1.0, -2.0, 3.0, 4.0, 100.0, 100.0]);
        let mask = SequencePooling::mask_from_lengths(&[2], 3);

        let sum = SequencePooling::new(PoolingMode::Sum).pool(&seq, &mask).unwrap();
        assert_eq!(sum.data(), &[4.0, 2.0]);

        let mean = SequencePooling::new(PoolingMode::Mean).pool(&seq, &mask).unwrap();
        assert_relative_eq!(mean.data()[0], 2.0);
        assert_relative_eq!(mean.data()[1], 1.0);

        let max = SequencePooling::new(PoolingMode::Max).pool(&seq, &mask).unwrap();
        assert_eq!(max.data(), &[3.0, 4.0]);
    }

    #[test]
    fn test_pooling_empty_sequence_is_zero() {
        let seq = Tensor::ones(&[1, 2, 3]);
        let mask = Tensor::zeros(&[1, 2]);
        for mode in [PoolingMode::Sum, PoolingMode::Mean, PoolingMode::Max] {
            let out = SequencePooling::new(mode).pool(&seq, &mask).unwrap();
            assert_eq!(out.data(), &[0.0, 0.0, 0.0]);
        }
    }

    #[test]
    fn test_pooling_mode_parse() {
        assert_eq!("max".parse::<PoolingMode>().unwrap(), PoolingMode::Max);
        assert!("avg".parse::<PoolingMode>().is_err());
        assert_eq!(PoolingMode::default(), PoolingMode::Mean);
    }
}
