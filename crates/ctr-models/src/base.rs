//! Shared machinery of CTR models.
//!
//! [`BaseModel`] owns what every model built on feature columns needs: the
//! input layout, the embedding tables, the registered regularisation
//! weights, the optional meta transformation and the output layer. The
//! [`Model`] trait layers batched prediction, evaluation and state dicts on
//! top of a model's forward pass.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use ctr_layers::embedding::id_from_value;
use ctr_layers::{
    EmbeddingDict, EmbeddingTable, Layer, LayerError, PredictionLayer, Regularizer,
    SequencePooling, Task, Tensor,
};
use rand::rngs::StdRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ModelError, Result};
use crate::feature::{build_input_features, FeatureColumn, FeatureIndex};
use crate::meta::{MetaConfig, MetaTransformation, METATRANS_FLAG};
use crate::metrics;

/// Where a model runs. Only the CPU is available in this build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Device {
    /// Host CPU
    #[default]
    Cpu,
}

impl Device {
    /// Returns the device name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Device::Cpu => "cpu",
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Device {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "cpu" => Ok(Device::Cpu),
            _ => Err(ModelError::UnsupportedDevice {
                device: s.to_string(),
            }),
        }
    }
}

impl TryFrom<String> for Device {
    type Error = ModelError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Device> for String {
    fn from(value: Device) -> Self {
        value.as_str().to_string()
    }
}

/// Options shared by every model built on [`BaseModel`].
#[derive(Debug, Clone, PartialEq)]
pub struct BaseConfig {
    /// L2 strength registered for every embedding table
    pub l2_reg_embedding: f32,
    /// Standard deviation of the embedding initializer
    pub init_std: f32,
    /// Seed of every random initializer
    pub seed: u64,
    /// Output task
    pub task: Task,
    /// Placement
    pub device: Device,
    /// Optional behaviours, e.g. `"metatrans"`
    pub flag: Vec<String>,
    /// Feature holding the domain id for the meta transformation
    pub domain_column: Option<String>,
    /// Number of domains for the meta transformation
    pub num_domains: Option<usize>,
    /// Hidden units of the meta network
    pub meta_dnn_hidden_units: Vec<usize>,
}

impl Default for BaseConfig {
    fn default() -> Self {
        Self {
            l2_reg_embedding: 1e-5,
            init_std: 1e-4,
            seed: 1024,
            task: Task::Binary,
            device: Device::Cpu,
            flag: Vec::new(),
            domain_column: None,
            num_domains: None,
            meta_dnn_hidden_units: vec![32, 64, 32],
        }
    }
}

/// A parameter registered for regularisation.
#[derive(Debug, Clone, PartialEq)]
pub struct RegularizationWeight {
    /// Fully qualified parameter name
    pub name: String,
    /// Penalty applied to it
    pub regularizer: Regularizer,
}

/// Embeddings, input layout and output layer shared by models.
#[derive(Debug, Clone)]
pub struct BaseModel {
    feature_columns: Vec<FeatureColumn>,
    feature_index: FeatureIndex,
    embedding_dict: EmbeddingDict,
    regularization_weights: Vec<RegularizationWeight>,
    meta: Option<MetaTransformation>,
    out: PredictionLayer,
    config: BaseConfig,
    training: bool,
}

impl BaseModel {
    /// Builds the base model, drawing embeddings (then the meta
    /// transformation) from `rng`.
    ///
    /// # Errors
    ///
    /// Returns an error if shared embedding tables disagree, or if the meta
    /// transformation is requested without a valid domain column
    pub fn new(
        feature_columns: Vec<FeatureColumn>,
        config: BaseConfig,
        rng: &mut StdRng,
    ) -> Result<Self> {
        let feature_index = build_input_features(&feature_columns);
        let embedding_dict = create_embedding_matrix(&feature_columns, config.init_std, rng)?;

        let mut base = Self {
            feature_columns,
            feature_index,
            embedding_dict,
            regularization_weights: Vec::new(),
            meta: None,
            out: PredictionLayer::new(config.task, true),
            config,
            training: false,
        };

        let embedding_names: Vec<String> = base
            .embedding_dict
            .named_parameters()
            .into_iter()
            .map(|(name, _)| format!("embedding_dict.{}", name))
            .collect();
        let l2_reg_embedding = base.config.l2_reg_embedding;
        base.add_regularization_weight(embedding_names, 0.0, l2_reg_embedding);

        if base.uses_meta_transformation() {
            base.meta = Some(base.build_meta_transformation(rng)?);
        }

        Ok(base)
    }

    fn build_meta_transformation(&self, rng: &mut StdRng) -> Result<MetaTransformation> {
        let domain_name = self.config.domain_column.as_deref().ok_or_else(|| {
            ModelError::config("metatrans requires domain_column")
        })?;
        let num_domains = self
            .config
            .num_domains
            .ok_or_else(|| ModelError::config("metatrans requires num_domains"))?;
        let domain_column = self.feature_index.range(domain_name)?.start;

        let config = MetaConfig {
            domain_column,
            num_domains,
            num_fields: self.num_sparse_fields(),
            embedding_size: self.embedding_size()?,
            hidden_units: self.config.meta_dnn_hidden_units.clone(),
            init_std: self.config.init_std,
            seed: self.config.seed,
        };
        MetaTransformation::new(config, rng)
    }

    /// Returns the feature columns.
    pub fn feature_columns(&self) -> &[FeatureColumn] {
        &self.feature_columns
    }

    /// Returns the input layout.
    pub fn feature_index(&self) -> &FeatureIndex {
        &self.feature_index
    }

    /// Returns the embedding tables.
    pub fn embedding_dict(&self) -> &EmbeddingDict {
        &self.embedding_dict
    }

    /// Returns the configuration.
    pub fn config(&self) -> &BaseConfig {
        &self.config
    }

    /// Returns the task.
    pub fn task(&self) -> Task {
        self.config.task
    }

    /// Returns the device.
    pub fn device(&self) -> Device {
        self.config.device
    }

    /// Returns whether the model runs in training mode.
    pub fn is_training(&self) -> bool {
        self.training
    }

    /// Returns whether `flag` enables the meta transformation.
    pub fn uses_meta_transformation(&self) -> bool {
        self.config.flag.iter().any(|f| f == METATRANS_FLAG)
    }

    /// Returns the meta transformation, if enabled.
    pub fn meta(&self) -> Option<&MetaTransformation> {
        self.meta.as_ref()
    }

    /// Number of sparse and sequence columns.
    pub fn num_sparse_fields(&self) -> usize {
        self.feature_columns
            .iter()
            .filter(|c| c.embedding_dim().is_some())
            .count()
    }

    /// The embedding dimension shared by every sparse and sequence column.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::MixedEmbeddingDims`] when the columns disagree
    pub fn embedding_size(&self) -> Result<usize> {
        let mut dims: Vec<usize> = self
            .feature_columns
            .iter()
            .filter_map(FeatureColumn::embedding_dim)
            .collect();
        dims.sort_unstable();
        dims.dedup();
        match dims.as_slice() {
            [dim] => Ok(*dim),
            [] => Err(ModelError::config("model has no sparse feature columns")),
            _ => Err(ModelError::MixedEmbeddingDims { dims }),
        }
    }

    /// Registers parameters for an `l1·|w| + l2·w²` penalty.
    pub fn add_regularization_weight<I, S>(&mut self, names: I, l1: f32, l2: f32)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let regularizer = Regularizer::from_coefficients(l1, l2);
        self.regularization_weights
            .extend(names.into_iter().map(|name| RegularizationWeight {
                name: name.into(),
                regularizer,
            }));
    }

    /// Returns the registered regularisation weights.
    pub fn regularization_weights(&self) -> &[RegularizationWeight] {
        &self.regularization_weights
    }

    /// Checks that `x` is a `[batch, width]` matrix matching the input layout.
    pub fn validate_input(&self, x: &Tensor) -> Result<()> {
        let width = self.feature_index.width();
        if x.ndim() != 2 || x.shape()[1] != width {
            return Err(ModelError::invalid_input(format!(
                "expected input of shape [batch, {}], got {:?}",
                width,
                x.shape()
            )));
        }
        Ok(())
    }

    /// Looks up every sparse and sequence column of `x` and slices out the
    /// dense columns.
    ///
    /// Returns `[B, 1, E]` embeddings (sparse columns first, then sequence
    /// columns) and `[B, d]` dense values.
    pub fn input_from_feature_columns(
        &self,
        x: &Tensor,
        support_dense: bool,
    ) -> Result<(Vec<Tensor>, Vec<Tensor>)> {
        self.validate_input(x)?;

        let dense_names: Vec<String> = self
            .feature_columns
            .iter()
            .filter_map(|c| match c {
                FeatureColumn::Dense(f) => Some(f.name.clone()),
                _ => None,
            })
            .collect();
        if !support_dense && !dense_names.is_empty() {
            return Err(ModelError::DenseNotSupported { names: dense_names });
        }

        let mut sparse_embedding_list = Vec::new();
        let mut varlen_embedding_list = Vec::new();
        let mut dense_value_list = Vec::new();

        for column in &self.feature_columns {
            match column {
                FeatureColumn::Sparse(feat) => {
                    let ids = self.column_ids(x, feat.name())?;
                    let table = self.table(feat.embedding_name())?;
                    let emb = table.lookup(&ids)?;
                    sparse_embedding_list.push(emb.reshape(&[ids.len(), 1, table.dim()]));
                }
                FeatureColumn::VarLenSparse(feat) => {
                    let range = self.feature_index.range(feat.name())?;
                    let ids = x.narrow(1, range.start, range.len())?;
                    let seq = self.table(feat.embedding_name())?.forward(&ids)?;
                    let mask = match &feat.length_name {
                        Some(length_name) => {
                            let lengths = self.column_ids(x, length_name)?;
                            SequencePooling::mask_from_lengths(&lengths, feat.maxlen)
                        }
                        None => ids.map(|id| if id != 0.0 { 1.0 } else { 0.0 }),
                    };
                    varlen_embedding_list
                        .push(SequencePooling::new(feat.combiner).pool(&seq, &mask)?);
                }
                FeatureColumn::Dense(feat) => {
                    let range = self.feature_index.range(&feat.name)?;
                    dense_value_list.push(x.narrow(1, range.start, range.len())?);
                }
            }
        }

        sparse_embedding_list.extend(varlen_embedding_list);
        Ok((sparse_embedding_list, dense_value_list))
    }

    fn table(&self, embedding_name: &str) -> Result<&EmbeddingTable> {
        self.embedding_dict
            .get(embedding_name)
            .ok_or_else(|| ModelError::UnknownFeature {
                name: embedding_name.to_string(),
            })
    }

    /// Reads the first column of feature `name` as integer ids.
    fn column_ids(&self, x: &Tensor, name: &str) -> Result<Vec<usize>> {
        let col = self.feature_index.range(name)?.start;
        let width = x.shape()[1];
        x.data()
            .chunks(width)
            .map(|row| id_from_value(row[col]).map_err(ModelError::from))
            .collect()
    }

    /// Applies the meta transformation to stacked `[B, F, E]` embeddings, or
    /// returns them unchanged when it is disabled.
    pub fn meta_transformation(&self, x: &Tensor, sparse_input: &Tensor) -> Result<Tensor> {
        match &self.meta {
            Some(meta) => meta.forward(x, sparse_input),
            None => Ok(sparse_input.clone()),
        }
    }

    /// Applies the output layer to logits.
    pub fn output(&self, logit: &Tensor) -> Result<Tensor> {
        Ok(self.out.forward(logit)?)
    }

    /// Parameters owned by the base model, fully qualified.
    pub fn named_parameters(&self) -> Vec<(String, &Tensor)> {
        let mut params: Vec<(String, &Tensor)> = self
            .embedding_dict
            .named_parameters()
            .into_iter()
            .map(|(name, p)| (format!("embedding_dict.{}", name), p))
            .collect();
        if let Some(meta) = &self.meta {
            for (name, p) in meta.named_parameters() {
                params.push((format!("meta.{}", name), p));
            }
        }
        for (name, p) in self.out.named_parameters() {
            params.push((format!("out.{}", name), p));
        }
        params
    }

    /// Mutable parameters in the order of [`BaseModel::named_parameters`].
    pub fn parameters_mut(&mut self) -> Vec<&mut Tensor> {
        let mut params = self.embedding_dict.parameters_mut();
        if let Some(meta) = &mut self.meta {
            params.extend(meta.parameters_mut());
        }
        params.extend(self.out.parameters_mut());
        params
    }

    /// Switches the base model (and the meta network) between modes.
    pub fn set_training(&mut self, training: bool) {
        self.training = training;
        if let Some(meta) = &mut self.meta {
            meta.set_training(training);
        }
    }
}

/// Creates one table per distinct embedding name.
fn create_embedding_matrix(
    feature_columns: &[FeatureColumn],
    init_std: f32,
    rng: &mut StdRng,
) -> Result<EmbeddingDict> {
    let mut dict = EmbeddingDict::new();
    for column in feature_columns {
        let feat = match column {
            FeatureColumn::Sparse(f) => f,
            FeatureColumn::VarLenSparse(f) => &f.sparsefeat,
            FeatureColumn::Dense(_) => continue,
        };
        if let Some(existing) = dict.get(feat.embedding_name()) {
            if existing.vocabulary_size() != feat.vocabulary_size()
                || existing.dim() != feat.embedding_dim()
            {
                return Err(ModelError::config(format!(
                    "feature '{}' shares embedding '{}' with a different shape",
                    feat.name(),
                    feat.embedding_name()
                )));
            }
            continue;
        }
        let table = EmbeddingTable::new(feat.vocabulary_size(), feat.embedding_dim(), init_std, rng);
        dict.insert(feat.embedding_name(), table);
    }
    Ok(dict)
}

/// A model assembled on top of a [`BaseModel`].
///
/// Implementors provide the forward pass and their own parameters; batched
/// prediction, evaluation, regularisation and state dicts come for free.
pub trait Model: Send + Sync {
    /// Returns the shared base model.
    fn base(&self) -> &BaseModel;

    /// Returns the shared base model mutably.
    fn base_mut(&mut self) -> &mut BaseModel;

    /// Maps a `[batch, width]` input to `[batch, 1]` predictions.
    fn forward(&self, x: &Tensor) -> Result<Tensor>;

    /// Every parameter of the model, fully qualified.
    fn named_parameters(&self) -> Vec<(String, &Tensor)>;

    /// Mutable parameters in the order of [`Model::named_parameters`].
    fn parameters_mut(&mut self) -> Vec<&mut Tensor>;

    /// Switches every layer between training and inference mode.
    fn set_training(&mut self, training: bool);

    /// Total number of scalar parameters.
    fn num_parameters(&self) -> usize {
        self.named_parameters().iter().map(|(_, p)| p.numel()).sum()
    }

    /// Sum of the penalties of every registered regularisation weight.
    fn regularization_loss(&self) -> Result<f32> {
        let params: BTreeMap<String, &Tensor> = self.named_parameters().into_iter().collect();
        self.base()
            .regularization_weights()
            .iter()
            .map(|w| {
                params
                    .get(&w.name)
                    .map(|p| w.regularizer.loss(p))
                    .ok_or_else(|| {
                        ModelError::from(LayerError::UnknownParameter {
                            name: w.name.clone(),
                        })
                    })
            })
            .sum()
    }

    /// Predicts in inference mode, evaluating batches in parallel.
    ///
    /// Returns `[rows, 1]`.
    fn predict(&mut self, x: &Tensor, batch_size: usize) -> Result<Tensor> {
        if batch_size == 0 {
            return Err(ModelError::config("batch_size must be positive"));
        }
        self.set_training(false);
        self.base().validate_input(x)?;

        let rows = x.shape()[0];
        if rows == 0 {
            return Ok(Tensor::zeros(&[0, 1]));
        }

        let model: &Self = self;
        let indices: Vec<usize> = (0..rows).collect();
        let outputs = indices
            .par_chunks(batch_size)
            .map(|chunk| {
                let batch = x.select_rows(chunk)?;
                debug!(rows = chunk.len(), "Predicting batch");
                model.forward(&batch)
            })
            .collect::<Result<Vec<Tensor>>>()?;

        Ok(Tensor::concat(&outputs, 0)?)
    }

    /// Predicts `x` and scores the predictions against `y` with each named
    /// metric.
    fn evaluate(
        &mut self,
        x: &Tensor,
        y: &[f32],
        batch_size: usize,
        metric_names: &[String],
    ) -> Result<BTreeMap<String, f64>> {
        let pred = self.predict(x, batch_size)?;
        if pred.numel() != y.len() {
            return Err(ModelError::invalid_input(format!(
                "got {} labels for {} rows",
                y.len(),
                pred.numel()
            )));
        }
        metric_names
            .iter()
            .map(|name| Ok((name.clone(), metrics::compute(name, y, pred.data())?)))
            .collect()
    }

    /// Copies every parameter into a name-keyed map.
    fn state_dict(&self) -> BTreeMap<String, Tensor> {
        self.named_parameters()
            .into_iter()
            .map(|(name, p)| (name, p.clone()))
            .collect()
    }

    /// Overwrites every parameter from `state`.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::StateDict`] if an entry is missing or has the
    /// wrong shape; the model is left unchanged in that case
    fn load_state_dict(&mut self, state: &BTreeMap<String, Tensor>) -> Result<()> {
        let names: Vec<String> = self
            .named_parameters()
            .into_iter()
            .map(|(name, p)| {
                let entry = state.get(&name).ok_or_else(|| ModelError::StateDict {
                    message: format!("missing parameter '{}'", name),
                })?;
                if entry.shape() != p.shape() || entry.numel() != p.numel() {
                    return Err(ModelError::StateDict {
                        message: format!(
                            "parameter '{}' has shape {:?}, expected {:?}",
                            name,
                            entry.shape(),
                            p.shape()
                        ),
                    });
                }
                Ok(name)
            })
            .collect::<Result<_>>()?;

        for (name, param) in names.iter().zip(self.parameters_mut()) {
            if let Some(entry) = state.get(name) {
                param.data_mut().copy_from_slice(entry.data());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::{DenseFeat, SparseFeat, VarLenSparseFeat};
    use ctr_layers::PoolingMode;
    use rand::SeedableRng;

    fn base(columns: Vec<FeatureColumn>, config: BaseConfig) -> Result<BaseModel> {
        let mut rng = StdRng::seed_from_u64(config.seed);
        BaseModel::new(columns, config, &mut rng)
    }

    fn columns() -> Vec<FeatureColumn> {
        vec![
            SparseFeat::new("user", 5).into(),
            SparseFeat::new("item", 7).into(),
            VarLenSparseFeat::new(SparseFeat::new("hist", 7).with_embedding_name("item"), 3)
                .with_combiner(PoolingMode::Sum)
                .into(),
            DenseFeat::new("price", 1).into(),
        ]
    }

    #[test]
    fn test_device_parse() {
        assert_eq!("cpu".parse::<Device>().unwrap(), Device::Cpu);
        for device in ["cuda", "cuda:0", "mps"] {
            let err = device.parse::<Device>().unwrap_err();
            assert!(matches!(err, ModelError::UnsupportedDevice { .. }));
        }
    }

    #[test]
    fn test_shared_embedding_tables() {
        let model = base(columns(), BaseConfig::default()).unwrap();
        assert_eq!(model.embedding_dict().len(), 2);
        assert_eq!(model.regularization_weights().len(), 2);
        assert_eq!(model.num_sparse_fields(), 3);
        assert_eq!(model.embedding_size().unwrap(), 4);
    }

    #[test]
    fn test_shared_table_shape_conflict() {
        let cols = vec![
            SparseFeat::new("a", 5).with_embedding_name("t").into(),
            SparseFeat::new("b", 6).with_embedding_name("t").into(),
        ];
        assert!(base(cols, BaseConfig::default()).is_err());
    }

    #[test]
    fn test_mixed_embedding_dims() {
        let cols = vec![
            SparseFeat::new("a", 5).into(),
            SparseFeat::new("b", 5).with_embedding_dim(8).into(),
        ];
        let model = base(cols, BaseConfig::default()).unwrap();
        assert!(matches!(
            model.embedding_size(),
            Err(ModelError::MixedEmbeddingDims { .. })
        ));
    }

    #[test]
    fn test_input_from_feature_columns() {
        let model = base(columns(), BaseConfig::default()).unwrap();
        // user, item, hist x3, price
        let x = Tensor::from_data(
            &[2, 6],
            vec![
                1.0, 2.0, 2.0, 2.0, 0.0, 0.5, //
                4.0, 6.0, 0.0, 0.0, 0.0, 1.5,
            ],
        );
        let (sparse, dense) = model.input_from_feature_columns(&x, true).unwrap();
        assert_eq!(sparse.len(), 3);
        for emb in &sparse {
            assert_eq!(emb.shape(), &[2, 1, 4]);
        }
        assert_eq!(dense.len(), 1);
        assert_eq!(dense[0].data(), &[0.5, 1.5]);

        // hist sums two lookups of item id 2
        let item = model.embedding_dict().get("item").unwrap().lookup(&[2]).unwrap();
        for (h, i) in sparse[2].data()[..4].iter().zip(item.data()) {
            assert!((h - 2.0 * i).abs() < 1e-7);
        }
        // second sample has an empty sequence
        assert!(sparse[2].data()[4..].iter().all(|&v| v == 0.0));

        let err = model.input_from_feature_columns(&x, false).unwrap_err();
        assert!(matches!(err, ModelError::DenseNotSupported { .. }));
    }

    #[test]
    fn test_input_validation() {
        let model = base(columns(), BaseConfig::default()).unwrap();
        assert!(model.validate_input(&Tensor::zeros(&[2, 5])).is_err());
        let bad_id = Tensor::from_data(&[1, 6], vec![9.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
        assert!(model.input_from_feature_columns(&bad_id, true).is_err());
        let negative = Tensor::from_data(&[1, 6], vec![-1.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
        assert!(model.input_from_feature_columns(&negative, true).is_err());
    }

    #[test]
    fn test_length_column_mask() {
        let cols = vec![
            VarLenSparseFeat::new(SparseFeat::new("hist", 4), 2)
                .with_combiner(PoolingMode::Sum)
                .with_length_name("hist_len")
                .into(),
            SparseFeat::new("user", 4).into(),
        ];
        let model = base(cols, BaseConfig::default()).unwrap();
        assert_eq!(model.feature_index().width(), 4);

        // ids [1, 1] but length 1: only the first position counts
        let x = Tensor::from_data(&[1, 4], vec![1.0, 1.0, 1.0, 0.0]);
        let (sparse, _) = model.input_from_feature_columns(&x, true).unwrap();
        let one = model.embedding_dict().get("hist").unwrap().lookup(&[1]).unwrap();
        // sequence columns come after plain sparse ones
        assert_eq!(sparse[1].data(), one.data());
    }

    #[test]
    fn test_metatrans_requires_domain() {
        let config = BaseConfig {
            flag: vec!["metatrans".to_string()],
            ..BaseConfig::default()
        };
        assert!(base(columns(), config.clone()).is_err());

        let config = BaseConfig {
            domain_column: Some("user".to_string()),
            num_domains: Some(5),
            ..config
        };
        let model = base(columns(), config).unwrap();
        assert!(model.meta().is_some());
        assert!(model
            .named_parameters()
            .iter()
            .any(|(n, _)| n == "meta.domain_embedding.weight"));
    }

    #[test]
    fn test_named_parameters_match_mut() {
        let mut model = base(columns(), BaseConfig::default()).unwrap();
        let names: Vec<String> = model.named_parameters().into_iter().map(|(n, _)| n).collect();
        assert_eq!(
            names,
            vec!["embedding_dict.user.weight", "embedding_dict.item.weight", "out.bias"]
        );
        assert_eq!(model.parameters_mut().len(), names.len());
    }
}
