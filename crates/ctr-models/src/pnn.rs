//! Product-based Neural Network (PNN).
//!
//! The PNN feeds the DNN with the flattened field embeddings (the linear
//! signal) followed by pairwise field interactions: the inner product of
//! every pair, a kernel-weighted outer product of every pair, or both.
//!
//! ```text
//! x ─► embeddings ─► [meta transformation] ─┬─► linear signal ──┐
//!                                           ├─► inner product ──┼─► DNN ─► linear ─► out
//!                                           └─► outer product ──┘    ▲
//!                          dense values ─────────────────────────────┘
//! ```

use ctr_layers::merge::concat_last;
use ctr_layers::{
    combined_dnn_input, ActivationType, DNNConfig, Dense, InnerProductLayer, Initializer,
    KernelType, Layer, OuterProductLayer, Task, Tensor, DNN,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::base::{BaseConfig, BaseModel, Device, Model};
use crate::error::{ModelError, Result};
use crate::feature::{compute_input_dim, FeatureColumn};

/// Hyperparameters of a [`PNN`].
///
/// Every field has a default, so a JSON object only needs the fields it
/// changes:
///
/// ```
/// use ctr_models::pnn::PnnConfig;
/// use ctr_layers::KernelType;
///
/// let config: PnnConfig =
///     serde_json::from_str(r#"{"use_outter": true, "kernel_type": "vec"}"#).unwrap();
/// assert!(config.use_outer);
/// assert_eq!(config.kernel_type, KernelType::Vec);
/// assert_eq!(config.dnn_hidden_units, vec![128, 128]);
///
/// assert!(serde_json::from_str::<PnnConfig>(r#"{"kernel_type": "full"}"#).is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PnnConfig {
    /// Width of each DNN hidden layer
    pub dnn_hidden_units: Vec<usize>,
    /// L2 strength applied to embedding tables
    pub l2_reg_embedding: f32,
    /// L2 strength applied to DNN kernels and the output projection
    pub l2_reg_dnn: f32,
    /// Standard deviation of the normal initializers
    pub init_std: f32,
    /// Seed of every random initializer
    pub seed: u64,
    /// DNN dropout rate in `[0, 1)`
    pub dnn_dropout: f32,
    /// DNN hidden activation
    pub dnn_activation: ActivationType,
    /// Whether to add the inner product of every field pair
    pub use_inner: bool,
    /// Whether to add the kernel-weighted outer product of every field pair
    #[serde(alias = "use_outter")]
    pub use_outer: bool,
    /// Outer product kernel
    pub kernel_type: KernelType,
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

impl Default for PnnConfig {
    fn default() -> Self {
        let base = BaseConfig::default();
        Self {
            dnn_hidden_units: vec![128, 128],
            l2_reg_embedding: base.l2_reg_embedding,
            l2_reg_dnn: 0.0,
            init_std: base.init_std,
            seed: base.seed,
            dnn_dropout: 0.0,
            dnn_activation: ActivationType::ReLU,
            use_inner: true,
            use_outer: false,
            kernel_type: KernelType::Mat,
            task: base.task,
            device: base.device,
            flag: base.flag,
            domain_column: base.domain_column,
            num_domains: base.num_domains,
            meta_dnn_hidden_units: base.meta_dnn_hidden_units,
        }
    }
}

impl PnnConfig {
    /// Sets the DNN hidden units.
    pub fn with_hidden_units(mut self, units: Vec<usize>) -> Self {
        self.dnn_hidden_units = units;
        self
    }

    /// Enables or disables the inner and outer products.
    pub fn with_products(mut self, use_inner: bool, use_outer: bool) -> Self {
        self.use_inner = use_inner;
        self.use_outer = use_outer;
        self
    }

    /// Sets the outer product kernel by name.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidKernelType`] unless `kernel_type` is
    /// `mat`, `vec` or `num`
    pub fn with_kernel_type(mut self, kernel_type: &str) -> Result<Self> {
        self.kernel_type = kernel_type
            .parse()
            .map_err(|_| ModelError::InvalidKernelType {
                kernel_type: kernel_type.to_string(),
            })?;
        Ok(self)
    }

    /// Sets the task by name.
    pub fn with_task(mut self, task: &str) -> Result<Self> {
        self.task = task.parse()?;
        Ok(self)
    }

    /// Sets the device by name.
    pub fn with_device(mut self, device: &str) -> Result<Self> {
        self.device = device.parse()?;
        Ok(self)
    }

    /// Sets the seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Enables the meta transformation keyed by `domain_column`.
    pub fn with_meta_transformation(
        mut self,
        domain_column: impl Into<String>,
        num_domains: usize,
    ) -> Self {
        self.flag.push(crate::meta::METATRANS_FLAG.to_string());
        self.domain_column = Some(domain_column.into());
        self.num_domains = Some(num_domains);
        self
    }

    /// The options handled by [`BaseModel`].
    pub fn base_config(&self) -> BaseConfig {
        BaseConfig {
            l2_reg_embedding: self.l2_reg_embedding,
            init_std: self.init_std,
            seed: self.seed,
            task: self.task,
            device: self.device,
            flag: self.flag.clone(),
            domain_column: self.domain_column.clone(),
            num_domains: self.num_domains,
            meta_dnn_hidden_units: self.meta_dnn_hidden_units.clone(),
        }
    }
}

/// Product-based Neural Network.
///
/// # Example
///
/// ```
/// use ctr_models::feature::{FeatureColumn, SparseFeat};
/// use ctr_models::pnn::{PnnConfig, PNN};
/// use ctr_models::Model;
/// use ctr_layers::Tensor;
///
/// let columns: Vec<FeatureColumn> = vec![
///     SparseFeat::new("user", 10).into(),
///     SparseFeat::new("item", 20).into(),
///     SparseFeat::new("city", 5).into(),
/// ];
/// let model = PNN::new(columns, PnnConfig::default()).unwrap();
/// let x = Tensor::from_data(&[2, 3], vec![1.0, 2.0, 3.0, 4.0, 5.0, 0.0]);
/// let y = model.forward(&x).unwrap();
/// assert_eq!(y.shape(), &[2, 1]);
/// ```
#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, Clone)]
pub struct PNN {
    base: BaseModel,
    config: PnnConfig,
    inner_product: Option<InnerProductLayer>,
    outer_product: Option<OuterProductLayer>,
    dnn: DNN,
    dnn_linear: Dense,
    num_inputs: usize,
    product_out_dim: usize,
}

impl PNN {
    /// Builds a PNN over `dnn_feature_columns`.
    ///
    /// Every weight is drawn from one RNG seeded with `config.seed`, in the
    /// order embeddings, meta transformation, outer kernel, DNN, output
    /// projection, so equal configs give equal models.
    ///
    /// # Errors
    ///
    /// Returns an error if the DNN settings are invalid, if a product layer
    /// is enabled with fewer than two sparse fields or with mixed embedding
    /// dimensions, or if the meta transformation is misconfigured
    pub fn new(dnn_feature_columns: Vec<FeatureColumn>, config: PnnConfig) -> Result<Self> {
        let mut rng = StdRng::seed_from_u64(config.seed);

        let num_inputs = compute_input_dim(&dnn_feature_columns, true, false, true);
        if num_inputs == 0 {
            return Err(ModelError::config("PNN needs at least one sparse feature"));
        }
        let num_pairs = ctr_layers::interaction::num_pairs(num_inputs);
        let sparse_dnn_dim = compute_input_dim(&dnn_feature_columns, true, true, false);

        let base = BaseModel::new(dnn_feature_columns, config.base_config(), &mut rng)?;

        let use_product = config.use_inner || config.use_outer;
        if use_product && num_inputs < 2 {
            return Err(ModelError::config(format!(
                "inner/outer products need at least two sparse features, got {}",
                num_inputs
            )));
        }
        let embedding_size = if use_product {
            Some(base.embedding_size()?)
        } else {
            None
        };

        let mut product_out_dim = 0;
        let inner_product = config.use_inner.then(|| {
            product_out_dim += num_pairs;
            InnerProductLayer::new(true)
        });
        let outer_product = match (config.use_outer, embedding_size) {
            (true, Some(embedding_size)) => {
                product_out_dim += num_pairs;
                Some(OuterProductLayer::new(
                    num_inputs,
                    embedding_size,
                    config.kernel_type,
                    &mut rng,
                )?)
            }
            _ => None,
        };

        let dnn_config = DNNConfig::new(product_out_dim + sparse_dnn_dim, config.dnn_hidden_units.clone())
            .with_activation(config.dnn_activation)
            .with_dropout(config.dnn_dropout)
            .with_init_std(config.init_std)
            .with_seed(config.seed);
        let dnn = DNN::from_config(dnn_config, &mut rng)?;
        let dnn_linear = Dense::new_with_initializer(
            dnn.output_dim(),
            1,
            Initializer::XavierUniform,
            false,
            &mut rng,
        );

        let mut model = Self {
            base,
            config,
            inner_product,
            outer_product,
            dnn,
            dnn_linear,
            num_inputs,
            product_out_dim,
        };

        let dnn_kernels: Vec<String> = model
            .dnn
            .named_parameters()
            .into_iter()
            .map(|(name, _)| name)
            .filter(|name| name.contains("weight") && !name.contains("bn"))
            .map(|name| format!("dnn.{}", name))
            .chain(std::iter::once("dnn_linear.weight".to_string()))
            .collect();
        let l2_reg_dnn = model.config.l2_reg_dnn;
        model.base.add_regularization_weight(dnn_kernels, 0.0, l2_reg_dnn);

        info!(
            fields = model.num_inputs,
            pairs = model.num_pairs(),
            product_out_dim = model.product_out_dim,
            dnn_input_dim = model.dnn_input_dim(),
            use_inner = model.config.use_inner,
            use_outer = model.config.use_outer,
            kernel_type = %model.config.kernel_type,
            parameters = model.num_parameters(),
            "Built PNN"
        );

        Ok(model)
    }

    /// Returns the configuration.
    pub fn config(&self) -> &PnnConfig {
        &self.config
    }

    /// Number of sparse and sequence fields.
    pub fn num_inputs(&self) -> usize {
        self.num_inputs
    }

    /// Number of field pairs.
    pub fn num_pairs(&self) -> usize {
        ctr_layers::interaction::num_pairs(self.num_inputs)
    }

    /// Width of the product signals fed to the DNN, excluding the linear signal.
    pub fn product_out_dim(&self) -> usize {
        self.product_out_dim
    }

    /// Width of the DNN input.
    pub fn dnn_input_dim(&self) -> usize {
        self.dnn.input_dim()
    }

    /// Returns the DNN.
    pub fn dnn(&self) -> &DNN {
        &self.dnn
    }

    /// Returns the outer product layer, if enabled.
    pub fn outer_product(&self) -> Option<&OuterProductLayer> {
        self.outer_product.as_ref()
    }

    /// Computes the product layer `[linear signal, inner, outer]`.
    fn product_layer(&self, sparse_embedding_list: &[Tensor]) -> Result<Tensor> {
        let mut parts = vec![concat_last(sparse_embedding_list)?.flatten_from(1)];
        if let Some(inner) = &self.inner_product {
            parts.push(inner.forward_fields(sparse_embedding_list)?.flatten_from(1));
        }
        if let Some(outer) = &self.outer_product {
            parts.push(outer.forward_fields(sparse_embedding_list)?);
        }
        Ok(ctr_layers::concat_fun(&parts, 1)?)
    }
}

impl Model for PNN {
    fn base(&self) -> &BaseModel {
        &self.base
    }

    fn base_mut(&mut self) -> &mut BaseModel {
        &mut self.base
    }

    fn forward(&self, x: &Tensor) -> Result<Tensor> {
        let (mut sparse_embedding_list, dense_value_list) =
            self.base.input_from_feature_columns(x, true)?;

        if self.base.meta().is_some() {
            let sparse_input = Tensor::concat(&sparse_embedding_list, 1)?;
            let transformed = self.base.meta_transformation(x, &sparse_input)?;
            sparse_embedding_list = transformed.split(1, &vec![1; self.num_inputs])?;
        }

        let product_layer = self.product_layer(&sparse_embedding_list)?;
        let dnn_input = combined_dnn_input(&[product_layer], &dense_value_list)?;
        let dnn_output = self.dnn.forward(&dnn_input)?;
        let logit = self.dnn_linear.forward(&dnn_output)?;

        debug!(batch = x.shape()[0], "PNN forward");
        self.base.output(&logit)
    }

    fn named_parameters(&self) -> Vec<(String, &Tensor)> {
        let mut params = self.base.named_parameters();
        if let Some(outer) = &self.outer_product {
            for (name, p) in outer.named_parameters() {
                params.push((format!("outer_product.{}", name), p));
            }
        }
        for (name, p) in self.dnn.named_parameters() {
            params.push((format!("dnn.{}", name), p));
        }
        for (name, p) in self.dnn_linear.named_parameters() {
            params.push((format!("dnn_linear.{}", name), p));
        }
        params
    }

    fn parameters_mut(&mut self) -> Vec<&mut Tensor> {
        let mut params = self.base.parameters_mut();
        if let Some(outer) = &mut self.outer_product {
            params.extend(outer.parameters_mut());
        }
        params.extend(self.dnn.parameters_mut());
        params.extend(self.dnn_linear.parameters_mut());
        params
    }

    fn set_training(&mut self, training: bool) {
        self.base.set_training(training);
        self.dnn.set_training(training);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::{DenseFeat, SparseFeat, VarLenSparseFeat};
    use approx::assert_relative_eq;

    fn columns() -> Vec<FeatureColumn> {
        vec![
            SparseFeat::new("user", 10).into(),
            SparseFeat::new("item", 10).into(),
            SparseFeat::new("city", 4).into(),
            DenseFeat::new("price", 1).into(),
        ]
    }

    fn input(batch: usize) -> Tensor {
        let data = (0..batch)
            .flat_map(|b| {
                let b = b as f32;
                vec![b % 10.0, (b * 3.0) % 10.0, b % 4.0, 0.1 * b]
            })
            .collect();
        Tensor::from_data(&[batch, 4], data)
    }

    #[test]
    fn test_invalid_kernel_type() {
        let err = PnnConfig::default().with_kernel_type("matrix").unwrap_err();
        assert!(matches!(err, ModelError::InvalidKernelType { .. }));
        assert!(err.to_string().contains("kernel_type must be mat, vec or num"));

        let json = r#"{"use_outter": true, "kernel_type": "tensor"}"#;
        let err = serde_json::from_str::<PnnConfig>(json).unwrap_err();
        assert!(err.to_string().contains("kernel_type must be mat, vec or num"));
    }

    #[test]
    fn test_config_defaults() {
        let config: PnnConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, PnnConfig::default());
        assert_eq!(config.dnn_hidden_units, vec![128, 128]);
        assert_relative_eq!(config.l2_reg_embedding, 1e-5);
        assert_eq!(config.seed, 1024);
        assert!(config.use_inner && !config.use_outer);
        assert_eq!(config.meta_dnn_hidden_units, vec![32, 64, 32]);
    }

    #[test]
    fn test_forward_shape_for_every_kernel() {
        for kernel in ["mat", "vec", "num"] {
            let config = PnnConfig::default()
                .with_products(true, true)
                .with_kernel_type(kernel)
                .unwrap();
            let model = PNN::new(columns(), config).unwrap();
            let y = model.forward(&input(5)).unwrap();
            assert_eq!(y.shape(), &[5, 1]);
            assert!(y.data().iter().all(|&p| p > 0.0 && p < 1.0));
        }
    }

    #[test]
    fn test_dimensions() {
        let model = PNN::new(
            columns(),
            PnnConfig::default().with_products(true, true),
        )
        .unwrap();
        assert_eq!(model.num_inputs(), 3);
        assert_eq!(model.num_pairs(), 3);
        assert_eq!(model.product_out_dim(), 6);
        // 6 products + 3 * 4 embedding values + 1 dense value
        assert_eq!(model.dnn_input_dim(), 19);

        let linear_only = PNN::new(columns(), PnnConfig::default().with_products(false, false)).unwrap();
        assert_eq!(linear_only.product_out_dim(), 0);
        assert_eq!(linear_only.dnn_input_dim(), 13);
    }

    #[test]
    fn test_linear_only_allows_mixed_dims() {
        let cols: Vec<FeatureColumn> = vec![
            SparseFeat::new("a", 5).with_embedding_dim(2).into(),
            SparseFeat::new("b", 5).with_embedding_dim(3).into(),
        ];
        let config = PnnConfig::default().with_products(false, false);
        let model = PNN::new(cols.clone(), config).unwrap();
        let x = Tensor::from_data(&[1, 2], vec![1.0, 2.0]);
        assert_eq!(model.forward(&x).unwrap().shape(), &[1, 1]);

        let err = PNN::new(cols, PnnConfig::default()).unwrap_err();
        assert!(matches!(err, ModelError::MixedEmbeddingDims { .. }));
    }

    #[test]
    fn test_rejects_bad_configs() {
        let single: Vec<FeatureColumn> = vec![SparseFeat::new("a", 5).into()];
        assert!(PNN::new(single.clone(), PnnConfig::default()).is_err());
        assert!(PNN::new(single, PnnConfig::default().with_products(false, false)).is_ok());

        let dense_only: Vec<FeatureColumn> = vec![DenseFeat::new("d", 2).into()];
        assert!(PNN::new(dense_only, PnnConfig::default()).is_err());

        let empty_hidden = PnnConfig::default().with_hidden_units(vec![]);
        assert!(PNN::new(columns(), empty_hidden).is_err());

        assert!(PnnConfig::default().with_device("cuda:0").is_err());
        assert!(PnnConfig::default().with_task("ranking").is_err());
    }

    #[test]
    fn test_seed_reproducibility() {
        let a = PNN::new(columns(), PnnConfig::default().with_products(true, true)).unwrap();
        let b = PNN::new(columns(), PnnConfig::default().with_products(true, true)).unwrap();
        assert_eq!(a.forward(&input(4)).unwrap(), b.forward(&input(4)).unwrap());
        assert_eq!(a.state_dict(), b.state_dict());

        let c = PNN::new(
            columns(),
            PnnConfig::default().with_products(true, true).with_seed(7),
        )
        .unwrap();
        assert_ne!(a.state_dict(), c.state_dict());
    }

    #[test]
    fn test_regression_task_is_unbounded_identity() {
        let config = PnnConfig::default().with_task("regression").unwrap();
        let model = PNN::new(columns(), config).unwrap();
        let mut state = model.state_dict();
        // push the output bias far outside (0, 1)
        state.insert("out.bias".to_string(), Tensor::from_data(&[1], vec![5.0]));
        let mut model = model;
        model.load_state_dict(&state).unwrap();
        let y = model.forward(&input(2)).unwrap();
        assert!(y.data().iter().all(|&v| v > 4.0));
    }

    #[test]
    fn test_regularization_registration() {
        let config = PnnConfig {
            l2_reg_dnn: 0.1,
            dnn_hidden_units: vec![8, 4],
            dnn_activation: ActivationType::PReLU,
            ..PnnConfig::default()
        };
        let model = PNN::new(columns(), config).unwrap();
        let names: Vec<&str> = model
            .base()
            .regularization_weights()
            .iter()
            .map(|w| w.name.as_str())
            .collect();
        assert!(names.contains(&"embedding_dict.user.weight"));
        assert!(names.contains(&"dnn.linears.0.weight"));
        assert!(names.contains(&"dnn.activation_layers.1.weight"));
        assert!(names.contains(&"dnn_linear.weight"));
        assert!(!names.contains(&"dnn.linears.0.bias"));

        let loss = model.regularization_loss().unwrap();
        let linear = model
            .named_parameters()
            .into_iter()
            .find(|(n, _)| n == "dnn_linear.weight")
            .map(|(_, p)| p.sqr().sum())
            .unwrap();
        assert!(loss >= 0.1 * linear);
    }

    #[test]
    fn test_dnn_penalty_is_sum_over_registered_kernels() {
        let plain = PNN::new(columns(), PnnConfig::default()).unwrap();
        let config = PnnConfig {
            l2_reg_dnn: 0.1,
            ..PnnConfig::default()
        };
        let model = PNN::new(columns(), config).unwrap();

        // same seed, same weights: only the DNN term differs
        let kernels: f32 = model
            .named_parameters()
            .into_iter()
            .filter(|(n, _)| {
                n == "dnn_linear.weight" || (n.starts_with("dnn.linears.") && n.ends_with("weight"))
            })
            .map(|(_, p)| p.sqr().sum())
            .sum();
        let extra = model.regularization_loss().unwrap() - plain.regularization_loss().unwrap();
        assert_relative_eq!(extra, 0.1 * kernels, max_relative = 1e-4);
    }

    #[test]
    fn test_varlen_and_meta_transformation() {
        let cols: Vec<FeatureColumn> = vec![
            SparseFeat::new("domain", 3).into(),
            SparseFeat::new("item", 10).into(),
            VarLenSparseFeat::new(SparseFeat::new("hist", 10).with_embedding_name("item"), 3).into(),
        ];
        let plain = PNN::new(cols.clone(), PnnConfig::default().with_products(true, true)).unwrap();
        let meta = PNN::new(
            cols,
            PnnConfig::default()
                .with_products(true, true)
                .with_meta_transformation("domain", 3),
        )
        .unwrap();
        assert!(meta.base().meta().is_some());

        let x = Tensor::from_data(&[2, 5], vec![0.0, 1.0, 1.0, 2.0, 0.0, 2.0, 3.0, 0.0, 0.0, 0.0]);
        let y_plain = plain.forward(&x).unwrap();
        let y_meta = meta.forward(&x).unwrap();
        assert_eq!(y_meta.shape(), &[2, 1]);
        assert_eq!(y_plain.shape(), &[2, 1]);

        let bad_domain = Tensor::from_data(&[1, 5], vec![3.0, 1.0, 0.0, 0.0, 0.0]);
        assert!(meta.forward(&bad_domain).is_err());
    }

    #[test]
    fn test_forward_rejects_wrong_width() {
        let model = PNN::new(columns(), PnnConfig::default()).unwrap();
        assert!(model.forward(&Tensor::zeros(&[2, 3])).is_err());
    }
}
