//! Domain-conditioned meta transformation of field embeddings.
//!
//! Each sample carries a domain id. The domain embedding and the flattened
//! field embeddings feed a small meta network whose output gates every
//! embedding coordinate:
//!
//! ```text
//! g   = W · dnn([domain_emb, flatten(emb)]) + b        // [B, F*E]
//! out = emb ⊙ 2σ(g)                                     // [B, F, E]
//! ```
//!
//! The projection starts near zero, so a freshly initialised transformation
//! is close to the identity.

use ctr_layers::activation::Sigmoid;
use ctr_layers::embedding::id_from_value;
use ctr_layers::{ActivationType, DNNConfig, Dense, EmbeddingTable, Initializer, Layer, Tensor, DNN};
use rand::rngs::StdRng;

use crate::error::{ModelError, Result};

/// Flag value that enables the meta transformation.
pub const METATRANS_FLAG: &str = "metatrans";

/// Settings of a [`MetaTransformation`].
#[derive(Debug, Clone, PartialEq)]
pub struct MetaConfig {
    /// Input column holding the domain id
    pub domain_column: usize,
    /// Number of distinct domains
    pub num_domains: usize,
    /// Number of sparse fields
    pub num_fields: usize,
    /// Common embedding dimension
    pub embedding_size: usize,
    /// Hidden units of the meta network (may be empty)
    pub hidden_units: Vec<usize>,
    /// Standard deviation of every initializer
    pub init_std: f32,
    /// Seed for the meta network's dropout
    pub seed: u64,
}

/// Domain-conditioned gating of field embeddings.
#[derive(Debug, Clone)]
pub struct MetaTransformation {
    config: MetaConfig,
    domain_embedding: EmbeddingTable,
    meta_dnn: Option<DNN>,
    projection: Dense,
    training: bool,
}

impl MetaTransformation {
    /// Builds the transformation, drawing every weight from `rng`.
    pub fn new(config: MetaConfig, rng: &mut StdRng) -> Result<Self> {
        if config.num_domains == 0 {
            return Err(ModelError::config("num_domains must be positive"));
        }
        if config.num_fields == 0 || config.embedding_size == 0 {
            return Err(ModelError::config(
                "meta transformation needs at least one sparse feature",
            ));
        }

        let fields_dim = config.num_fields * config.embedding_size;
        let domain_embedding =
            EmbeddingTable::new(config.num_domains, config.embedding_size, config.init_std, rng);

        let meta_input = config.embedding_size + fields_dim;
        let meta_dnn = if config.hidden_units.is_empty() {
            None
        } else {
            let dnn_config = DNNConfig::new(meta_input, config.hidden_units.clone())
                .with_activation(ActivationType::ReLU)
                .with_init_std(config.init_std)
                .with_seed(config.seed);
            Some(DNN::from_config(dnn_config, rng)?)
        };

        let projection_in = meta_dnn.as_ref().map(DNN::output_dim).unwrap_or(meta_input);
        let projection = Dense::new_with_initializer(
            projection_in,
            fields_dim,
            Initializer::normal(config.init_std),
            true,
            rng,
        );

        Ok(Self {
            config,
            domain_embedding,
            meta_dnn,
            projection,
            training: false,
        })
    }

    /// Returns the configuration.
    pub fn config(&self) -> &MetaConfig {
        &self.config
    }

    /// Returns whether the meta network runs in training mode.
    pub fn is_training(&self) -> bool {
        self.training
    }

    /// Reads one domain id per sample from the input matrix.
    fn domain_ids(&self, x: &Tensor) -> Result<Vec<usize>> {
        let width = x.shape()[1];
        x.data()
            .chunks(width)
            .map(|row| {
                let id = id_from_value(row[self.config.domain_column])?;
                if id >= self.config.num_domains {
                    return Err(ModelError::invalid_input(format!(
                        "domain id {} out of range for {} domains",
                        id, self.config.num_domains
                    )));
                }
                Ok(id)
            })
            .collect()
    }

    /// Transforms stacked field embeddings `[B, F, E]` for the samples in `x`.
    pub fn forward(&self, x: &Tensor, sparse_input: &Tensor) -> Result<Tensor> {
        if x.ndim() != 2 || x.shape()[1] <= self.config.domain_column {
            return Err(ModelError::invalid_input(format!(
                "expected a 2D input with more than {} columns, got shape {:?}",
                self.config.domain_column,
                x.shape()
            )));
        }
        let expected = [self.config.num_fields, self.config.embedding_size];
        if sparse_input.ndim() != 3 || sparse_input.shape()[1..] != expected {
            return Err(ctr_layers::LayerError::ShapeMismatch {
                expected: vec![x.shape()[0], expected[0], expected[1]],
                actual: sparse_input.shape().to_vec(),
            }
            .into());
        }

        let ids = self.domain_ids(x)?;
        let domain = self.domain_embedding.lookup(&ids)?;
        let flat = sparse_input.flatten_from(1);

        let mut hidden = Tensor::concat(&[domain, flat.clone()], 1)?;
        if let Some(dnn) = &self.meta_dnn {
            hidden = dnn.forward(&hidden)?;
        }
        let gate = self
            .projection
            .forward(&hidden)?
            .map(|g| 2.0 * Sigmoid::apply(g));

        Ok(flat.mul(&gate).reshape(sparse_input.shape()))
    }

    /// Parameters named relative to the transformation.
    pub fn named_parameters(&self) -> Vec<(String, &Tensor)> {
        let mut params = vec![("domain_embedding.weight".to_string(), self.domain_embedding.weight())];
        if let Some(dnn) = &self.meta_dnn {
            for (name, p) in dnn.named_parameters() {
                params.push((format!("dnn.{}", name), p));
            }
        }
        for (name, p) in self.projection.named_parameters() {
            params.push((format!("projection.{}", name), p));
        }
        params
    }

    /// Mutable parameters in the order of [`MetaTransformation::named_parameters`].
    pub fn parameters_mut(&mut self) -> Vec<&mut Tensor> {
        let mut params = self.domain_embedding.parameters_mut();
        if let Some(dnn) = &mut self.meta_dnn {
            params.extend(dnn.parameters_mut());
        }
        params.extend(self.projection.parameters_mut());
        params
    }

    /// Switches dropout and batch norm of the meta network.
    pub fn set_training(&mut self, training: bool) {
        self.training = training;
        if let Some(dnn) = &mut self.meta_dnn {
            dnn.set_training(training);
        }
    }
}
