//! Pairwise product layers over field embeddings.
//!
//! Both layers consume `F` field embeddings of shape `[B, 1, E]` (or a single
//! stacked `[B, F, E]` tensor through [`Layer::forward`]) and visit the
//! `P = F(F-1)/2` field pairs in the order `(0,1), (0,2), ..., (F-2,F-1)`.

use std::fmt;
use std::str::FromStr;

use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::error::LayerError;
use crate::initializer::Initializer;
use crate::layer::Layer;
use crate::tensor::Tensor;

/// Returns the `(row, col)` field index of every pair, in visiting order.
pub fn pair_indices(num_fields: usize) -> (Vec<usize>, Vec<usize>) {
    let mut row = Vec::new();
    let mut col = Vec::new();
    for i in 0..num_fields.saturating_sub(1) {
        for j in i + 1..num_fields {
            row.push(i);
            col.push(j);
        }
    }
    (row, col)
}

/// Number of field pairs for `num_fields` fields.
pub fn num_pairs(num_fields: usize) -> usize {
    num_fields * num_fields.saturating_sub(1) / 2
}

/// Stacks field embeddings `[B, 1, E]` into `[B, F, E]`.
fn stack_fields(fields: &[Tensor]) -> Result<Tensor, LayerError> {
    for t in fields {
        if t.ndim() != 3 || t.shape()[1] != 1 {
            return Err(LayerError::forward(format!(
                "field embeddings must be [batch, 1, dim], got {:?}",
                t.shape()
            )));
        }
    }
    Tensor::concat(fields, 1)
}

/// Gathers the left and right member of every pair from `[B, F, E]`,
/// returning two `[B, P, E]` tensors.
fn gather_pairs(stacked: &Tensor) -> Result<(Tensor, Tensor), LayerError> {
    if stacked.ndim() != 3 {
        return Err(LayerError::forward(format!(
            "product layers expect [batch, fields, dim] input, got {:?}",
            stacked.shape()
        )));
    }
    let (batch, fields, dim) = (stacked.shape()[0], stacked.shape()[1], stacked.shape()[2]);
    if fields < 2 {
        return Err(LayerError::forward(format!(
            "product layers need at least two fields, got {}",
            fields
        )));
    }

    let (row, col) = pair_indices(fields);
    let pairs = row.len();
    let mut p = Vec::with_capacity(batch * pairs * dim);
    let mut q = Vec::with_capacity(batch * pairs * dim);
    for b in 0..batch {
        let sample = &stacked.data()[b * fields * dim..(b + 1) * fields * dim];
        for (&i, &j) in row.iter().zip(&col) {
            p.extend_from_slice(&sample[i * dim..(i + 1) * dim]);
            q.extend_from_slice(&sample[j * dim..(j + 1) * dim]);
        }
    }

    Ok((
        Tensor::from_data(&[batch, pairs, dim], p),
        Tensor::from_data(&[batch, pairs, dim], q),
    ))
}

/// Inner product of every field pair.
///
/// Output is `[B, P, 1]` when `reduce_sum` is set and the element-wise
/// product `[B, P, E]` otherwise.
///
/// # Example
///
/// ```
/// use ctr_layers::interaction::InnerProductLayer;
/// use ctr_layers::tensor::Tensor;
///
/// let layer = InnerProductLayer::new(true);
/// let fields = vec![Tensor::ones(&[2, 1, 4]); 3];
/// let out = layer.forward_fields(&fields).unwrap();
/// assert_eq!(out.shape(), &[2, 3, 1]);
/// assert_eq!(out.data()[0], 4.0);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct InnerProductLayer {
    reduce_sum: bool,
}

impl InnerProductLayer {
    /// Creates an inner product layer.
    pub fn new(reduce_sum: bool) -> Self {
        Self { reduce_sum }
    }

    /// Returns whether the product is summed over the embedding axis.
    pub fn reduce_sum(&self) -> bool {
        self.reduce_sum
    }

    /// Applies the layer to a list of `[B, 1, E]` field embeddings.
    pub fn forward_fields(&self, fields: &[Tensor]) -> Result<Tensor, LayerError> {
        self.forward(&stack_fields(fields)?)
    }
}

impl Default for InnerProductLayer {
    fn default() -> Self {
        Self::new(true)
    }
}

impl Layer for InnerProductLayer {
    fn forward(&self, input: &Tensor) -> Result<Tensor, LayerError> {
        let (p, q) = gather_pairs(input)?;
        let product = p.mul(&q);
        if !self.reduce_sum {
            return Ok(product);
        }

        let (batch, pairs, dim) = (product.shape()[0], product.shape()[1], product.shape()[2]);
        let data = product
            .data()
            .chunks(dim.max(1))
            .map(|chunk| chunk.iter().sum())
            .take(batch * pairs)
            .collect();
        Tensor::try_from_data(&[batch, pairs, 1], data)
    }

    fn parameters(&self) -> Vec<&Tensor> {
        vec![]
    }

    fn parameters_mut(&mut self) -> Vec<&mut Tensor> {
        vec![]
    }

    fn name(&self) -> &str {
        "InnerProductLayer"
    }
}

/// Shape of the outer product kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum KernelType {
    /// Full `[E, P, E]` kernel
    #[default]
    Mat,
    /// Per-pair diagonal `[P, E]` kernel
    Vec,
    /// Per-pair scalar `[P, 1]` kernel
    Num,
}

impl KernelType {
    /// Returns the lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            KernelType::Mat => "mat",
            KernelType::Vec => "vec",
            KernelType::Num => "num",
        }
    }

    /// Kernel shape for `num_pairs` pairs of `embedding_size`-dim fields.
    pub fn kernel_shape(&self, num_pairs: usize, embedding_size: usize) -> Vec<usize> {
        match self {
            KernelType::Mat => vec![embedding_size, num_pairs, embedding_size],
            KernelType::Vec => vec![num_pairs, embedding_size],
            KernelType::Num => vec![num_pairs, 1],
        }
    }
}

impl fmt::Display for KernelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KernelType {
    type Err = LayerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mat" => Ok(KernelType::Mat),
            "vec" => Ok(KernelType::Vec),
            "num" => Ok(KernelType::Num),
            _ => Err(LayerError::config("kernel_type must be mat, vec or num")),
        }
    }
}

impl TryFrom<String> for KernelType {
    type Error = LayerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<KernelType> for String {
    fn from(value: KernelType) -> Self {
        value.as_str().to_string()
    }
}

/// Kernel-weighted outer product of every field pair, output `[B, P]`.
///
/// For pair `k` with left embedding `p` and right embedding `q`:
///
/// * `mat`: `Σ_e q[e] · Σ_j K[e, k, j] · p[j]`
/// * `vec`: `Σ_e p[e] · q[e] · K[k, e]`
/// * `num`: `K[k] · Σ_e p[e] · q[e]`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OuterProductLayer {
    field_size: usize,
    embedding_size: usize,
    kernel_type: KernelType,
    kernel: Tensor,
}

impl OuterProductLayer {
    /// Creates an outer product layer with a Xavier-uniform kernel.
    ///
    /// # Errors
    ///
    /// Returns an error if there are fewer than two fields or the embedding
    /// size is zero
    pub fn new(
        field_size: usize,
        embedding_size: usize,
        kernel_type: KernelType,
        rng: &mut StdRng,
    ) -> Result<Self, LayerError> {
        if field_size < 2 {
            return Err(LayerError::config(format!(
                "OuterProductLayer needs at least two fields, got {}",
                field_size
            )));
        }
        if embedding_size == 0 {
            return Err(LayerError::config("embedding_size must be positive"));
        }

        let shape = kernel_type.kernel_shape(num_pairs(field_size), embedding_size);
        let kernel = Initializer::XavierUniform.initialize(&shape, rng);
        Ok(Self {
            field_size,
            embedding_size,
            kernel_type,
            kernel,
        })
    }

    /// Returns the kernel type.
    pub fn kernel_type(&self) -> KernelType {
        self.kernel_type
    }

    /// Returns the kernel tensor.
    pub fn kernel(&self) -> &Tensor {
        &self.kernel
    }

    /// Returns the number of pairs (the output width).
    pub fn num_pairs(&self) -> usize {
        num_pairs(self.field_size)
    }

    /// Applies the layer to a list of `[B, 1, E]` field embeddings.
    pub fn forward_fields(&self, fields: &[Tensor]) -> Result<Tensor, LayerError> {
        self.forward(&stack_fields(fields)?)
    }
}

impl Layer for OuterProductLayer {
    fn forward(&self, input: &Tensor) -> Result<Tensor, LayerError> {
        if input.ndim() != 3 || input.shape()[1..] != [self.field_size, self.embedding_size] {
            return Err(LayerError::ShapeMismatch {
                expected: vec![
                    input.shape().first().copied().unwrap_or(0),
                    self.field_size,
                    self.embedding_size,
                ],
                actual: input.shape().to_vec(),
            });
        }

        let (p, q) = gather_pairs(input)?;
        let batch = input.shape()[0];
        let pairs = self.num_pairs();
        let dim = self.embedding_size;
        let k = self.kernel.data();

        let mut out = Vec::with_capacity(batch * pairs);
        for b in 0..batch {
            for pair in 0..pairs {
                let base = (b * pairs + pair) * dim;
                let pv = &p.data()[base..base + dim];
                let qv = &q.data()[base..base + dim];
                let value = match self.kernel_type {
                    KernelType::Mat => (0..dim)
                        .map(|e| {
                            let row = (e * pairs + pair) * dim;
                            let projected: f32 =
                                k[row..row + dim].iter().zip(pv).map(|(w, x)| w * x).sum();
                            qv[e] * projected
                        })
                        .sum(),
                    KernelType::Vec => (0..dim)
                        .map(|e| pv[e] * qv[e] * k[pair * dim + e])
                        .sum(),
                    KernelType::Num => {
                        k[pair] * pv.iter().zip(qv).map(|(a, b)| a * b).sum::<f32>()
                    }
                };
                out.push(value);
            }
        }

        Tensor::try_from_data(&[batch, pairs], out)
    }

    fn parameters(&self) -> Vec<&Tensor> {
        vec![&self.kernel]
    }

    fn parameters_mut(&mut self) -> Vec<&mut Tensor> {
        vec![&mut self.kernel]
    }

    fn named_parameters(&self) -> Vec<(String, &Tensor)> {
        vec![("kernel".to_string(), &self.kernel)]
    }

    fn name(&self) -> &str {
        "OuterProductLayer"
    }
}
