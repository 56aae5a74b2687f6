#![allow(clippy::needless_range_loop)]
//! Tensor type for neural network computations.
//!
//! [`Tensor`] is a dense, row-major `f32` array. It carries just enough
//! operations for the embedding, product and feedforward layers of this
//! crate: element-wise arithmetic with the few broadcasts those layers need,
//! 2-D matrix multiplication, and the reshaping helpers (`concat`, `split`,
//! `narrow`, `flatten_from`) used to move between per-field and flattened
//! views of a batch.

use rand::rngs::StdRng;
use rand::Rng;
use rand_distr::{Distribution, Normal};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::LayerError;

/// A multi-dimensional array for neural network computations.
///
/// Deserialization checks that `data` holds exactly `shape.iter().product()`
/// values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TensorDef")]
pub struct Tensor {
    /// The shape of the tensor (dimensions)
    shape: Vec<usize>,
    /// The underlying data in row-major order
    data: Vec<f32>,
}

/// Unchecked serialized form of a [`Tensor`].
#[derive(Deserialize)]
struct TensorDef {
    shape: Vec<usize>,
    data: Vec<f32>,
}

impl TryFrom<TensorDef> for Tensor {
    type Error = LayerError;

    fn try_from(def: TensorDef) -> Result<Self, Self::Error> {
        Tensor::try_from_data(&def.shape, def.data)
    }
}

impl Tensor {
    /// Creates a new tensor with the given shape, filled with zeros.
    ///
    /// # Example
    ///
    /// ```
    /// use ctr_layers::tensor::Tensor;
    ///
    /// let t = Tensor::zeros(&[2, 3]);
    /// assert_eq!(t.shape(), &[2, 3]);
    /// assert_eq!(t.numel(), 6);
    /// ```
    pub fn zeros(shape: &[usize]) -> Self {
        Self::full(shape, 0.0)
    }

    /// Creates a new tensor with the given shape, filled with ones.
    pub fn ones(shape: &[usize]) -> Self {
        Self::full(shape, 1.0)
    }

    /// Creates a new tensor with the given shape, filled with `value`.
    pub fn full(shape: &[usize], value: f32) -> Self {
        let numel: usize = shape.iter().product();
        Self {
            shape: shape.to_vec(),
            data: vec![value; numel],
        }
    }

    /// Creates a new tensor with the given shape and data.
    ///
    /// # Panics
    ///
    /// Panics if the data length doesn't match the shape
    pub fn from_data(shape: &[usize], data: Vec<f32>) -> Self {
        let numel: usize = shape.iter().product();
        assert_eq!(
            data.len(),
            numel,
            "Data length {} doesn't match shape {:?} (expected {})",
            data.len(),
            shape,
            numel
        );
        Self {
            shape: shape.to_vec(),
            data,
        }
    }

    /// Creates a new tensor with the given shape and data, returning an error
    /// instead of panicking when the lengths disagree.
    pub fn try_from_data(shape: &[usize], data: Vec<f32>) -> Result<Self, LayerError> {
        let numel: usize = shape.iter().product();
        if data.len() != numel {
            return Err(LayerError::ShapeMismatch {
                expected: shape.to_vec(),
                actual: vec![data.len()],
            });
        }
        Ok(Self {
            shape: shape.to_vec(),
            data,
        })
    }

    /// Creates a tensor from rows of equal length.
    pub fn from_rows(rows: &[Vec<f32>]) -> Result<Self, LayerError> {
        let width = rows.first().map(Vec::len).unwrap_or(0);
        let mut data = Vec::with_capacity(rows.len() * width);
        for (i, row) in rows.iter().enumerate() {
            if row.len() != width {
                return Err(LayerError::ForwardError {
                    message: format!("row {} has {} values, expected {}", i, row.len(), width),
                });
            }
            data.extend_from_slice(row);
        }
        Ok(Self {
            shape: vec![rows.len(), width],
            data,
        })
    }

    /// Creates a tensor with values drawn from `N(mean, std)`.
    ///
    /// A `std` of zero yields a constant tensor filled with `mean`.
    pub fn randn(shape: &[usize], mean: f32, std: f32, rng: &mut StdRng) -> Self {
        let numel: usize = shape.iter().product();
        let data = match Normal::new(mean, std) {
            Ok(normal) if std > 0.0 => (0..numel).map(|_| normal.sample(rng)).collect(),
            _ => vec![mean; numel],
        };
        Self {
            shape: shape.to_vec(),
            data,
        }
    }

    /// Creates a tensor with values drawn uniformly from `[low, high)`.
    pub fn rand_uniform(shape: &[usize], low: f32, high: f32, rng: &mut StdRng) -> Self {
        let numel: usize = shape.iter().product();
        let data = if high > low {
            (0..numel).map(|_| rng.gen_range(low..high)).collect()
        } else {
            vec![low; numel]
        };
        Self {
            shape: shape.to_vec(),
            data,
        }
    }

    /// Returns the shape of the tensor.
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Returns the number of dimensions.
    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    /// Returns the total number of elements.
    pub fn numel(&self) -> usize {
        self.data.len()
    }

    /// Returns a reference to the underlying data.
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Returns a mutable reference to the underlying data.
    pub fn data_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    /// Consumes the tensor and returns its data.
    pub fn into_data(self) -> Vec<f32> {
        self.data
    }

    /// Matrix multiplication between two 2D tensors.
    ///
    /// Output rows are computed in parallel.
    ///
    /// # Panics
    ///
    /// Panics if either tensor is not 2D or the inner dimensions don't match
    pub fn matmul(&self, other: &Tensor) -> Tensor {
        assert_eq!(self.ndim(), 2, "matmul requires 2D tensors");
        assert_eq!(other.ndim(), 2, "matmul requires 2D tensors");
        assert_eq!(
            self.shape[1], other.shape[0],
            "Inner dimensions must match for matmul"
        );

        let m = self.shape[0];
        let k = self.shape[1];
        let n = other.shape[1];

        let mut result = vec![0.0; m * n];
        if n > 0 {
            result
                .par_chunks_mut(n)
                .enumerate()
                .for_each(|(i, out_row)| {
                    let lhs = &self.data[i * k..(i + 1) * k];
                    for (l, &a) in lhs.iter().enumerate() {
                        if a == 0.0 {
                            continue;
                        }
                        let rhs = &other.data[l * n..(l + 1) * n];
                        for (o, &b) in out_row.iter_mut().zip(rhs) {
                            *o += a * b;
                        }
                    }
                });
        }

        Tensor::from_data(&[m, n], result)
    }

    /// Transposes a 2D tensor.
    pub fn transpose(&self) -> Tensor {
        assert_eq!(self.ndim(), 2, "transpose requires 2D tensor");
        let m = self.shape[0];
        let n = self.shape[1];

        let mut result = vec![0.0; m * n];
        for i in 0..m {
            for j in 0..n {
                result[j * m + i] = self.data[i * n + j];
            }
        }

        Tensor::from_data(&[n, m], result)
    }

    /// Element-wise addition with broadcasting.
    ///
    /// Supports equal shapes, a single-element `other`, and a 1D `other`
    /// whose length equals the last dimension of `self`.
    pub fn add(&self, other: &Tensor) -> Tensor {
        self.zip_broadcast(other, |a, b| a + b, "add")
    }

    /// Element-wise subtraction with the same broadcasting rules as [`Tensor::add`].
    pub fn sub(&self, other: &Tensor) -> Tensor {
        self.zip_broadcast(other, |a, b| a - b, "subtract")
    }

    /// Element-wise multiplication with the same broadcasting rules as [`Tensor::add`].
    pub fn mul(&self, other: &Tensor) -> Tensor {
        self.zip_broadcast(other, |a, b| a * b, "multiply")
    }

    fn zip_broadcast<F>(&self, other: &Tensor, f: F, op: &str) -> Tensor
    where
        F: Fn(f32, f32) -> f32,
    {
        if self.shape == other.shape {
            let data: Vec<f32> = self
                .data
                .iter()
                .zip(other.data.iter())
                .map(|(&a, &b)| f(a, b))
                .collect();
            Tensor::from_data(&self.shape, data)
        } else if other.numel() == 1 {
            let scalar = other.data[0];
            let data: Vec<f32> = self.data.iter().map(|&a| f(a, scalar)).collect();
            Tensor::from_data(&self.shape, data)
        } else if other.ndim() == 1 && self.shape.last() == Some(&other.shape[0]) {
            // Broadcast along rows (bias-style)
            let n = other.shape[0];
            let data: Vec<f32> = self
                .data
                .iter()
                .enumerate()
                .map(|(i, &a)| f(a, other.data[i % n]))
                .collect();
            Tensor::from_data(&self.shape, data)
        } else {
            panic!(
                "Cannot {} shapes {:?} and {:?}",
                op, self.shape, other.shape
            );
        }
    }

    /// Scalar multiplication.
    pub fn scale(&self, scalar: f32) -> Tensor {
        self.map(|a| a * scalar)
    }

    /// Element-wise absolute value.
    pub fn abs(&self) -> Tensor {
        self.map(f32::abs)
    }

    /// Element-wise square.
    pub fn sqr(&self) -> Tensor {
        self.map(|a| a * a)
    }

    /// Sum all elements in the tensor.
    pub fn sum(&self) -> f32 {
        self.data.iter().sum()
    }

    /// Mean of all elements; zero for an empty tensor.
    pub fn mean(&self) -> f32 {
        if self.data.is_empty() {
            0.0
        } else {
            self.sum() / self.numel() as f32
        }
    }

    /// Sum along an axis of a 2D tensor.
    pub fn sum_axis(&self, axis: usize) -> Tensor {
        assert_eq!(self.ndim(), 2, "sum_axis only implemented for 2D tensors");
        assert!(axis < 2, "Axis out of bounds");

        let m = self.shape[0];
        let n = self.shape[1];
        if axis == 0 {
            let mut result = vec![0.0; n];
            for i in 0..m {
                for j in 0..n {
                    result[j] += self.data[i * n + j];
                }
            }
            Tensor::from_data(&[n], result)
        } else {
            let result: Vec<f32> = (0..m)
                .map(|i| self.data[i * n..(i + 1) * n].iter().sum())
                .collect();
            Tensor::from_data(&[m], result)
        }
    }

    /// Mean along an axis of a 2D tensor.
    pub fn mean_axis(&self, axis: usize) -> Tensor {
        let count = self.shape[axis].max(1) as f32;
        self.sum_axis(axis).scale(1.0 / count)
    }

    /// Apply a function element-wise.
    pub fn map<F>(&self, f: F) -> Tensor
    where
        F: Fn(f32) -> f32,
    {
        let data: Vec<f32> = self.data.iter().map(|&x| f(x)).collect();
        Tensor::from_data(&self.shape, data)
    }

    /// Reshape the tensor to a new shape.
    ///
    /// # Panics
    ///
    /// Panics if the new shape has a different number of elements
    pub fn reshape(&self, new_shape: &[usize]) -> Tensor {
        let new_numel: usize = new_shape.iter().product();
        assert_eq!(
            self.numel(),
            new_numel,
            "Cannot reshape tensor of {} elements to shape {:?}",
            self.numel(),
            new_shape
        );
        Tensor::from_data(new_shape, self.data.clone())
    }

    /// Collapses every dimension from `start_dim` onwards into one.
    ///
    /// ```
    /// use ctr_layers::tensor::Tensor;
    ///
    /// let t = Tensor::zeros(&[4, 3, 2]);
    /// assert_eq!(t.flatten_from(1).shape(), &[4, 6]);
    /// ```
    pub fn flatten_from(&self, start_dim: usize) -> Tensor {
        if start_dim >= self.ndim() {
            return self.clone();
        }
        let mut shape = self.shape[..start_dim].to_vec();
        shape.push(self.shape[start_dim..].iter().product());
        Tensor::from_data(&shape, self.data.clone())
    }

    /// Concatenates tensors along `axis`.
    ///
    /// All tensors must have the same rank and agree on every dimension
    /// other than `axis`.
    pub fn concat(tensors: &[Tensor], axis: usize) -> Result<Tensor, LayerError> {
        let first = tensors.first().ok_or_else(|| LayerError::ForwardError {
            message: "concat expects a non-empty tensor list".to_string(),
        })?;
        if axis >= first.ndim() {
            return Err(LayerError::ForwardError {
                message: format!("concat axis {} out of range for {}D tensors", axis, first.ndim()),
            });
        }

        for t in &tensors[1..] {
            let compatible = t.ndim() == first.ndim()
                && t
                    .shape
                    .iter()
                    .zip(first.shape.iter())
                    .enumerate()
                    .all(|(d, (a, b))| d == axis || a == b);
            if !compatible {
                return Err(LayerError::ShapeMismatch {
                    expected: first.shape.clone(),
                    actual: t.shape.clone(),
                });
            }
        }

        let outer: usize = first.shape[..axis].iter().product();
        let mut shape = first.shape.clone();
        shape[axis] = tensors.iter().map(|t| t.shape[axis]).sum();

        let numel: usize = shape.iter().product();
        let mut data = Vec::with_capacity(numel);
        for o in 0..outer {
            for t in tensors {
                let chunk: usize = t.shape[axis..].iter().product();
                data.extend_from_slice(&t.data[o * chunk..(o + 1) * chunk]);
            }
        }

        Ok(Tensor::from_data(&shape, data))
    }

    /// Returns the sub-tensor `[start, start + len)` along `axis`.
    pub fn narrow(&self, axis: usize, start: usize, len: usize) -> Result<Tensor, LayerError> {
        if axis >= self.ndim() || start + len > self.shape[axis] {
            return Err(LayerError::ForwardError {
                message: format!(
                    "cannot narrow axis {} to [{}, {}) for shape {:?}",
                    axis,
                    start,
                    start + len,
                    self.shape
                ),
            });
        }

        let outer: usize = self.shape[..axis].iter().product();
        let inner: usize = self.shape[axis + 1..].iter().product();
        let stride = self.shape[axis] * inner;

        let mut data = Vec::with_capacity(outer * len * inner);
        for o in 0..outer {
            let base = o * stride + start * inner;
            data.extend_from_slice(&self.data[base..base + len * inner]);
        }

        let mut shape = self.shape.clone();
        shape[axis] = len;
        Ok(Tensor::from_data(&shape, data))
    }

    /// Splits the tensor along `axis` into chunks of the given sizes.
    pub fn split(&self, axis: usize, sizes: &[usize]) -> Result<Vec<Tensor>, LayerError> {
        let total: usize = sizes.iter().sum();
        if axis >= self.ndim() || total != self.shape[axis] {
            return Err(LayerError::ForwardError {
                message: format!(
                    "split sizes {:?} do not cover axis {} of shape {:?}",
                    sizes, axis, self.shape
                ),
            });
        }

        let mut start = 0;
        let mut parts = Vec::with_capacity(sizes.len());
        for &size in sizes {
            parts.push(self.narrow(axis, start, size)?);
            start += size;
        }
        Ok(parts)
    }

    /// Gathers rows along axis 0.
    pub fn select_rows(&self, indices: &[usize]) -> Result<Tensor, LayerError> {
        if self.ndim() == 0 {
            return Err(LayerError::ForwardError {
                message: "select_rows requires at least a 1D tensor".to_string(),
            });
        }
        let rows = self.shape[0];
        let row_len: usize = self.shape[1..].iter().product();

        let mut data = Vec::with_capacity(indices.len() * row_len);
        for &idx in indices {
            if idx >= rows {
                return Err(LayerError::ForwardError {
                    message: format!("row index {} out of range for {} rows", idx, rows),
                });
            }
            data.extend_from_slice(&self.data[idx * row_len..(idx + 1) * row_len]);
        }

        let mut shape = self.shape.clone();
        shape[0] = indices.len();
        Ok(Tensor::from_data(&shape, data))
    }
}

impl std::ops::Add for &Tensor {
    type Output = Tensor;

    fn add(self, other: &Tensor) -> Tensor {
        Tensor::add(self, other)
    }
}

impl std::ops::Mul for &Tensor {
    type Output = Tensor;

    fn mul(self, other: &Tensor) -> Tensor {
        Tensor::mul(self, other)
    }
}
