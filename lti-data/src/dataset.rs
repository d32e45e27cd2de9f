//! # In-memory datasets
//!
//! A [`TensorDataset`] pairs a float tensor whose first axis indexes samples
//! with one integer label per sample.

use ndarray::{Array, Array1, ArrayView, Axis, Dimension, RemoveAxis};

use crate::error::{DataError, Result};

/// A batch gathered from a dataset
#[derive(Debug, Clone, PartialEq)]
pub struct Batch<D: Dimension> {
    /// Samples stacked along axis 0
    pub data: Array<f32, D>,
    pub labels: Array1<i64>,
    /// Dataset positions the batch was drawn from
    pub indices: Vec<usize>,
}

impl<D: Dimension> Batch<D> {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Samples and labels held in memory
#[derive(Debug, Clone)]
pub struct TensorDataset<D: Dimension> {
    data: Array<f32, D>,
    labels: Array1<i64>,
}

impl<D: Dimension + RemoveAxis> TensorDataset<D> {
    pub fn new(data: Array<f32, D>, labels: Array1<i64>) -> Result<Self> {
        if data.ndim() == 0 || data.len_of(Axis(0)) != labels.len() {
            return Err(DataError::ShapeMismatch {
                expected: format!("{} samples", labels.len()),
                actual: format!("{:?}", data.shape()),
            });
        }
        Ok(Self { data, labels })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Sample `index` and its label
    pub fn get(&self, index: usize) -> Option<(ArrayView<'_, f32, D::Smaller>, i64)> {
        (index < self.len()).then(|| (self.data.index_axis(Axis(0), index), self.labels[index]))
    }

    pub fn data(&self) -> &Array<f32, D> {
        &self.data
    }

    pub fn labels(&self) -> &Array1<i64> {
        &self.labels
    }

    /// Shape of a single sample
    pub fn sample_shape(&self) -> &[usize] {
        &self.data.shape()[1..]
    }

    /// Gather the samples at `indices` into a batch
    ///
    /// # Panics
    /// If any index is out of bounds.
    pub fn select(&self, indices: &[usize]) -> Batch<D> {
        Batch {
            data: self.data.select(Axis(0), indices),
            labels: self.labels.select(Axis(0), indices),
            indices: indices.to_vec(),
        }
    }

    pub fn into_parts(self) -> (Array<f32, D>, Array1<i64>) {
        (self.data, self.labels)
    }
}
