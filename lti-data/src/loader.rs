//! # Batch loader
//!
//! Shuffled, drop-last batching over a [`TensorDataset`]. Every call to
//! [`DataLoader::epoch`] draws a fresh permutation; the trailing
//! `len % batch_size` samples of each permutation are skipped.

use ndarray::{Dimension, RemoveAxis};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use tracing::trace;

use crate::dataset::{Batch, TensorDataset};
use crate::error::{DataError, Result};

/// Shuffling batch iterator factory
#[derive(Debug)]
pub struct DataLoader<'a, D: Dimension> {
    dataset: &'a TensorDataset<D>,
    batch_size: usize,
    rng: StdRng,
}

impl<'a, D: Dimension + RemoveAxis> DataLoader<'a, D> {
    pub fn new(dataset: &'a TensorDataset<D>, batch_size: usize) -> Result<Self> {
        if batch_size == 0 {
            return Err(DataError::InvalidBatchSize(batch_size));
        }
        Ok(Self {
            dataset,
            batch_size,
            rng: StdRng::from_entropy(),
        })
    }

    /// Deterministic shuffling
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Full batches per epoch
    pub fn len(&self) -> usize {
        self.dataset.len() / self.batch_size
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Start a new epoch with a fresh shuffle
    pub fn epoch(&mut self) -> Batches<'a, D> {
        let mut order: Vec<usize> = (0..self.dataset.len()).collect();
        order.shuffle(&mut self.rng);
        trace!(samples = order.len(), batches = self.len(), "New epoch");

        Batches {
            dataset: self.dataset,
            order,
            batch_size: self.batch_size,
            cursor: 0,
        }
    }
}

/// Batches of one epoch
#[derive(Debug)]
pub struct Batches<'a, D: Dimension> {
    dataset: &'a TensorDataset<D>,
    order: Vec<usize>,
    batch_size: usize,
    cursor: usize,
}

impl<D: Dimension + RemoveAxis> Iterator for Batches<'_, D> {
    type Item = Batch<D>;

    fn next(&mut self) -> Option<Self::Item> {
        let end = self.cursor + self.batch_size;
        if end > self.order.len() {
            return None;
        }
        let batch = self.dataset.select(&self.order[self.cursor..end]);
        self.cursor = end;
        Some(batch)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.order.len() - self.cursor) / self.batch_size;
        (remaining, Some(remaining))
    }
}

impl<D: Dimension + RemoveAxis> ExactSizeIterator for Batches<'_, D> {}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array1, Array2};

    fn dataset(n: usize) -> TensorDataset<ndarray::Ix2> {
        let data = Array2::from_shape_fn((n, 3), |(i, j)| (i * 3 + j) as f32);
        let labels = Array1::from_iter((0..n).map(|i| i as i64));
        TensorDataset::new(data, labels).unwrap()
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let ds = dataset(4);
        assert!(matches!(
            DataLoader::new(&ds, 0),
            Err(DataError::InvalidBatchSize(0))
        ));
    }

    #[test]
    fn test_drop_last() {
        let ds = dataset(10);
        let mut loader = DataLoader::new(&ds, 3).unwrap().with_seed(1);
        assert_eq!(loader.len(), 3);

        let batches = loader.epoch();
        assert_eq!(batches.len(), 3);
        let batches: Vec<_> = batches.collect();
        assert_eq!(batches.len(), 3);
        assert!(batches.iter().all(|b| b.len() == 3));
    }

    #[test]
    fn test_epoch_is_permutation() {
        let ds = dataset(12);
        let mut loader = DataLoader::new(&ds, 4).unwrap().with_seed(7);

        let mut seen: Vec<usize> = loader.epoch().flat_map(|b| b.indices).collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..12).collect::<Vec<_>>());
    }

    #[test]
    fn test_batch_rows_follow_indices() {
        let ds = dataset(9);
        let mut loader = DataLoader::new(&ds, 2).unwrap().with_seed(3);
        for batch in loader.epoch() {
            for (row, &index) in batch.indices.iter().enumerate() {
                assert_eq!(batch.labels[row], index as i64);
                assert_eq!(batch.data[[row, 0]], (index * 3) as f32);
            }
        }
    }

    #[test]
    fn test_reshuffles_each_epoch() {
        let ds = dataset(64);
        let mut loader = DataLoader::new(&ds, 8).unwrap().with_seed(11);
        let first: Vec<usize> = loader.epoch().flat_map(|b| b.indices).collect();
        let second: Vec<usize> = loader.epoch().flat_map(|b| b.indices).collect();
        assert_ne!(first, second);
    }

    #[test]
    fn test_same_seed_same_order() {
        let ds = dataset(20);
        let a: Vec<usize> = DataLoader::new(&ds, 5)
            .unwrap()
            .with_seed(42)
            .epoch()
            .flat_map(|b| b.indices)
            .collect();
        let b: Vec<usize> = DataLoader::new(&ds, 5)
            .unwrap()
            .with_seed(42)
            .epoch()
            .flat_map(|b| b.indices)
            .collect();
        assert_eq!(a, b);
    }

    #[test]
    fn test_batch_larger_than_dataset() {
        let ds = dataset(3);
        let mut loader = DataLoader::new(&ds, 5).unwrap();
        assert!(loader.is_empty());
        assert_eq!(loader.epoch().count(), 0);
    }
}
