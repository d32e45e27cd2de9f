//! # CIFAR-10
//!
//! The five pickled training batches of the CIFAR-10 python release, decoded
//! into a `(N, 3, 32, 32)` tensor with pixel values in [0, 1].

use std::ops::Deref;
use std::path::Path;

use bytes::Bytes;
use ndarray::{Array1, Array4, Ix4};
use tracing::{debug, info};

use crate::config::DatasetConfig;
use crate::dataset::TensorDataset;
use crate::error::{DataError, Result};
use crate::fetch::{self, ArchiveKind};
use crate::loader::DataLoader;
use crate::pickle::{self, NumpyArray, Value};

pub const CIFAR10_URL: &str = "https://www.cs.toronto.edu/~kriz/cifar-10-python.tar.gz";
pub const CIFAR10_DIR: &str = "cifar-10-batches-py";

pub const TRAIN_BATCHES: usize = 5;
pub const RECORDS_PER_BATCH: usize = 10_000;
/// `(channels, height, width)`
pub const IMAGE_SHAPE: (usize, usize, usize) = (3, 32, 32);
pub const IMAGE_BYTES: usize = IMAGE_SHAPE.0 * IMAGE_SHAPE.1 * IMAGE_SHAPE.2;

/// Raw contents of one pickled batch
#[derive(Debug, Clone, PartialEq)]
pub struct CifarBatch {
    /// Row-major `(records, 3072)` bytes, channel planes in R, G, B order
    pub pixels: Bytes,
    pub labels: Vec<i64>,
}

/// Decode and validate one batch file holding `records` images
pub fn read_batch(path: &Path, records: usize) -> Result<CifarBatch> {
    let file = std::fs::File::open(path)?;
    let value = pickle::from_reader(std::io::BufReader::new(file))?;
    decode_batch(&value, records).map_err(|e| match e {
        DataError::Validation(msg) => DataError::Validation(format!("{}: {msg}", path.display())),
        other => other,
    })
}

fn decode_batch(value: &Value, records: usize) -> Result<CifarBatch> {
    let data = value
        .get("data")
        .ok_or_else(|| DataError::Validation("batch has no `data` entry".into()))?;
    let array = NumpyArray::from_value(data)?;

    if array.dtype.trim_start_matches('|') != "u1" {
        return Err(DataError::Validation(format!(
            "Unexpected data type: {}",
            array.dtype
        )));
    }
    if array.shape != [records, IMAGE_BYTES] {
        return Err(DataError::Validation(format!(
            "Unexpected shape of data: {:?}",
            array.shape
        )));
    }
    if array.fortran_order {
        return Err(DataError::Validation("Fortran-ordered data is not supported".into()));
    }
    if array.data.len() != array.element_count() {
        return Err(DataError::Validation(format!(
            "data buffer holds {} bytes, expected {}",
            array.data.len(),
            array.element_count()
        )));
    }

    let labels = value
        .get("labels")
        .and_then(Value::as_sequence)
        .ok_or_else(|| DataError::Validation("batch has no `labels` list".into()))?
        .iter()
        .map(|label| {
            label
                .as_int()
                .ok_or_else(|| DataError::Validation("label is not an integer".into()))
        })
        .collect::<Result<Vec<_>>>()?;
    if labels.len() != records {
        return Err(DataError::Validation(format!(
            "Unexpected length of labels: {}",
            labels.len()
        )));
    }

    Ok(CifarBatch {
        pixels: array.data,
        labels,
    })
}

/// CIFAR-10 training set held in memory, shaped `(N, 3, 32, 32)`
#[derive(Debug, Clone)]
pub struct Cifar10 {
    dataset: TensorDataset<Ix4>,
}

impl Cifar10 {
    /// Fetch if needed, then read `<root>/cifar-10-batches-py`
    pub fn load(config: &DatasetConfig) -> Result<Self> {
        fetch::ensure_extracted(config, CIFAR10_DIR, CIFAR10_URL, ArchiveKind::TarGz);
        Self::from_dir(&config.root.join(CIFAR10_DIR))
    }

    /// Read `data_batch_1` … `data_batch_5` from an extracted directory
    pub fn from_dir(dir: &Path) -> Result<Self> {
        Self::from_batches(dir, RECORDS_PER_BATCH)
    }

    fn from_batches(dir: &Path, records_per_batch: usize) -> Result<Self> {
        let total = TRAIN_BATCHES * records_per_batch;
        let mut pixels = Vec::with_capacity(total * IMAGE_BYTES);
        let mut labels = Vec::with_capacity(total);

        for i in 1..=TRAIN_BATCHES {
            let path = dir.join(format!("data_batch_{i}"));
            let batch = read_batch(&path, records_per_batch)?;
            debug!(path = %path.display(), records = batch.labels.len(), "Decoded batch");
            pixels.extend_from_slice(&batch.pixels);
            labels.extend(batch.labels);
        }

        let (c, h, w) = IMAGE_SHAPE;
        let data = Array4::from_shape_vec((total, c, h, w), pixels)?.mapv(|p| f32::from(p) / 255.0);

        info!(samples = total, path = %dir.display(), "Loaded CIFAR-10");
        let dataset = TensorDataset::new(data, Array1::from(labels))?;
        Ok(Self { dataset })
    }

    /// Shuffled, drop-last batches
    pub fn train_dataloader(&self, batch_size: usize) -> Result<DataLoader<'_, Ix4>> {
        DataLoader::new(&self.dataset, batch_size)
    }

    pub fn into_inner(self) -> TensorDataset<Ix4> {
        self.dataset
    }
}

impl Deref for Cifar10 {
    type Target = TensorDataset<Ix4>;

    fn deref(&self) -> &Self::Target {
        &self.dataset
    }
}
