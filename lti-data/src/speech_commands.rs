//! # SC09 spoken digits
//!
//! One-second 16 kHz clips of the words "zero" through "nine". Each clip is
//! padded to 16384 frames, scaled to [-1, 1) and divided by its own standard
//! deviation.

use std::ops::Deref;
use std::path::{Path, PathBuf};

use ndarray::{Array1, Array3, Axis, Ix3};
use tracing::{debug, info};

use crate::config::DatasetConfig;
use crate::dataset::TensorDataset;
use crate::error::{DataError, Result};
use crate::fetch::{self, ArchiveKind};
use crate::loader::DataLoader;

pub const SC09_URL: &str = "https://huggingface.co/datasets/krandiash/sc09/resolve/main/sc09.zip";
pub const SC09_DIR: &str = "sc09";

pub const SAMPLE_RATE: u32 = 16_000;
/// Longest accepted clip
pub const MAX_FRAMES: usize = 16_000;
/// Frames per sample after padding
pub const PADDED_FRAMES: usize = 16 * 1024;

/// Class folders; the position is the label
pub const CLASSES: [&str; 10] = [
    "zero", "one", "two", "three", "four", "five", "six", "seven", "eight", "nine",
];

/// SC09 training set held in memory, shaped `(N, 16384, 1)`
#[derive(Debug, Clone)]
pub struct SpeechCommands {
    dataset: TensorDataset<Ix3>,
}

impl SpeechCommands {
    /// Fetch if needed, then read `<root>/sc09`
    pub fn load(config: &DatasetConfig) -> Result<Self> {
        fetch::ensure_extracted(config, SC09_DIR, SC09_URL, ArchiveKind::Zip);
        Self::from_dir(&config.root.join(SC09_DIR))
    }

    /// Read an already extracted SC09 directory
    pub fn from_dir(dir: &Path) -> Result<Self> {
        if !dir.is_dir() {
            return Err(DataError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{} not found", dir.display()),
            )));
        }

        let mut clips = Vec::new();
        let mut labels = Vec::new();
        for (label, word) in CLASSES.iter().enumerate() {
            let files = wav_files(&dir.join(word))?;
            debug!(class = word, files = files.len(), "Reading class");
            for path in files {
                clips.push(read_clip(&path)?);
                labels.push(label as i64);
            }
        }

        if clips.is_empty() {
            return Err(DataError::Empty(dir.to_path_buf()));
        }

        let mut data = Array3::<f32>::zeros((clips.len(), PADDED_FRAMES, 1));
        for (mut row, clip) in data.outer_iter_mut().zip(&clips) {
            for (slot, &sample) in row.iter_mut().zip(clip) {
                *slot = f32::from(sample) / 32768.0;
            }
        }
        standardize(&mut data);

        info!(samples = clips.len(), path = %dir.display(), "Loaded SC09");
        let dataset = TensorDataset::new(data, Array1::from(labels))?;
        Ok(Self { dataset })
    }

    /// Shuffled, drop-last batches
    pub fn train_dataloader(&self, batch_size: usize) -> Result<DataLoader<'_, Ix3>> {
        DataLoader::new(&self.dataset, batch_size)
    }

    pub fn into_inner(self) -> TensorDataset<Ix3> {
        self.dataset
    }
}

impl Deref for SpeechCommands {
    type Target = TensorDataset<Ix3>;

    fn deref(&self) -> &Self::Target {
        &self.dataset
    }
}

/// `*.wav` files of one class folder in name order; a missing folder has none
fn wav_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "wav") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn read_clip(path: &Path) -> Result<Vec<i16>> {
    let wav_error = |source| DataError::Wav {
        path: path.to_path_buf(),
        source,
    };

    let reader = hound::WavReader::open(path).map_err(wav_error)?;
    let format = reader.spec();

    if format.sample_rate != SAMPLE_RATE {
        return Err(DataError::Validation(format!(
            "{}: sample rate is expected to be 16kHz, got {} Hz",
            path.display(),
            format.sample_rate
        )));
    }
    if format.sample_format != hound::SampleFormat::Int || format.bits_per_sample != 16 {
        return Err(DataError::Validation(format!(
            "{}: audio data is expected to be 16-bit integer PCM, got {} bits {:?}",
            path.display(),
            format.bits_per_sample,
            format.sample_format
        )));
    }
    if format.channels != 1 {
        return Err(DataError::Validation(format!(
            "{}: audio is expected to be mono, got {} channels",
            path.display(),
            format.channels
        )));
    }
    let frames = reader.duration() as usize;
    if frames > MAX_FRAMES {
        return Err(DataError::Validation(format!(
            "{}: audio is expected to be at most 1 second, got {frames} frames",
            path.display()
        )));
    }

    reader
        .into_samples::<i16>()
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(wav_error)
}

/// Divide each sample and channel by its population standard deviation over time
fn standardize(data: &mut Array3<f32>) {
    for mut sample in data.outer_iter_mut() {
        for mut channel in sample.axis_iter_mut(Axis(1)) {
            let n = channel.len() as f64;
            let mean = channel.iter().map(|&v| f64::from(v)).sum::<f64>() / n;
            let variance = channel
                .iter()
                .map(|&v| (f64::from(v) - mean).powi(2))
                .sum::<f64>()
                / n;
            let std = variance.sqrt();
            if std > 0.0 {
                channel.mapv_inplace(|v| (f64::from(v) / std) as f32);
            }
        }
    }
}
