//! # lti-data - In-memory training datasets
//!
//! Loaders for the SC09 spoken-digit subset of Speech Commands and for the
//! CIFAR-10 training set. Each loader fetches and extracts its archive when
//! the data is missing, validates every record, and keeps the normalized
//! tensors in memory behind a [`TensorDataset`]. A [`DataLoader`] then draws
//! shuffled, fixed-size batches from it.
//!
//! ## Modules
//!
//! - **speech_commands**: SC09 waveforms, `(N, 16384, 1)`
//! - **cifar**: CIFAR-10 images, `(N, 3, 32, 32)`
//! - **dataset** / **loader**: in-memory storage and drop-last batching
//! - **fetch**: archive download and extraction (feature `download`)
//! - **pickle**: the unpickler behind the CIFAR batch files
//!
//! ## Example
//!
//! ```no_run
//! use lti_data::{DatasetConfig, SpeechCommands};
//!
//! let sc09 = SpeechCommands::load(&DatasetConfig::new("data"))?;
//! let mut loader = sc09.train_dataloader(32)?.with_seed(0);
//! for batch in loader.epoch() {
//!     assert_eq!(batch.data.dim(), (32, 16384, 1));
//! }
//! # Ok::<(), lti_data::DataError>(())
//! ```

pub mod error;
pub use error::{DataError, Result};

pub mod config;
pub use config::DatasetConfig;

pub mod fetch;
pub mod pickle;

pub mod dataset;
pub use dataset::{Batch, TensorDataset};

pub mod loader;
pub use loader::{Batches, DataLoader};

pub mod speech_commands;
pub use speech_commands::SpeechCommands;

pub mod cifar;
pub use cifar::Cifar10;

/// Prelude module with common re-exports
pub mod prelude {
    pub use crate::cifar::Cifar10;
    pub use crate::config::DatasetConfig;
    pub use crate::dataset::{Batch, TensorDataset};
    pub use crate::error::{DataError, Result};
    pub use crate::loader::DataLoader;
    pub use crate::speech_commands::SpeechCommands;
}
