//! Layer configuration
//!
//! `LtiConfig` is shared by the 1-D and 2-D layers. It can be built in code
//! with the `with_*` helpers or parsed from a TOML table:
//!
//! ```toml
//! input_dim = 16
//! output_dim = 16
//! order = 8
//! causal = false
//! mimo = true
//! zero_init = false
//! seed = 7
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{LtiError, Result};
use crate::mixing::ChannelMixing;

/// Construction parameters of a transfer-function layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LtiConfig {
    /// Number of input channels
    pub input_dim: usize,

    /// Number of output channels (must equal `input_dim` unless `mimo`)
    pub output_dim: usize,

    /// Learned coefficients per polynomial (per axis for 2-D)
    pub order: usize,

    /// Causal-only impulse response; otherwise causal + anticausal
    pub causal: bool,

    /// Full channel mixing; otherwise one filter per channel
    pub mimo: bool,

    /// Start every parameter at zero
    pub zero_init: bool,

    /// Seed for random initialization (entropy when absent)
    pub seed: Option<u64>,
}

impl Default for LtiConfig {
    fn default() -> Self {
        Self {
            input_dim: 1,
            output_dim: 1,
            order: 8,
            causal: true,
            mimo: true,
            zero_init: true,
            seed: None,
        }
    }
}

impl LtiConfig {
    /// Configuration with the given channel counts and default settings
    pub fn new(input_dim: usize, output_dim: usize) -> Self {
        Self {
            input_dim,
            output_dim,
            ..Self::default()
        }
    }

    pub fn with_order(mut self, order: usize) -> Self {
        self.order = order;
        self
    }

    pub fn with_causal(mut self, causal: bool) -> Self {
        self.causal = causal;
        self
    }

    pub fn with_mimo(mut self, mimo: bool) -> Self {
        self.mimo = mimo;
        self
    }

    pub fn with_zero_init(mut self, zero_init: bool) -> Self {
        self.zero_init = zero_init;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Check channel-count invariants
    pub fn validate(&self) -> Result<()> {
        if self.input_dim == 0 || self.output_dim == 0 {
            return Err(LtiError::InvalidConfig(format!(
                "channel counts must be > 0, got input_dim={} output_dim={}",
                self.input_dim, self.output_dim
            )));
        }

        if !self.mimo && self.input_dim != self.output_dim {
            return Err(LtiError::InvalidConfig(format!(
                "per-channel layers need input_dim == output_dim, got {} and {}",
                self.input_dim, self.output_dim
            )));
        }

        Ok(())
    }

    /// Channel mixing selected by the `mimo` flag
    pub fn mixing(&self) -> ChannelMixing {
        if self.mimo {
            ChannelMixing::Full
        } else {
            ChannelMixing::Diagonal
        }
    }

    /// Parameter grid `(rows, cols)` over channel pairs
    pub fn channel_grid(&self) -> (usize, usize) {
        match self.mixing() {
            ChannelMixing::Full => (self.input_dim, self.output_dim),
            ChannelMixing::Diagonal => (self.input_dim, 1),
        }
    }

    /// Parse a configuration from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            LtiError::ConfigError(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }
}
