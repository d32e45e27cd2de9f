//! # lti-nn - Transfer-function LTI layers
//!
//! State-free inference of state-space models: each layer learns a rational
//! transfer function `H(z) = h0 + B(z) / A(z)` per channel pair and applies it
//! to the input with FFTs, so a length-`L` sequence costs `O(L log L)` no
//! matter how long the implied impulse response is.
//!
//! ## Modules
//!
//! - **lti**: 1-D layer over `(batch, L, D)` tensors
//! - **lti2d**: 2-D layer over `(batch, L1, L2, D)` tensors
//! - **spectral**: real FFT helpers on top of `rustfft`
//! - **mixing**: per-bin channel contraction (MIMO or per-channel)
//! - **config**: `LtiConfig`, shared by both layers
//!
//! ## Example
//!
//! ```
//! use lti_nn::{Lti, LtiConfig};
//! use ndarray::Array3;
//!
//! let layer = Lti::new(LtiConfig::new(4, 4).with_order(8).with_causal(false))?;
//! let x = Array3::<f32>::zeros((2, 128, 4));
//! let y = layer.forward(x.view())?;
//! assert_eq!(y.dim(), (2, 128, 4));
//! # Ok::<(), lti_nn::LtiError>(())
//! ```

pub mod error;
pub use error::{LtiError, Result};

pub mod config;
pub use config::LtiConfig;

mod init;

pub mod mixing;
pub use mixing::ChannelMixing;

pub mod spectral;
pub use spectral::Spectral;

pub mod lti;
pub use lti::{Lti, QUADRANTS_1D};

pub mod lti2d;
pub use lti2d::{Lti2d, QUADRANTS_2D};

/// Prelude module with common re-exports
pub mod prelude {
    pub use crate::config::LtiConfig;
    pub use crate::error::{LtiError, Result};
    pub use crate::lti::Lti;
    pub use crate::lti2d::Lti2d;
    pub use crate::mixing::ChannelMixing;
}
