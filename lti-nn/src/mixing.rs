//! Per-frequency channel mixing

use ndarray::{Array2, ArrayView2, ArrayView3};
use num_complex::Complex32;
use serde::{Deserialize, Serialize};

/// How a transfer function couples input and output channels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChannelMixing {
    /// Every input channel feeds every output channel (MIMO)
    Full,

    /// Channel `i` only feeds channel `i`
    Diagonal,
}

impl ChannelMixing {
    /// Contract a `(bins, d_in)` spectrum with a `(rows, cols, bins)` transfer function.
    ///
    /// - `Full`: `Y[k, j] = Σ_i X[k, i] · H[i, j, k]`
    /// - `Diagonal`: `Y[k, i] = X[k, i] · H[i, 0, k]`
    pub fn apply(
        self,
        spectrum: ArrayView2<Complex32>,
        transfer: ArrayView3<Complex32>,
    ) -> Array2<Complex32> {
        let (bins, d_in) = spectrum.dim();
        let (rows, cols, _) = transfer.dim();

        match self {
            ChannelMixing::Full => {
                let mut out = Array2::<Complex32>::zeros((bins, cols));
                for k in 0..bins {
                    for i in 0..rows.min(d_in) {
                        let x = spectrum[[k, i]];
                        for j in 0..cols {
                            out[[k, j]] += x * transfer[[i, j, k]];
                        }
                    }
                }
                out
            }
            ChannelMixing::Diagonal => {
                let mut out = Array2::<Complex32>::zeros((bins, d_in));
                for k in 0..bins {
                    for i in 0..rows.min(d_in) {
                        out[[k, i]] = spectrum[[k, i]] * transfer[[i, 0, k]];
                    }
                }
                out
            }
        }
    }
}
