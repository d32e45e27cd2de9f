//! # 1-D transfer-function layer
//!
//! Maps a `(batch, L, D_in)` sequence through a learned rational transfer
//! function `H(z) = h0 + B(z) / A(z)` evaluated on an FFT grid. The long
//! impulse response never has to be materialized: the ratio `B/A` is sampled
//! on `L` points, inverted to a truncated response, and re-transformed on a
//! `2L` grid so the convolution with the input is linear instead of circular.
//!
//! Two numerators are learned. The first is the causal branch; the second,
//! conjugated in frequency (time-reversed), is the anticausal branch used
//! when the layer is not causal.

use std::iter;

use ndarray::{
    Array2, Array3, Array4, ArrayView1, ArrayView3, ArrayViewD, ArrayViewMut2, ArrayViewMut3,
    ArrayViewMut4, s,
};
use num_complex::Complex32;
use tracing::debug;

use crate::config::LtiConfig;
use crate::error::{LtiError, Result};
use crate::init::Initializer;
use crate::mixing::ChannelMixing;
use crate::spectral::{Spectral, rfft_bins};

/// Numerator sets of the 1-D layer: causal, anticausal
pub const QUADRANTS_1D: usize = 2;

/// Linear time-invariant layer over one sequence axis
#[derive(Debug, Clone)]
pub struct Lti {
    config: LtiConfig,
    /// Direct term, `(rows, cols)`
    h0: Array2<f32>,
    /// `(2, rows, cols, order)`
    numerators: Array4<f32>,
    /// `(rows, cols, order)`
    denominator: Array3<f32>,
}

impl Lti {
    /// Create a layer with parameters drawn according to `config`
    pub fn new(config: LtiConfig) -> Result<Self> {
        config.validate()?;

        let (rows, cols) = config.channel_grid();
        let order = config.order;
        let mut init = Initializer::from_config(&config);

        let h0 = init.array((rows, cols));
        let numerators = init.array((QUADRANTS_1D, rows, cols, order));
        let denominator = init.array((rows, cols, order));

        debug!(
            input_dim = config.input_dim,
            output_dim = config.output_dim,
            order,
            causal = config.causal,
            mimo = config.mimo,
            "initialized 1-D transfer-function layer"
        );

        Ok(Self {
            config,
            h0,
            numerators,
            denominator,
        })
    }

    /// Create a layer from existing parameter arrays
    pub fn from_parameters(
        config: LtiConfig,
        h0: Array2<f32>,
        numerators: Array4<f32>,
        denominator: Array3<f32>,
    ) -> Result<Self> {
        config.validate()?;

        let (rows, cols) = config.channel_grid();
        let order = config.order;
        check_shape("h0", h0.shape(), &[rows, cols])?;
        check_shape("numerators", numerators.shape(), &[QUADRANTS_1D, rows, cols, order])?;
        check_shape("denominator", denominator.shape(), &[rows, cols, order])?;

        Ok(Self {
            config,
            h0,
            numerators,
            denominator,
        })
    }

    pub fn config(&self) -> &LtiConfig {
        &self.config
    }

    pub fn input_dim(&self) -> usize {
        self.config.input_dim
    }

    pub fn output_dim(&self) -> usize {
        match self.config.mixing() {
            ChannelMixing::Full => self.config.output_dim,
            ChannelMixing::Diagonal => self.config.input_dim,
        }
    }

    pub fn is_causal(&self) -> bool {
        self.config.causal
    }

    pub fn mixing(&self) -> ChannelMixing {
        self.config.mixing()
    }

    pub fn h0(&self) -> &Array2<f32> {
        &self.h0
    }

    pub fn h0_mut(&mut self) -> ArrayViewMut2<'_, f32> {
        self.h0.view_mut()
    }

    pub fn numerators(&self) -> &Array4<f32> {
        &self.numerators
    }

    pub fn numerators_mut(&mut self) -> ArrayViewMut4<'_, f32> {
        self.numerators.view_mut()
    }

    pub fn denominator(&self) -> &Array3<f32> {
        &self.denominator
    }

    pub fn denominator_mut(&mut self) -> ArrayViewMut3<'_, f32> {
        self.denominator.view_mut()
    }

    /// Parameters by name, in declaration order
    pub fn named_parameters(&self) -> Vec<(&'static str, ArrayViewD<'_, f32>)> {
        vec![
            ("h0", self.h0.view().into_dyn()),
            ("numerators", self.numerators.view().into_dyn()),
            ("denominator", self.denominator.view().into_dyn()),
        ]
    }

    pub fn num_parameters(&self) -> usize {
        self.h0.len() + self.numerators.len() + self.denominator.len()
    }

    /// Truncated impulse responses `(2, rows, cols, len)` of both numerator branches
    pub fn impulse_response(&self, len: usize) -> Array4<f32> {
        let mut spectral = Spectral::new();
        let (rows, cols) = self.config.channel_grid();
        let mut out = Array4::<f32>::zeros((QUADRANTS_1D, rows, cols, len));

        for r in 0..rows {
            for c in 0..cols {
                let den = self.denominator_spectrum(&mut spectral, r, c, len);
                for q in 0..QUADRANTS_1D {
                    let h = self.truncated_response(&mut spectral, q, r, c, &den, len);
                    out.slice_mut(s![q, r, c, ..]).assign(&ArrayView1::from(&h[..]));
                }
            }
        }

        out
    }

    /// Combined transfer function `(rows, cols, len + 1)` on the `2 * len` grid
    pub fn transfer_function(&self, len: usize) -> Array3<Complex32> {
        let mut spectral = Spectral::new();
        self.transfer_function_with(&mut spectral, len)
    }

    fn transfer_function_with(&self, spectral: &mut Spectral, len: usize) -> Array3<Complex32> {
        let (rows, cols) = self.config.channel_grid();
        let padded = 2 * len;
        let mut transfer = Array3::<Complex32>::zeros((rows, cols, rfft_bins(padded)));

        for r in 0..rows {
            for c in 0..cols {
                let den = self.denominator_spectrum(spectral, r, c, len);
                let gain = Complex32::new(self.h0[[r, c]], 0.0);

                let causal = self.truncated_response(spectral, 0, r, c, &den, len);
                let mut combined: Vec<Complex32> = spectral
                    .rfft(&causal, padded)
                    .into_iter()
                    .map(|h| gain + h)
                    .collect();

                if !self.config.causal {
                    let anticausal = self.truncated_response(spectral, 1, r, c, &den, len);
                    let spectrum = spectral.rfft(&anticausal, padded);
                    for (dst, h) in combined.iter_mut().zip(spectrum) {
                        *dst += h.conj();
                    }
                }

                transfer
                    .slice_mut(s![r, c, ..])
                    .assign(&ArrayView1::from(&combined[..]));
            }
        }

        transfer
    }

    /// Spectrum of `[1, a_1, ..., a_order]` on `len` points
    fn denominator_spectrum(
        &self,
        spectral: &mut Spectral,
        r: usize,
        c: usize,
        len: usize,
    ) -> Vec<Complex32> {
        let a = with_leading(1.0, self.denominator.slice(s![r, c, ..]));
        spectral.rfft(&a, len)
    }

    /// `irfft(rfft(b) / rfft(a))` on `len` points
    fn truncated_response(
        &self,
        spectral: &mut Spectral,
        quadrant: usize,
        r: usize,
        c: usize,
        den: &[Complex32],
        len: usize,
    ) -> Vec<f32> {
        let b = with_leading(0.0, self.numerators.slice(s![quadrant, r, c, ..]));
        let ratio: Vec<Complex32> = spectral
            .rfft(&b, len)
            .into_iter()
            .zip(den)
            .map(|(b, &a)| b / a)
            .collect();
        spectral.irfft(&ratio, len)
    }

    /// Apply the layer to a `(batch, L, D_in)` tensor
    pub fn forward(&self, x: ArrayView3<f32>) -> Result<Array3<f32>> {
        let (batch, len, dim) = x.dim();
        if dim != self.config.input_dim {
            return Err(LtiError::ShapeMismatch {
                expected: format!("(batch, L, {})", self.config.input_dim),
                actual: format!("{:?}", x.shape()),
            });
        }
        if len == 0 {
            return Err(LtiError::InvalidInput("sequence length must be > 0".into()));
        }

        let mut spectral = Spectral::new();
        let transfer = self.transfer_function_with(&mut spectral, len);
        let mixing = self.config.mixing();
        let padded = 2 * len;
        let bins = rfft_bins(padded);

        let mut y = Array3::<f32>::zeros((batch, len, self.output_dim()));
        for b in 0..batch {
            let mut spectrum = Array2::<Complex32>::zeros((bins, dim));
            for i in 0..dim {
                let signal = x.slice(s![b, .., i]).to_vec();
                let column = spectral.rfft(&signal, padded);
                spectrum
                    .column_mut(i)
                    .assign(&ArrayView1::from(&column[..]));
            }

            let mixed = mixing.apply(spectrum.view(), transfer.view());
            for (j, column) in mixed.columns().into_iter().enumerate() {
                let signal = spectral.irfft(&column.to_vec(), padded);
                y.slice_mut(s![b, .., j])
                    .assign(&ArrayView1::from(&signal[..len]));
            }
        }

        Ok(y)
    }
}

/// Coefficient sequence with a fixed leading term
fn with_leading(lead: f32, coefficients: ArrayView1<f32>) -> Vec<f32> {
    iter::once(lead).chain(coefficients.iter().copied()).collect()
}

pub(crate) fn check_shape(name: &str, actual: &[usize], expected: &[usize]) -> Result<()> {
    if actual != expected {
        return Err(LtiError::ShapeMismatch {
            expected: format!("{name} {expected:?}"),
            actual: format!("{actual:?}"),
        });
    }
    Ok(())
}
