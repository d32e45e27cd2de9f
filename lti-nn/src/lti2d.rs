//! # 2-D transfer-function layer
//!
//! Two-axis version of [`Lti`](crate::lti::Lti) for `(batch, L1, L2, D_in)`
//! inputs. Each channel pair learns an `order × order` numerator block per
//! quadrant and a shared denominator block. The blocks sit at offsets
//! `[1..=order] × [1..=order]` of an `(order + 1)²` coefficient grid whose
//! `(0, 0)` entry is fixed (1 for the denominator, 0 for the numerators).
//!
//! Quadrants, in storage order:
//!
//! | index | branch |
//! |-------|--------|
//! | 0 | causal / causal |
//! | 1 | causal / anticausal |
//! | 2 | anticausal / causal |
//! | 3 | anticausal / anticausal |
//!
//! A causal layer only uses quadrant 0. A bidirectional layer sums
//!
//! ```text
//! H = h0 + H_cc + flip(H_ca) + conj(flip(H_ac)) + conj(H_aa)
//! ```
//!
//! where `flip` reverses the first (full-length) frequency axis as
//! `k -> N - 1 - k` over its `N = 2 * L1` bins. This is an index reversal,
//! not the frequency negation `k -> (N - k) mod N`, so a cross-quadrant tap
//! produces a modulated kernel rather than a pure shift.

use ndarray::{
    Array2, Array3, Array4, Array5, ArrayView2, ArrayView4, ArrayViewD,
    ArrayViewMut2, ArrayViewMut4, ArrayViewMut5, s,
};
use num_complex::Complex32;
use tracing::debug;

use crate::config::LtiConfig;
use crate::error::{LtiError, Result};
use crate::init::Initializer;
use crate::lti::check_shape;
use crate::mixing::ChannelMixing;
use crate::spectral::{Spectral, rfft_bins};

/// Numerator sets of the 2-D layer: cc, ca, ac, aa
pub const QUADRANTS_2D: usize = 4;

/// Linear time-invariant layer over two axes
#[derive(Debug, Clone)]
pub struct Lti2d {
    config: LtiConfig,
    /// Direct term, `(rows, cols)`
    h0: Array2<f32>,
    /// `(4, rows, cols, order, order)`
    numerators: Array5<f32>,
    /// `(rows, cols, order, order)`
    denominator: Array4<f32>,
}

impl Lti2d {
    /// Create a layer with parameters drawn according to `config`
    pub fn new(config: LtiConfig) -> Result<Self> {
        config.validate()?;

        let (rows, cols) = config.channel_grid();
        let order = config.order;
        let mut init = Initializer::from_config(&config);

        let h0 = init.array((rows, cols));
        let numerators = init.array((QUADRANTS_2D, rows, cols, order, order));
        let denominator = init.array((rows, cols, order, order));

        debug!(
            input_dim = config.input_dim,
            output_dim = config.output_dim,
            order,
            causal = config.causal,
            mimo = config.mimo,
            "initialized 2-D transfer-function layer"
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
        numerators: Array5<f32>,
        denominator: Array4<f32>,
    ) -> Result<Self> {
        config.validate()?;

        let (rows, cols) = config.channel_grid();
        let order = config.order;
        check_shape("h0", h0.shape(), &[rows, cols])?;
        check_shape(
            "numerators",
            numerators.shape(),
            &[QUADRANTS_2D, rows, cols, order, order],
        )?;
        check_shape("denominator", denominator.shape(), &[rows, cols, order, order])?;

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

    pub fn numerators(&self) -> &Array5<f32> {
        &self.numerators
    }

    pub fn numerators_mut(&mut self) -> ArrayViewMut5<'_, f32> {
        self.numerators.view_mut()
    }

    pub fn denominator(&self) -> &Array4<f32> {
        &self.denominator
    }

    pub fn denominator_mut(&mut self) -> ArrayViewMut4<'_, f32> {
        self.denominator.view_mut()
    }

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

    /// Truncated impulse responses `(4, rows, cols, l1, l2)` of every quadrant
    pub fn impulse_response(&self, l1: usize, l2: usize) -> Array5<f32> {
        let mut spectral = Spectral::new();
        let (rows, cols) = self.config.channel_grid();
        let mut out = Array5::<f32>::zeros((QUADRANTS_2D, rows, cols, l1, l2));

        for r in 0..rows {
            for c in 0..cols {
                let den = self.denominator_spectrum(&mut spectral, r, c, (l1, l2));
                for q in 0..QUADRANTS_2D {
                    let h = self.truncated_response(&mut spectral, q, r, c, &den, (l1, l2));
                    out.slice_mut(s![q, r, c, .., ..]).assign(&h);
                }
            }
        }

        out
    }

    /// Combined transfer function `(rows, cols, 2 * l1, l2 + 1)` on the padded grid
    pub fn transfer_function(&self, l1: usize, l2: usize) -> Array4<Complex32> {
        let mut spectral = Spectral::new();
        let (rows, cols) = self.config.channel_grid();
        let (n1, width) = (2 * l1, rfft_bins(2 * l2));

        let flat = self.transfer_function_with(&mut spectral, (l1, l2));
        Array4::from_shape_fn((rows, cols, n1, width), |(r, c, k1, k2)| {
            flat[[r, c, k1 * width + k2]]
        })
    }

    /// Transfer function with the `(2 * l1, l2 + 1)` grid flattened row-major
    fn transfer_function_with(
        &self,
        spectral: &mut Spectral,
        (l1, l2): (usize, usize),
    ) -> Array3<Complex32> {
        let (rows, cols) = self.config.channel_grid();
        let padded = (2 * l1, 2 * l2);
        let bins = padded.0 * rfft_bins(padded.1);
        let mut transfer = Array3::<Complex32>::zeros((rows, cols, bins));

        for r in 0..rows {
            for c in 0..cols {
                let den = self.denominator_spectrum(spectral, r, c, (l1, l2));
                let gain = Complex32::new(self.h0[[r, c]], 0.0);
                let quadrant = |q: usize, spectral: &mut Spectral| {
                    let h = self.truncated_response(spectral, q, r, c, &den, (l1, l2));
                    spectral.rfft2(h.view(), padded)
                };

                let mut combined = quadrant(0, &mut *spectral).mapv(|h| gain + h);

                if !self.config.causal {
                    let ca = quadrant(1, &mut *spectral);
                    let ac = quadrant(2, &mut *spectral);
                    let aa = quadrant(3, &mut *spectral);

                    combined += &ca.slice(s![..;-1, ..]);
                    combined.zip_mut_with(&ac.slice(s![..;-1, ..]), |dst, h| *dst += h.conj());
                    combined.zip_mut_with(&aa, |dst, h| *dst += h.conj());
                }

                transfer
                    .slice_mut(s![r, c, ..])
                    .iter_mut()
                    .zip(combined.iter())
                    .for_each(|(dst, &h)| *dst = h);
            }
        }

        transfer
    }

    fn denominator_spectrum(
        &self,
        spectral: &mut Spectral,
        r: usize,
        c: usize,
        shape: (usize, usize),
    ) -> Array2<Complex32> {
        let a = coefficient_grid(1.0, self.denominator.slice(s![r, c, .., ..]));
        spectral.rfft2(a.view(), shape)
    }

    fn truncated_response(
        &self,
        spectral: &mut Spectral,
        quadrant: usize,
        r: usize,
        c: usize,
        den: &Array2<Complex32>,
        shape: (usize, usize),
    ) -> Array2<f32> {
        let b = coefficient_grid(0.0, self.numerators.slice(s![quadrant, r, c, .., ..]));
        let ratio = spectral.rfft2(b.view(), shape) / den;
        spectral.irfft2(ratio.view(), shape)
    }

    /// Apply the layer to a `(batch, L1, L2, D_in)` tensor
    pub fn forward(&self, x: ArrayView4<f32>) -> Result<Array4<f32>> {
        let (batch, l1, l2, dim) = x.dim();
        if dim != self.config.input_dim {
            return Err(LtiError::ShapeMismatch {
                expected: format!("(batch, L1, L2, {})", self.config.input_dim),
                actual: format!("{:?}", x.shape()),
            });
        }
        if l1 == 0 || l2 == 0 {
            return Err(LtiError::InvalidInput("spatial extent must be > 0".into()));
        }

        let mut spectral = Spectral::new();
        let transfer = self.transfer_function_with(&mut spectral, (l1, l2));
        let mixing = self.config.mixing();
        let padded = (2 * l1, 2 * l2);
        let width = rfft_bins(padded.1);
        let bins = padded.0 * width;

        let mut y = Array4::<f32>::zeros((batch, l1, l2, self.output_dim()));
        for b in 0..batch {
            let mut spectrum = Array2::<Complex32>::zeros((bins, dim));
            for i in 0..dim {
                let plane = spectral.rfft2(x.slice(s![b, .., .., i]), padded);
                spectrum
                    .column_mut(i)
                    .iter_mut()
                    .zip(plane.iter())
                    .for_each(|(dst, &v)| *dst = v);
            }

            let mixed = mixing.apply(spectrum.view(), transfer.view());
            for j in 0..mixed.ncols() {
                let plane =
                    Array2::from_shape_fn((padded.0, width), |(k1, k2)| mixed[[k1 * width + k2, j]]);
                let full = spectral.irfft2(plane.view(), padded);
                y.slice_mut(s![b, .., .., j])
                    .assign(&full.slice(s![..l1, ..l2]));
            }
        }

        Ok(y)
    }
}

/// `(order + 1)²` grid with `lead` at the origin and `block` at offsets ≥ 1
fn coefficient_grid(lead: f32, block: ArrayView2<f32>) -> Array2<f32> {
    let order = block.nrows();
    let mut grid = Array2::<f32>::zeros((order + 1, order + 1));
    grid[[0, 0]] = lead;
    grid.slice_mut(s![1.., 1..]).assign(&block);
    grid
}
