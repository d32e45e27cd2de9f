//! # Real FFT helpers
//!
//! One-sided real transforms built on `rustfft`, with the conventions the
//! layers rely on:
//!
//! - forward transforms zero-pad or truncate the input to the requested length
//! - `rfft` of length `n` keeps `n / 2 + 1` bins
//! - inverse transforms are normalized by `1/n` and treat the one-sided
//!   spectrum as Hermitian, so the imaginary parts of the DC and Nyquist bins
//!   are ignored
//! - 2-D transforms are real on the last axis and complex on the first

use std::sync::Arc;

use ndarray::{Array2, ArrayView1, ArrayView2, s};
use num_complex::Complex32;
use rustfft::{Fft, FftPlanner};

/// Number of bins kept by a real transform of length `n`
#[inline]
pub fn rfft_bins(n: usize) -> usize {
    n / 2 + 1
}

/// FFT planner with real-signal helpers. Plans are cached per length.
pub struct Spectral {
    planner: FftPlanner<f32>,
}

impl Spectral {
    pub fn new() -> Self {
        Self {
            planner: FftPlanner::new(),
        }
    }

    fn forward(&mut self, n: usize) -> Arc<dyn Fft<f32>> {
        self.planner.plan_fft_forward(n)
    }

    fn inverse(&mut self, n: usize) -> Arc<dyn Fft<f32>> {
        self.planner.plan_fft_inverse(n)
    }

    /// One-sided spectrum of `signal` zero-padded (or truncated) to `n`
    pub fn rfft(&mut self, signal: &[f32], n: usize) -> Vec<Complex32> {
        if n == 0 {
            return Vec::new();
        }

        let mut buffer: Vec<Complex32> = (0..n)
            .map(|i| Complex32::new(signal.get(i).copied().unwrap_or(0.0), 0.0))
            .collect();
        self.forward(n).process(&mut buffer);
        buffer.truncate(rfft_bins(n));
        buffer
    }

    /// Real signal of length `n` from a one-sided spectrum
    pub fn irfft(&mut self, spectrum: &[Complex32], n: usize) -> Vec<f32> {
        if n == 0 {
            return Vec::new();
        }

        let mut buffer = hermitian_extend(spectrum, n);
        self.inverse(n).process(&mut buffer);

        let scale = 1.0 / n as f32;
        buffer.iter().map(|c| c.re * scale).collect()
    }

    /// 2-D spectrum of shape `(n1, n2 / 2 + 1)`
    pub fn rfft2(&mut self, input: ArrayView2<f32>, (n1, n2): (usize, usize)) -> Array2<Complex32> {
        let mut out = Array2::<Complex32>::zeros((n1, rfft_bins(n2)));
        if n1 == 0 || n2 == 0 {
            return out;
        }

        for (i, row) in input.outer_iter().take(n1).enumerate() {
            let bins = self.rfft(&row.to_vec(), n2);
            out.row_mut(i).assign(&ArrayView1::from(&bins[..]));
        }

        let fft = self.forward(n1);
        for mut column in out.columns_mut() {
            let mut buffer = column.to_vec();
            fft.process(&mut buffer);
            column.assign(&ArrayView1::from(&buffer[..]));
        }

        out
    }

    /// Real `(n1, n2)` array from a 2-D one-sided spectrum
    pub fn irfft2(
        &mut self,
        spectrum: ArrayView2<Complex32>,
        (n1, n2): (usize, usize),
    ) -> Array2<f32> {
        let mut out = Array2::<f32>::zeros((n1, n2));
        if n1 == 0 || n2 == 0 {
            return out;
        }

        // Complex inverse along the first axis, rows trimmed or padded to n1
        let rows = spectrum.nrows().min(n1);
        let mut stage = Array2::<Complex32>::zeros((n1, spectrum.ncols()));
        stage
            .slice_mut(s![..rows, ..])
            .assign(&spectrum.slice(s![..rows, ..]));

        let ifft = self.inverse(n1);
        let scale = 1.0 / n1 as f32;
        for mut column in stage.columns_mut() {
            let mut buffer = column.to_vec();
            ifft.process(&mut buffer);
            for (dst, value) in column.iter_mut().zip(buffer) {
                *dst = value * scale;
            }
        }

        for (i, row) in stage.outer_iter().enumerate() {
            let signal = self.irfft(&row.to_vec(), n2);
            out.row_mut(i).assign(&ArrayView1::from(&signal[..]));
        }

        out
    }
}

impl Default for Spectral {
    fn default() -> Self {
        Self::new()
    }
}

/// Full length-`n` spectrum from its first `n / 2 + 1` bins
fn hermitian_extend(spectrum: &[Complex32], n: usize) -> Vec<Complex32> {
    let bins = rfft_bins(n);
    let mut buffer = vec![Complex32::new(0.0, 0.0); n];

    for (dst, &value) in buffer.iter_mut().zip(spectrum.iter().take(bins)) {
        *dst = value;
    }
    for k in bins..n {
        buffer[k] = buffer[n - k].conj();
    }

    buffer
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f32::consts::PI;

    fn naive_dft(signal: &[f32], n: usize) -> Vec<Complex32> {
        (0..n)
            .map(|k| {
                (0..n).fold(Complex32::new(0.0, 0.0), |acc, t| {
                    let x = signal.get(t).copied().unwrap_or(0.0);
                    let angle = -2.0 * PI * (k * t) as f32 / n as f32;
                    acc + Complex32::from_polar(x, angle)
                })
            })
            .collect()
    }

    #[test]
    fn test_rfft_matches_dft() {
        let signal = [0.5, -1.0, 2.0, 0.25, 3.0, -0.75];
        let spectrum = Spectral::new().rfft(&signal, 6);
        let reference = naive_dft(&signal, 6);

        assert_eq!(spectrum.len(), 4);
        for (a, b) in spectrum.iter().zip(&reference) {
            assert_abs_diff_eq!(a.re, b.re, epsilon = 1e-4);
            assert_abs_diff_eq!(a.im, b.im, epsilon = 1e-4);
        }
    }

    #[test]
    fn test_rfft_pads_and_truncates() {
        let mut spectral = Spectral::new();

        let padded = spectral.rfft(&[1.0, 2.0], 8);
        assert_eq!(padded.len(), 5);
        assert_abs_diff_eq!(padded[0].re, 3.0, epsilon = 1e-5);

        // Only the first two samples survive truncation
        let truncated = spectral.rfft(&[1.0, 2.0, 100.0, 100.0], 2);
        assert_eq!(truncated.len(), 2);
        assert_abs_diff_eq!(truncated[0].re, 3.0, epsilon = 1e-5);
        assert_abs_diff_eq!(truncated[1].re, -1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_irfft_inverts_odd_and_even_lengths() {
        let mut spectral = Spectral::new();
        for n in [1usize, 5, 8] {
            let signal: Vec<f32> = (0..n).map(|i| (i as f32 * 0.7).sin() + 0.1).collect();
            let spectrum = spectral.rfft(&signal, n);
            let restored = spectral.irfft(&spectrum, n);
            for (a, b) in restored.iter().zip(&signal) {
                assert_abs_diff_eq!(a, b, epsilon = 1e-5);
            }
        }
    }

    #[test]
    fn test_irfft_ignores_dc_imaginary_part() {
        let mut spectral = Spectral::new();
        let clean = spectral.irfft(&[Complex32::new(4.0, 0.0), Complex32::new(1.0, 0.0)], 2);
        let noisy = spectral.irfft(&[Complex32::new(4.0, 9.0), Complex32::new(1.0, -3.0)], 2);

        assert_eq!(clean.len(), 2);
        for (a, b) in clean.iter().zip(&noisy) {
            assert_abs_diff_eq!(a, b, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_rfft2_matches_separable_dft() {
        let input = ndarray::arr2(&[[1.0f32, 2.0, 0.0], [-1.0, 0.5, 3.0]]);
        let spectrum = Spectral::new().rfft2(input.view(), (4, 4));
        assert_eq!(spectrum.dim(), (4, 3));

        for k1 in 0..4 {
            for k2 in 0..3 {
                let mut expected = Complex32::new(0.0, 0.0);
                for t1 in 0..2 {
                    for t2 in 0..3 {
                        let angle = -2.0 * PI * ((k1 * t1) as f32 / 4.0 + (k2 * t2) as f32 / 4.0);
                        expected += Complex32::from_polar(input[[t1, t2]], angle);
                    }
                }
                assert_abs_diff_eq!(spectrum[[k1, k2]].re, expected.re, epsilon = 1e-4);
                assert_abs_diff_eq!(spectrum[[k1, k2]].im, expected.im, epsilon = 1e-4);
            }
        }
    }

    #[test]
    fn test_irfft2_restores_padded_input() {
        let mut spectral = Spectral::new();
        let input = ndarray::arr2(&[[0.2f32, -1.5], [2.5, 0.75], [1.0, -0.25]]);

        let spectrum = spectral.rfft2(input.view(), (6, 4));
        let restored = spectral.irfft2(spectrum.view(), (6, 4));

        assert_eq!(restored.dim(), (6, 4));
        for ((i, j), &value) in restored.indexed_iter() {
            let expected = if i < 3 && j < 2 { input[[i, j]] } else { 0.0 };
            assert_abs_diff_eq!(value, expected, epsilon = 1e-5);
        }
    }
}
