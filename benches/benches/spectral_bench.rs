//! # Spectral Benchmarks
//!
//! Real FFT round trips at the padded lengths the layers use.
//!
//! Run: `cargo bench --bench spectral_bench`

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use lti_nn::Spectral;
use ndarray::Array2;

fn bench_rfft(c: &mut Criterion) {
    let mut group = c.benchmark_group("rfft");
    let mut spectral = Spectral::new();

    for n in [512usize, 2048, 32768] {
        let signal: Vec<f32> = (0..n / 2).map(|t| (t as f32 * 0.01).sin()).collect();
        group.bench_with_input(BenchmarkId::new("forward", n), &signal, |b, signal| {
            b.iter(|| black_box(spectral.rfft(signal, n)))
        });

        let spectrum = spectral.rfft(&signal, n);
        group.bench_with_input(BenchmarkId::new("inverse", n), &spectrum, |b, spectrum| {
            b.iter(|| black_box(spectral.irfft(spectrum, n)))
        });
    }

    group.finish();
}

fn bench_rfft2(c: &mut Criterion) {
    let mut group = c.benchmark_group("rfft2");
    let mut spectral = Spectral::new();

    for side in [32usize, 64] {
        let image = Array2::<f32>::from_shape_fn((side, side), |(i, j)| ((i * j) as f32).sin());
        let shape = (2 * side, 2 * side);

        group.bench_with_input(BenchmarkId::new("forward", side), &image, |b, image| {
            b.iter(|| black_box(spectral.rfft2(image.view(), shape)))
        });

        let spectrum = spectral.rfft2(image.view(), shape);
        group.bench_with_input(BenchmarkId::new("inverse", side), &spectrum, |b, spectrum| {
            b.iter(|| black_box(spectral.irfft2(spectrum.view(), shape)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_rfft, bench_rfft2);

criterion_main!(benches);
