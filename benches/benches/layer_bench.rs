//! # Layer Benchmarks
//!
//! Forward-pass cost of the 1-D and 2-D transfer-function layers.
//!
//! Run: `cargo bench --bench layer_bench`

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use lti_nn::prelude::*;
use ndarray::{Array3, Array4};

fn layer(config: LtiConfig) -> Lti {
    let mut layer = Lti::new(config.with_zero_init(false).with_seed(0)).expect("valid config");
    layer.denominator_mut().mapv_inplace(|v| v * 0.2);
    layer
}

/// Sequence length scaling, MIMO 16 -> 16
fn bench_forward_1d(c: &mut Criterion) {
    let mut group = c.benchmark_group("lti_forward");

    for len in [256usize, 1024, 4096] {
        let x = Array3::<f32>::from_shape_fn((4, len, 16), |(b, t, d)| ((b + t * 3 + d) as f32).sin());
        group.throughput(Throughput::Elements((4 * len) as u64));

        let causal = layer(LtiConfig::new(16, 16).with_order(16));
        group.bench_with_input(BenchmarkId::new("causal", len), &x, |b, x| {
            b.iter(|| black_box(causal.forward(x.view()).expect("forward")))
        });

        let bidirectional = layer(LtiConfig::new(16, 16).with_order(16).with_causal(false));
        group.bench_with_input(BenchmarkId::new("bidirectional", len), &x, |b, x| {
            b.iter(|| black_box(bidirectional.forward(x.view()).expect("forward")))
        });

        let diagonal = layer(LtiConfig::new(16, 16).with_order(16).with_mimo(false));
        group.bench_with_input(BenchmarkId::new("diagonal", len), &x, |b, x| {
            b.iter(|| black_box(diagonal.forward(x.view()).expect("forward")))
        });
    }

    group.finish();
}

/// Transfer function alone, independent of batch and channels
fn bench_transfer_function(c: &mut Criterion) {
    let mut group = c.benchmark_group("transfer_function");

    let lti = layer(LtiConfig::new(8, 8).with_order(32).with_causal(false));
    for len in [1024usize, 16384] {
        group.bench_with_input(BenchmarkId::from_parameter(len), &len, |b, &len| {
            b.iter(|| black_box(lti.transfer_function(len)))
        });
    }

    group.finish();
}

fn bench_forward_2d(c: &mut Criterion) {
    let mut group = c.benchmark_group("lti2d_forward");

    for side in [16usize, 32] {
        let x = Array4::<f32>::from_shape_fn((2, side, side, 3), |(b, i, j, d)| {
            ((b + i * 5 + j * 3 + d) as f32 * 0.1).cos()
        });

        for causal in [true, false] {
            let mut layer = Lti2d::new(
                LtiConfig::new(3, 8)
                    .with_order(4)
                    .with_causal(causal)
                    .with_zero_init(false)
                    .with_seed(1),
            )
            .expect("valid config");
            layer.denominator_mut().mapv_inplace(|v| v * 0.05);

            let name = if causal { "causal" } else { "bidirectional" };
            group.bench_with_input(BenchmarkId::new(name, side), &x, |b, x| {
                b.iter(|| black_box(layer.forward(x.view()).expect("forward")))
            });
        }
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_forward_1d,
    bench_transfer_function,
    bench_forward_2d,
);

criterion_main!(benches);
