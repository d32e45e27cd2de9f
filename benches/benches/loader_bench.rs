//! # Loader Benchmarks
//!
//! Epoch iteration over an SC09-shaped in-memory dataset.
//!
//! Run: `cargo bench --bench loader_bench`

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use lti_data::{DataLoader, TensorDataset};
use ndarray::{Array1, Array3};

fn bench_epoch(c: &mut Criterion) {
    let samples = 512;
    let data = Array3::<f32>::from_shape_fn((samples, 16384, 1), |(n, t, _)| {
        ((n + t) as f32 * 0.001).sin()
    });
    let labels = Array1::from_iter((0..samples).map(|n| (n % 10) as i64));
    let dataset = TensorDataset::new(data, labels).expect("consistent dataset");

    let mut group = c.benchmark_group("dataloader");
    for batch_size in [16usize, 64] {
        let mut loader = DataLoader::new(&dataset, batch_size)
            .expect("nonzero batch size")
            .with_seed(0);
        group.bench_function(format!("epoch_bs{batch_size}"), |b| {
            b.iter(|| {
                for batch in loader.epoch() {
                    black_box(batch);
                }
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_epoch);

criterion_main!(benches);
