//! End-to-end loading from on-disk fixtures

use std::path::Path;

use approx::assert_abs_diff_eq;
use lti_data::speech_commands::{CLASSES, PADDED_FRAMES};
use lti_data::{Cifar10, DataError, DatasetConfig, SpeechCommands};
use ndarray::Axis;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn write_clip(path: &Path, frames: usize, amplitude: i16) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    let format = hound::WavSpec {
        channels: 1,
        sample_rate: 16_000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, format).unwrap();
    for t in 0..frames {
        let sign = if (t / 10) % 2 == 0 { 1 } else { -1 };
        writer.write_sample(sign * amplitude).unwrap();
    }
    writer.finalize().unwrap();
}

/// Three "zero" clips, one "two" clip, one "nine" clip
fn sc09_fixture(root: &Path) {
    let sc09 = root.join("sc09");
    write_clip(&sc09.join("zero/c.wav"), 16_000, 1000);
    write_clip(&sc09.join("zero/a.wav"), 4_000, 200);
    write_clip(&sc09.join("zero/b.wav"), 8_000, 3000);
    write_clip(&sc09.join("two/x.wav"), 12_000, 500);
    write_clip(&sc09.join("nine/y.wav"), 100, 32_000);
    std::fs::create_dir_all(sc09.join("five")).unwrap();
}

// ═══════════════════════════════════════════════════════════════════════════════
// SC09
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_sc09_shapes_and_labels() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    sc09_fixture(dir.path());

    let config = DatasetConfig::new(dir.path()).with_download(false);
    let sc09 = SpeechCommands::load(&config).unwrap();

    assert_eq!(sc09.len(), 5);
    assert_eq!(sc09.data().dim(), (5, PADDED_FRAMES, 1));
    assert_eq!(sc09.labels().to_vec(), vec![0, 0, 0, 2, 9]);
    assert_eq!(CLASSES[9], "nine");

    let (data, labels) = sc09.into_inner().into_parts();
    assert_eq!(data.dim(), (5, PADDED_FRAMES, 1));
    assert_eq!(labels.len(), 5);
}

#[test]
fn test_sc09_sorted_within_class() {
    let dir = tempfile::tempdir().unwrap();
    sc09_fixture(dir.path());
    let sc09 = SpeechCommands::from_dir(&dir.path().join("sc09")).unwrap();

    // a.wav (4000 frames), b.wav (8000), c.wav (16000): padding starts later each time
    let nonzero = |i: usize| {
        sc09.data()
            .index_axis(Axis(0), i)
            .iter()
            .enumerate()
            .filter(|(_, v)| **v != 0.0)
            .last()
            .map_or(0, |(p, _)| p + 1)
    };
    assert_eq!(nonzero(0), 4_000);
    assert_eq!(nonzero(1), 8_000);
    assert_eq!(nonzero(2), 16_000);
}

#[test]
fn test_sc09_normalized_per_sample() {
    let dir = tempfile::tempdir().unwrap();
    sc09_fixture(dir.path());
    let sc09 = SpeechCommands::from_dir(&dir.path().join("sc09")).unwrap();

    for clip in sc09.data().outer_iter() {
        let mean = clip.mean().unwrap();
        let std = clip.mapv(|v| (v - mean).powi(2)).mean().unwrap().sqrt();
        assert_abs_diff_eq!(std, 1.0, epsilon = 1e-3);
        assert!(clip.iter().all(|v| v.is_finite()));
    }
}

#[test]
fn test_sc09_batches() {
    let dir = tempfile::tempdir().unwrap();
    sc09_fixture(dir.path());
    let sc09 = SpeechCommands::from_dir(&dir.path().join("sc09")).unwrap();

    let mut loader = sc09.train_dataloader(2).unwrap().with_seed(5);
    assert_eq!(loader.len(), 2);

    let batches: Vec<_> = loader.epoch().collect();
    assert_eq!(batches.len(), 2);
    for batch in &batches {
        assert_eq!(batch.data.dim(), (2, PADDED_FRAMES, 1));
        for (row, &index) in batch.indices.iter().enumerate() {
            assert_eq!(batch.labels[row], sc09.labels()[index]);
        }
    }
}

#[test]
fn test_sc09_rejects_invalid_clip() {
    let dir = tempfile::tempdir().unwrap();
    sc09_fixture(dir.path());
    write_clip(&dir.path().join("sc09/one/too_long.wav"), 16_001, 100);

    let result = SpeechCommands::from_dir(&dir.path().join("sc09"));
    assert!(matches!(result, Err(DataError::Validation(_))));
}

#[test]
fn test_sc09_empty_dataset() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("sc09/zero")).unwrap();

    let result = SpeechCommands::from_dir(&dir.path().join("sc09"));
    assert!(matches!(result, Err(DataError::Empty(_))));
}

#[test]
fn test_sc09_missing_without_download() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let config = DatasetConfig::new(dir.path()).with_download(false);

    match SpeechCommands::load(&config) {
        Err(DataError::Io(e)) => assert_eq!(e.kind(), std::io::ErrorKind::NotFound),
        other => panic!("unexpected result: {other:?}"),
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// CIFAR-10
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_cifar_missing_without_download() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let config = DatasetConfig::new(dir.path()).with_download(false);

    assert!(matches!(Cifar10::load(&config), Err(DataError::Io(_))));
}

#[test]
fn test_cifar_malformed_batch_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let batches = dir.path().join("cifar-10-batches-py");
    std::fs::create_dir_all(&batches).unwrap();

    // A protocol 2 pickle of {"data": None}
    let pickle = [0x80, 2, b'}', b'(', b'U', 4, b'd', b'a', b't', b'a', b'N', b'u', b'.'];
    for i in 1..=5 {
        std::fs::write(batches.join(format!("data_batch_{i}")), pickle).unwrap();
    }

    let result = Cifar10::from_dir(&batches);
    assert!(matches!(result, Err(DataError::Pickle(_))));
}
