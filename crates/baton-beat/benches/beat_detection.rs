//! Benchmarks for beat detection.

use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use baton_beat::{decode_message, AccelQueue, BeatDetector, BeatDetectorConfig, ReferenceTempo};
use baton_core::AccelSample;

/// Conducting-like signal: a sharp peak every 25 samples (500 ms at 50 Hz)
fn beat_signal(n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| {
            let phase = (i % 25) as f64 / 25.0;
            1.0 + 6.0 * (-(phase * 12.0)).exp()
        })
        .collect()
}

fn detector() -> BeatDetector {
    BeatDetector::new(
        BeatDetectorConfig::default(),
        ReferenceTempo::new(120.0).unwrap(),
    )
    .unwrap()
}

fn benchmark_detector(c: &mut Criterion) {
    let signal = beat_signal(10_000);

    c.bench_function("detect_10k_samples", |b| {
        b.iter(|| {
            let mut detector = detector();
            let mut events = 0usize;
            for (i, &s) in signal.iter().enumerate() {
                let at = Duration::from_millis(i as u64 * 20);
                if !detector.process_magnitude(black_box(s), at).is_none() {
                    events += 1;
                }
            }
            events
        })
    });
}

fn benchmark_queue(c: &mut Criterion) {
    let samples: Vec<AccelSample> = beat_signal(10_000)
        .into_iter()
        .map(|s| AccelSample::from_acceleration(s, 0.0, 0.0))
        .collect();

    c.bench_function("queue_10k_samples", |b| {
        b.iter(|| {
            let queue = AccelQueue::with_detector(detector());
            let mut events = 0usize;
            for (i, sample) in samples.iter().enumerate() {
                let at = Duration::from_millis(i as u64 * 20);
                queue.push(*black_box(sample), at, |_| events += 1);
            }
            events
        })
    });
}

fn benchmark_decode(c: &mut Criterion) {
    let message =
        r#"{"acc_x":3.25,"acc_y":-1.5,"acc_z":0.75,"gyro_x":0.01,"gyro_y":-0.02,"gyro_z":0.03}"#;

    c.bench_function("decode_message", |b| {
        b.iter(|| decode_message(black_box(message)))
    });
}

criterion_group!(
    benches,
    benchmark_detector,
    benchmark_queue,
    benchmark_decode
);
criterion_main!(benches);
