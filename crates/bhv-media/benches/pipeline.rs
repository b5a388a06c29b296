//! Reduction Pipeline Benchmarks
//!
//! Measures the pure stages that run after classification: sampling and
//! windowing, per-window evaluation, event aggregation and the summary.
//!
//! # Running Benchmarks
//! ```bash
//! cargo bench --package bhv-media --bench pipeline
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::time::Duration;

use bhv_media::aggregator::{abnormal_events, group_action_events, repetition_flags};
use bhv_media::{
    make_windows, sample_indices, summarize, ClassDistribution, ClipEvaluator, EngineConfig,
};
use bhv_models::{ClipPrediction, LabelScore};

const LABELS: [&str; 6] = [
    "walking the dog",
    "jogging",
    "sitting",
    "hopping",
    "clapping",
    "unknown-zzz",
];

/// Synthetic clips with slowly changing actions and occasional abnormal bursts.
fn synthetic_clips(n: usize) -> Vec<ClipPrediction> {
    let evaluator = ClipEvaluator::new(&EngineConfig::default());
    (0..n)
        .map(|i| {
            let label = LABELS[(i / 7) % LABELS.len()];
            let violent = if (i / 13) % 4 == 0 { 0.92 } else { 0.04 };
            let abnormal = ClassDistribution::new(
                vec![1.0 - violent, violent],
                vec!["NonViolence".to_string(), "Violence".to_string()],
            )
            .unwrap();
            let t = i as f64 * 0.8;
            evaluator.evaluate(t, t + 1.5, vec![LabelScore::new(label, 0.7)], &abnormal)
        })
        .collect()
}

fn bench_windowing(c: &mut Criterion) {
    let mut group = c.benchmark_group("windowing");
    group.measurement_time(Duration::from_secs(3));

    // 1 minute, 10 minutes, 1 hour at 30 fps
    for frames in [1_800usize, 18_000, 108_000] {
        group.throughput(Throughput::Elements(frames as u64));
        group.bench_with_input(BenchmarkId::from_parameter(frames), &frames, |b, &frames| {
            b.iter(|| {
                let indices = sample_indices(30.0, black_box(frames), 10.0);
                make_windows(&indices, 16, 8).len()
            })
        });
    }
    group.finish();
}

fn bench_aggregation(c: &mut Criterion) {
    let mut group = c.benchmark_group("aggregation");
    group.measurement_time(Duration::from_secs(3));

    let config = EngineConfig::default();
    for n in [100usize, 1_000, 10_000] {
        let clips = synthetic_clips(n);
        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n), &clips, |b, clips| {
            b.iter(|| {
                let events = group_action_events(black_box(clips));
                let reps =
                    repetition_flags(&events, &config.repetition_targets, config.repetition_min_sec);
                let abnormal = abnormal_events(clips, config.abnormal_min_consec);
                summarize(n as f64 * 0.8, &events, &reps, &abnormal)
            })
        });
    }
    group.finish();
}

fn bench_evaluation(c: &mut Criterion) {
    let evaluator = ClipEvaluator::new(&EngineConfig::default());
    let topk: Vec<LabelScore> = LABELS.iter().map(|l| LabelScore::new(*l, 0.2)).collect();
    let abnormal = ClassDistribution::new(
        vec![0.3, 0.7],
        vec!["NonViolence".to_string(), "Violence".to_string()],
    )
    .unwrap();

    c.bench_function("evaluate_clip", |b| {
        b.iter(|| evaluator.evaluate(0.0, 1.5, black_box(topk.clone()), black_box(&abnormal)))
    });
}

criterion_group!(benches, bench_windowing, bench_aggregation, bench_evaluation);
criterion_main!(benches);
