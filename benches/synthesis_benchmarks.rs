//! Benchmarks for the per-sample hot paths of a live strip.
//!
//! Run with: `cargo bench --bench synthesis_benchmarks`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use sinoatrial::prelude::*;
use std::sync::Arc;

const RHYTHMS: &[&str] = &["NSR", "AFIB", "AFL", "VFIB", "AV3", "RBBB", "PVC_POLY"];

/// Samples per benchmark iteration (one second of strip at the default step).
const BATCH: usize = 200;

fn bench_synthesize(c: &mut Criterion) {
    let catalog = RhythmCatalog::builtin();
    let mut group = c.benchmark_group("synthesize");
    group.throughput(Throughput::Elements(BATCH as u64));

    for id in RHYTHMS {
        let def = catalog.get(id).unwrap();
        let scheduler = CycleScheduler::new(def, 0.0, Random::new(42), SchedulerTuning::default());
        let state = scheduler.state().clone();
        let duration = state.duration();

        group.bench_with_input(BenchmarkId::from_parameter(id), &state, |b, state| {
            b.iter(|| {
                for i in 0..BATCH {
                    let t = duration * i as Real / BATCH as Real;
                    black_box(VoltageSynthesizer::sample(t, def, state));
                }
            });
        });
    }

    group.finish();
}

fn bench_classify(c: &mut Criterion) {
    let catalog = RhythmCatalog::builtin();
    let mut group = c.benchmark_group("classify");
    group.throughput(Throughput::Elements(BATCH as u64));

    for id in ["NSR", "AV2_WENCKEBACH", "AV3"] {
        let def = catalog.get(id).unwrap();
        let scheduler = CycleScheduler::new(def, 0.0, Random::new(42), SchedulerTuning::default());
        let state = scheduler.state().clone();
        let duration = state.duration();

        group.bench_with_input(BenchmarkId::from_parameter(id), &state, |b, state| {
            b.iter(|| {
                for i in 0..BATCH {
                    let t = duration * i as Real / BATCH as Real;
                    black_box(PhaseClassifier::classify(t, def, state));
                }
            });
        });
    }

    group.finish();
}

fn bench_study_strip(c: &mut Criterion) {
    let catalog = RhythmCatalog::builtin();
    let mut group = c.benchmark_group("study_strip");
    group.sample_size(30);

    for source in [WaveSource::Synthesized, WaveSource::Template] {
        let def = catalog.get("NSR").unwrap();
        let params = StudyParams {
            source,
            ..StudyParams::seeded(42)
        };
        group.throughput(Throughput::Elements(1000));
        group.bench_with_input(
            BenchmarkId::new("NSR_5s", format!("{:?}", source)),
            &params,
            |b, params| {
                b.iter(|| black_box(StudyStrip::generate(def, 125.0, 0.125, params)));
            },
        );
    }

    group.finish();
}

fn bench_simulator_tick(c: &mut Criterion) {
    let catalog = Arc::new(RhythmCatalog::builtin());
    let mut group = c.benchmark_group("simulator_tick");
    group.throughput(Throughput::Elements(BATCH as u64));

    for id in ["NSR", "PVC_MONO", "VFIB"] {
        let mut sim = Simulator::new(
            Arc::clone(&catalog),
            SimulationConfig::for_rhythm(id),
            SimulatorParams {
                seed: 42,
                ..Default::default()
            },
        );
        let mut sink = RecordingSink::new();

        group.bench_function(BenchmarkId::from_parameter(id), |b| {
            b.iter(|| {
                sink.clear();
                for _ in 0..BATCH {
                    sim.tick(0.125, &mut sink);
                }
                black_box(sink.len())
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_synthesize,
    bench_classify,
    bench_study_strip,
    bench_simulator_tick
);
criterion_main!(benches);
