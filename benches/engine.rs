use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use eqchain::eq::{ChainSettings, Equalizer, EqualizerHandle, Slope};

const SAMPLE_RATE: f32 = 48000.0;
const BUFFER_SIZE: usize = 128;

fn build_engine(slope: Slope, buffer_size: usize) -> (Equalizer, EqualizerHandle) {
    let (mut engine, handle) = Equalizer::new(ChainSettings {
        low_cut_freq: 100.0,
        high_cut_freq: 10_000.0,
        peak_gain_db: 6.0,
        low_cut_slope: slope,
        high_cut_slope: slope,
        ..ChainSettings::default()
    });
    engine.prepare(SAMPLE_RATE, buffer_size).unwrap();
    (engine, handle)
}

fn bench_engine_slopes(c: &mut Criterion) {
    let mut group = c.benchmark_group("Engine Stereo Block");

    for slope in Slope::ALL {
        group.bench_with_input(BenchmarkId::from_parameter(slope), &slope, |b, &slope| {
            let (mut engine, _) = build_engine(slope, BUFFER_SIZE);

            let mut left = vec![0.5f32; BUFFER_SIZE];
            let mut right = vec![0.5f32; BUFFER_SIZE];

            b.iter(|| {
                engine.process_block(black_box(&mut left), black_box(&mut right));
            });
        });
    }

    group.finish();
}

fn bench_engine_buffer_sizes(c: &mut Criterion) {
    let mut group = c.benchmark_group("Engine Buffer Size");

    for &buffer_size in &[32usize, 128, 512, 2048] {
        group.bench_with_input(
            BenchmarkId::from_parameter(buffer_size),
            &buffer_size,
            |b, &buffer_size| {
                let (mut engine, _) = build_engine(Slope::Db48, buffer_size);

                let mut left = vec![0.5f32; buffer_size];
                let mut right = vec![0.5f32; buffer_size];

                b.iter(|| {
                    engine.process_block(black_box(&mut left), black_box(&mut right));
                });
            },
        );
    }

    group.finish();
}

fn bench_engine_parameter_churn(c: &mut Criterion) {
    c.bench_function("Engine Parameter Churn", |b| {
        let (mut engine, handle) = build_engine(Slope::Db24, BUFFER_SIZE);

        let mut left = vec![0.5f32; BUFFER_SIZE];
        let mut right = vec![0.5f32; BUFFER_SIZE];
        let mut gain = 0.0f32;

        b.iter(|| {
            gain = if gain >= 12.0 { -12.0 } else { gain + 1.0 };
            handle.params().update(|s| s.peak_gain_db = gain);
            engine.process_block(black_box(&mut left), black_box(&mut right));
        });
    });
}

criterion_group!(
    benches,
    bench_engine_slopes,
    bench_engine_buffer_sizes,
    bench_engine_parameter_churn
);
criterion_main!(benches);
