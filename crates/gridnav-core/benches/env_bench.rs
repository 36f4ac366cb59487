use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use gridnav_core::{Environment, NavConfig, PopulationCodec, Tensor2};
use rand::{SeedableRng, rngs::SmallRng};
use std::time::Duration;

/// Codec that does no work, so the benchmark measures the environment itself.
struct NullCodec;

impl PopulationCodec for NullCodec {
    fn kind(&self) -> &'static str {
        "bench.null"
    }

    fn ring_units(&self) -> usize {
        16
    }

    fn grid_shape(&self) -> [usize; 2] {
        [8, 8]
    }

    fn encode_ring(&self, _value: f32, _width: f32) -> Vec<f32> {
        vec![0.0; 16]
    }

    fn decode_ring(&self, _activity: &[f32]) -> f32 {
        0.0
    }

    fn encode_2d(&self, _point: [f32; 2]) -> Tensor2 {
        Tensor2::zeros([8, 8])
    }

    fn decode_2d(&self, _grid: &Tensor2) -> [f32; 2] {
        [0.0, 0.0]
    }
}

fn bench_policy_ticks(c: &mut Criterion) {
    let mut group = c.benchmark_group("env_tick");
    let samples: usize = std::env::var("GRIDNAV_BENCH_SAMPLES")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(30);
    group.sample_size(samples);
    group.measurement_time(Duration::from_secs(5));

    for &size in &[16_u32, 64, 256] {
        group.bench_function(format!("ticks1000_world{size}"), |b| {
            b.iter_batched(
                || {
                    let config = NavConfig {
                        world_width: size,
                        world_height: size,
                        rng_seed: Some(0xBEEF),
                        ..NavConfig::default()
                    };
                    Environment::with_default_world(config, Box::new(NullCodec))
                        .expect("environment")
                },
                |mut env| {
                    let mut rng = SmallRng::seed_from_u64(7);
                    for _ in 0..1_000 {
                        env.tick_with(&mut rng);
                    }
                    env
                },
                BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

criterion_group!(benches, bench_policy_ticks);
criterion_main!(benches);
