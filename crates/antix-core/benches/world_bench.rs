use antix_core::{
    AntixConfig, Command, ControlInput, Controller, ControllerRegistry, Scheduling, World,
};
use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use rand::RngCore;
use std::time::Duration;

/// Drives straight with a slight curve so robots keep crossing cells.
struct Cruise;

impl Controller for Cruise {
    fn kind(&self) -> &'static str {
        "bench.cruise"
    }

    fn control(&mut self, _input: &ControlInput<'_>) -> Command {
        Command::drive(0.005, 0.01)
    }
}

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse::<T>().ok())
        .unwrap_or(default)
}

fn bench_world_steps(c: &mut Criterion) {
    let mut group = c.benchmark_group("world_step");
    group.sample_size(env_or("ANTIX_BENCH_SAMPLES", 20usize).max(10));
    group.warm_up_time(Duration::from_secs(env_or("ANTIX_BENCH_WARMUP_SECS", 2u64)));
    group.measurement_time(Duration::from_secs(env_or("ANTIX_BENCH_MEASURE_SECS", 8u64)));
    let steps: usize = env_or("ANTIX_BENCH_STEPS", 16usize).max(1);
    let populations: Vec<usize> = std::env::var("ANTIX_BENCH_ROBOTS")
        .ok()
        .map(|s| {
            s.split(',')
                .filter_map(|t| t.trim().parse::<usize>().ok())
                .collect::<Vec<_>>()
        })
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| vec![1_000, 10_000]);

    let mut registry = ControllerRegistry::new();
    let key = registry.register("bench.cruise", |_rng: &mut dyn RngCore| {
        Box::new(Cruise) as Box<dyn Controller>
    });

    for &robots in &populations {
        for scheduling in [Scheduling::Sequential, Scheduling::Phased] {
            let label = format!("{scheduling:?}_steps{steps}_robots{robots}");
            group.bench_function(label, |b| {
                b.iter_batched(
                    || {
                        // keep density roughly constant as the population grows
                        let cells = ((robots as f64 / 10.0).sqrt().ceil() as usize).max(1);
                        let config = AntixConfig {
                            puck_count: robots,
                            home_count: 10,
                            home_population: robots / 10,
                            world_size: cells as f64 * 0.1,
                            matrix_width: cells,
                            home_radius: 0.05,
                            rng_seed: Some(0xBEEF),
                            scheduling,
                            ..AntixConfig::default()
                        };
                        World::populate(config, &registry, key).expect("bench world")
                    },
                    |mut world| {
                        for _ in 0..steps {
                            world.step();
                        }
                    },
                    BatchSize::LargeInput,
                );
            });
        }
    }
    group.finish();
}

criterion_group!(benches, bench_world_steps);
criterion_main!(benches);
