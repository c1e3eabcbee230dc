// Benchmarks for the day tick on a seeded meadow.
//
// Each iteration starts from a freshly seeded population (setup is excluded
// from timing) and passes a batch of days, so the numbers cover the whole
// life cycle: germination trials, offspring placement, dormancy and death.

use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use meadow_sim::calendar::SeasonCycle;
use meadow_sim::config::SimConfig;
use meadow_sim::environment::{Environment, FlatTerrain, UniformShadow};
use meadow_sim::sim::SimState;
use meadow_sim::types::Species;

const DAYS_PER_ITER: u64 = 30;

fn seeded_meadow(seed: u64, scale: u32) -> SimState {
    let mut config = SimConfig::default();
    for count in config.initial_seeds.values_mut() {
        *count *= scale;
    }
    config.initial_seeds.insert(Species::Annual, 5 * scale);
    SimState::with_config(seed, config).expect("default config is valid")
}

fn bench_day_tick(c: &mut Criterion) {
    let terrain = FlatTerrain::new(0.0);
    let shadow = UniformShadow(0.3);
    let calendar = SeasonCycle::default();
    let env = Environment::new(&shadow, &calendar, &terrain);

    let mut group = c.benchmark_group("day_tick");
    for scale in [1_u32, 4, 16] {
        group.bench_function(format!("days{DAYS_PER_ITER}_scale{scale}"), |b| {
            b.iter_batched(
                || {
                    let mut sim = seeded_meadow(0xBEEF, scale);
                    sim.seed_initial_population(&env);
                    sim
                },
                |mut sim| {
                    for _ in 0..DAYS_PER_ITER {
                        std::hint::black_box(sim.pass_day(&env));
                    }
                    sim
                },
                BatchSize::LargeInput,
            )
        });
    }
    group.finish();
}

criterion_group!(benches, bench_day_tick);
criterion_main!(benches);
