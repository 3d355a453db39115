use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use rand::SeedableRng;
use rand::rngs::StdRng;
use vsearch_experiment::{ExperimentParameters, OrderingStrategy, TrialBlockGenerator};

fn generator(ordering: OrderingStrategy) -> TrialBlockGenerator {
    let params = ExperimentParameters {
        ordering,
        ..Default::default()
    };
    TrialBlockGenerator::new(params).expect("default parameters are valid")
}

pub fn bench_generate(c: &mut Criterion) {
    let mut g = c.benchmark_group("generate");
    g.sample_size(60);

    let interleave = generator(OrderingStrategy::Interleave);
    g.bench_function("interleave_20_blocks", |b| {
        b.iter_batched(
            || StdRng::seed_from_u64(42),
            |mut rng| black_box(interleave.generate(&mut rng)),
            BatchSize::SmallInput,
        )
    });

    let rejection = generator(OrderingStrategy::Rejection {
        max_attempts: 100_000,
    });
    g.bench_function("rejection_20_blocks", |b| {
        b.iter_batched(
            || StdRng::seed_from_u64(42),
            |mut rng| black_box(rejection.generate(&mut rng)),
            BatchSize::SmallInput,
        )
    });

    g.finish();
}

criterion_group!(benches, bench_generate);
criterion_main!(benches);
