use criterion::{black_box, criterion_group, criterion_main, Criterion};
use experiments::{allocate, test_significance, ExperimentDefinition, SeededSource, VariantSample};

fn significance_benchmark(c: &mut Criterion) {
    let baseline = VariantSample::new(10_000, 1_200);
    let treatment = VariantSample::new(10_000, 1_350);

    c.bench_function("test_significance_aggregated_counts", |b| {
        b.iter(|| {
            let verdict =
                test_significance(black_box(baseline), black_box(treatment), 95.0, 1000);
            black_box(verdict.p_value);
        });
    });
}

fn allocation_benchmark(c: &mut Criterion) {
    let definition = ExperimentDefinition::new(
        "bench",
        vec!["variant-a", "variant-b", "variant-c", "variant-d"],
        "variant-a",
    )
    .expect("bench definition")
    .with_weights(vec![0.4, 0.3, 0.2, 0.1]);
    let mut rng = SeededSource::new(1);

    c.bench_function("allocate_weighted_variant", |b| {
        b.iter(|| {
            let variant = allocate(black_box(&definition), &mut rng);
            black_box(variant.len());
        });
    });
}

criterion_group!(benches, significance_benchmark, allocation_benchmark);
criterion_main!(benches);
