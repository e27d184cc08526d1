use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::{rngs::StdRng, Rng, SeedableRng};

use scanreg_index::SearchTree;

fn random_points(num_points: usize, seed: u64) -> Vec<[f64; 3]> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..num_points)
        .map(|_| {
            [
                rng.random_range(-1.0..1.0),
                rng.random_range(-1.0..1.0),
                rng.random_range(-0.1..0.1),
            ]
        })
        .collect()
}

fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("SearchTreeBuild");

    for num_points in [1_000, 10_000, 100_000].iter() {
        let points = random_points(*num_points, 42);
        group.bench_with_input(
            BenchmarkId::new("build", num_points),
            &points,
            |b, points| b.iter(|| SearchTree::build(black_box(points), 0.02)),
        );
    }

    group.finish();
}

fn bench_query(c: &mut Criterion) {
    let mut group = c.benchmark_group("SearchTreeQuery");

    for num_points in [1_000, 10_000, 100_000].iter() {
        let points = random_points(*num_points, 42);
        let queries = random_points(1_000, 7);
        let Ok(tree) = SearchTree::build(&points, 0.02) else {
            continue;
        };

        group.bench_with_input(
            BenchmarkId::new("exact", num_points),
            &queries,
            |b, queries| {
                b.iter(|| {
                    for q in queries {
                        black_box(tree.find_neighbor(q, 0.5));
                    }
                })
            },
        );

        group.bench_with_input(
            BenchmarkId::new("approx", num_points),
            &queries,
            |b, queries| {
                b.iter(|| {
                    for q in queries {
                        black_box(tree.find_neighbor_approx(q, 0.5));
                    }
                })
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_build, bench_query);
criterion_main!(benches);
