use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use lattice_core::{approximate_volume, qary_basis, volume};
use num_bigint::BigInt;
use rand::rngs::StdRng;
use rand::SeedableRng;
use reduction_oracle::{decode_basis, encode_basis, ReductionOracle};

fn bench_volume(c: &mut Criterion) {
    let mut group = c.benchmark_group("volume");
    let mut rng = StdRng::seed_from_u64(7);
    let q = BigInt::from(131);

    for n in [10, 20, 30] {
        let basis = qary_basis(n, n, &q, &mut rng).unwrap();
        group.bench_with_input(BenchmarkId::new("exact", 2 * n), &basis, |b, basis| {
            b.iter(|| volume(basis));
        });
        group.bench_with_input(BenchmarkId::new("approximate", 2 * n), &basis, |b, basis| {
            b.iter(|| approximate_volume(basis));
        });
    }

    group.finish();
}

fn bench_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("codec");
    let mut rng = StdRng::seed_from_u64(11);
    let q: BigInt = "340282366920938463463374607431768211507".parse().unwrap();

    for n in [15, 30] {
        let basis = qary_basis(n, n, &q, &mut rng).unwrap();
        let text = encode_basis(&basis);
        group.bench_with_input(BenchmarkId::new("encode", 2 * n), &basis, |b, basis| {
            b.iter(|| encode_basis(basis));
        });
        group.bench_with_input(BenchmarkId::new("decode", 2 * n), &text, |b, text| {
            b.iter(|| decode_basis(text).unwrap());
        });
    }

    group.finish();
}

fn bench_simulated_oracle(c: &mut Criterion) {
    let mut group = c.benchmark_group("simulated_oracle");
    group.sample_size(20);
    let mut rng = StdRng::seed_from_u64(13);
    let q = BigInt::from(131);
    let oracle = ReductionOracle::simulated();

    for n in [10, 30] {
        let basis = qary_basis(n, n, &q, &mut rng).unwrap();
        group.bench_with_input(BenchmarkId::new("svp", 2 * n), &basis, |b, basis| {
            b.iter(|| oracle.query_shortest_vector(basis, 50.0).unwrap());
        });
        group.bench_with_input(BenchmarkId::new("profile", 2 * n), &basis, |b, basis| {
            b.iter(|| oracle.query_reduced_profile(basis, 10).unwrap());
        });
    }

    group.finish();
}

criterion_group!(benches, bench_volume, bench_codec, bench_simulated_oracle);
criterion_main!(benches);
