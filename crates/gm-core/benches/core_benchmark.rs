use criterion::{Criterion, criterion_group, criterion_main};
use gm_core::ParameterSpace;
use std::collections::BTreeMap;
use std::hint::black_box;

const QDOL_PARAMS: [&str; 19] = [
    "m1", "m2", "s1z", "s2z", "kappa1", "kappa2", "h1s1", "h2s1", "lambda1", "lambda2", "h1s3",
    "h2s3", "h1s0", "h2s0", "l1", "l2", "d_luminosity", "phi_ref", "iota",
];

fn bench_parameter_merge(c: &mut Criterion) {
    let space = ParameterSpace::new(&QDOL_PARAMS).unwrap();
    let map: BTreeMap<String, f64> = space
        .intrinsic_names()
        .iter()
        .enumerate()
        .map(|(i, n)| (n.clone(), 1.0 + i as f64))
        .collect();

    let mut group = c.benchmark_group("parameters");
    group.bench_function("intrinsic_from_map", |b| {
        b.iter(|| black_box(space.intrinsic_from_map(black_box(&map)).unwrap()))
    });

    let intrinsic = space.intrinsic_from_map(&map).unwrap();
    group.bench_function("with_extrinsic", |b| {
        b.iter(|| black_box(space.with_extrinsic(black_box(&intrinsic), 0.0, 1.0)))
    });
    group.finish();
}

criterion_group!(benches, bench_parameter_merge);
criterion_main!(benches);
