use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

fn bench_logsumexp(c: &mut Criterion) {
    let xs: Vec<f64> = (0..100).map(|i| -0.5 * ((i as f64) - 40.0).powi(2) / 25.0).collect();

    c.bench_function("logsumexp_100", |b| b.iter(|| black_box(gm_prob::logsumexp(black_box(&xs)))));

    c.bench_function("relative_weights_100", |b| {
        b.iter(|| black_box(gm_prob::relative_weights(black_box(&xs)).unwrap()))
    });
}

fn bench_inverse_cdf(c: &mut Criterion) {
    let x: Vec<f64> = (0..=100).map(|i| i as f64 * 0.01).collect();
    let cdf: Vec<f64> = x.iter().map(|v| v * v).collect();

    c.bench_function("inverse_cdf_101", |b| {
        b.iter(|| black_box(gm_prob::inverse_cdf(black_box(0.37), &x, &cdf).unwrap()))
    });
}

criterion_group!(benches, bench_logsumexp, bench_inverse_cdf);
criterion_main!(benches);
