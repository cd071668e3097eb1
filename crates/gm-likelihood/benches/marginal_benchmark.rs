use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use gm_core::{DistanceMarginalization, ParameterSpace, WaveformModel, WaveformParameters};
use gm_likelihood::{
    Detector, EventData, LikelihoodConfig, LookupTable, LookupTableConfig,
    MarginalizedDistancePhaseLikelihood,
};
use gm_waveform::{HarmonicPowerLaw, TaylorF2Qdol};
use std::collections::BTreeMap;
use std::hint::black_box;
use std::sync::Arc;

fn flat_event(name: &str, f_max: f64, psd: f64, fbounds: [f64; 2]) -> EventData {
    let frequencies: Vec<f64> = (0..=(2.0 * f_max) as usize).map(|i| 0.5 * i as f64).collect();
    let psd = vec![vec![psd; frequencies.len()]; 2];
    EventData::from_psd(
        name,
        vec![Detector::new("H1", 0.5, -0.4), Detector::new("L1", -0.45, 0.35)],
        frequencies,
        &psd,
        fbounds,
    )
    .unwrap()
}

fn reference(model: &dyn WaveformModel, intrinsic: &BTreeMap<String, f64>) -> WaveformParameters {
    let space = ParameterSpace::new(model.params()).unwrap();
    let intrinsic = space.intrinsic_from_map(intrinsic).unwrap();
    space.with_extrinsic(&intrinsic, 0.0, 1.0)
}

fn build(
    model: Arc<dyn WaveformModel>,
    mut event: EventData,
    intrinsic: &BTreeMap<String, f64>,
    injection_distance: f64,
    n_phi: usize,
) -> MarginalizedDistancePhaseLikelihood {
    let par0 = reference(model.as_ref(), intrinsic);
    let injection = par0.with("d_luminosity", injection_distance).unwrap().with("phi_ref", 0.7).unwrap();
    event.inject_signal(model.as_ref(), &injection).unwrap();
    event.add_gaussian_noise(1);
    let config = LikelihoodConfig { n_phi, ..LikelihoodConfig::default() };
    MarginalizedDistancePhaseLikelihood::from_config(event, model, par0, &config).unwrap()
}

fn to_map(pairs: &[(&str, f64)]) -> BTreeMap<String, f64> {
    pairs.iter().map(|&(k, v)| (k.to_string(), v)).collect()
}

fn bns_intrinsic() -> BTreeMap<String, f64> {
    let mut map = to_map(&[
        ("m1", 1.5),
        ("m2", 1.3),
        ("s1z", 0.05),
        ("s2z", -0.02),
        ("kappa1", 1.0),
        ("kappa2", 1.0),
        ("lambda1", 1.0),
        ("lambda2", 1.0),
        ("iota", 0.4),
    ]);
    for name in ["h1s1", "h2s1", "h1s3", "h2s3", "h1s0", "h2s0", "l1", "l2"] {
        map.insert(name.to_string(), 0.0);
    }
    map
}

fn bench_lnlike_n_phi(c: &mut Criterion) {
    let model: Arc<dyn WaveformModel> =
        Arc::new(HarmonicPowerLaw::new(50.0, vec![2, 3, 4], vec![1.0, 0.4, 0.2]).unwrap());
    let intrinsic = to_map(&[("amplitude", 0.5), ("iota", 0.4), ("tc", 0.001)]);

    let mut group = c.benchmark_group("lnlike_power_law");
    for n_phi in [1, 25, 100, 400] {
        let like = build(model.clone(), flat_event("bench", 256.0, 1.0, [20.0, 200.0]), &intrinsic, 5.0, n_phi);
        let par = like.intrinsic(&intrinsic).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(n_phi), &par, |b, par| {
            b.iter(|| black_box(like.lnlike(black_box(par)).unwrap()))
        });
    }
    group.finish();
}

fn bench_qdol(c: &mut Criterion) {
    let model: Arc<dyn WaveformModel> = Arc::new(TaylorF2Qdol::new(100.0, true).unwrap());
    let intrinsic = bns_intrinsic();
    let like = build(model, flat_event("bns", 1024.0, 1e-46, [20.0, 1000.0]), &intrinsic, 100.0, 100);
    let mut trial = intrinsic.clone();
    trial.insert("m1".to_string(), 1.5001);
    let par = like.intrinsic(&trial).unwrap();

    let mut group = c.benchmark_group("lnlike_qdol");
    group.bench_function("marginalized", |b| b.iter(|| black_box(like.lnlike(black_box(&par)).unwrap())));
    group.bench_function("phase_grid", |b| {
        b.iter(|| black_box(like.lnlike_dist_marg_on_phi_grid(black_box(&par)).unwrap()))
    });
    group.finish();
}

fn bench_lookup_table(c: &mut Criterion) {
    let table = LookupTable::new(&LookupTableConfig::default()).unwrap();
    let dh: Vec<f64> = (0..100).map(|o| 400.0 * (0.1 * o as f64).cos()).collect();
    let hh = vec![1.0e4; 100];

    c.bench_function("lookup_table_100_phases", |b| {
        b.iter(|| black_box(table.lnlike_marginalized(black_box(&dh), black_box(&hh)).unwrap()))
    });
}

criterion_group!(benches, bench_lnlike_n_phi, bench_qdol, bench_lookup_table);
criterion_main!(benches);
