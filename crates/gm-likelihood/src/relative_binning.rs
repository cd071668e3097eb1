//! Relative binning: summary weights around a reference waveform.
//!
//! The ratio `r(f) = h(f) / h0(f)` between a trial waveform and the fixed
//! reference is smooth, so it is represented by its values at a few bin edges
//! and interpolated linearly in between. Overlaps then reduce to sums over
//! edges against precomputed weights:
//!
//! - `dh[m,p,d] = Σ_b conj(r_mp(f_b)) W_dh[m,p,d,b]`
//! - `hh[k,p,P,d] = Σ_b r_ip(f_b) conj(r_jP(f_b)) W_hh[k,p,P,d,b]`
//!
//! where `k` runs over [`harmonic_pairs`] and off-diagonal pairs carry a
//! factor of 2 so that the real part of the sum is the full self-overlap.

use std::sync::Arc;

use gm_core::{
    Error, ParameterSpace, PolarizationStrain, Result, WaveformModel, WaveformParameters,
};
use num_complex::Complex64;

use crate::event_data::EventData;
use crate::fbin::FrequencyBins;
use crate::phase_grid::harmonic_pairs;

const ZERO: Complex64 = Complex64::new(0.0, 0.0);

/// Complex overlap summaries at one parameter point.
///
/// `dh` is laid out as `[mode][polarization][detector]` and `hh` as
/// `[pair][polarization][polarization][detector]`; neither is weighted by the
/// ASD drift.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryArrays {
    n_modes: usize,
    n_pairs: usize,
    n_detectors: usize,
    dh: Vec<Complex64>,
    hh: Vec<Complex64>,
}

impl SummaryArrays {
    /// Zero-filled arrays.
    pub fn zeros(n_modes: usize, n_pairs: usize, n_detectors: usize) -> Self {
        Self {
            n_modes,
            n_pairs,
            n_detectors,
            dh: vec![ZERO; n_modes * 2 * n_detectors],
            hh: vec![ZERO; n_pairs * 4 * n_detectors],
        }
    }

    /// Number of harmonics.
    pub fn n_modes(&self) -> usize {
        self.n_modes
    }

    /// Number of harmonic pairs.
    pub fn n_pairs(&self) -> usize {
        self.n_pairs
    }

    /// Number of detectors.
    pub fn n_detectors(&self) -> usize {
        self.n_detectors
    }

    #[inline]
    fn dh_index(&self, m: usize, p: usize, d: usize) -> usize {
        (m * 2 + p) * self.n_detectors + d
    }

    #[inline]
    fn hh_index(&self, k: usize, p: usize, pp: usize, d: usize) -> usize {
        ((k * 2 + p) * 2 + pp) * self.n_detectors + d
    }

    /// `<d|h>` term of harmonic `m`, polarization `p`, detector `d`.
    #[inline]
    pub fn dh(&self, m: usize, p: usize, d: usize) -> Complex64 {
        self.dh[self.dh_index(m, p, d)]
    }

    /// `<h|h>` term of pair `k`, polarizations `(p, pp)`, detector `d`.
    #[inline]
    pub fn hh(&self, k: usize, p: usize, pp: usize, d: usize) -> Complex64 {
        self.hh[self.hh_index(k, p, pp, d)]
    }

    /// Mutable access to one `dh` entry.
    pub fn dh_mut(&mut self, m: usize, p: usize, d: usize) -> &mut Complex64 {
        let i = self.dh_index(m, p, d);
        &mut self.dh[i]
    }

    /// Mutable access to one `hh` entry.
    pub fn hh_mut(&mut self, k: usize, p: usize, pp: usize, d: usize) -> &mut Complex64 {
        let i = self.hh_index(k, p, pp, d);
        &mut self.hh[i]
    }

    /// Real per-detector overlaps `(Re<d|h>, <h|h>)` after summing harmonics
    /// and polarizations.
    pub fn per_detector(&self) -> (Vec<f64>, Vec<f64>) {
        let mut dh = vec![0.0; self.n_detectors];
        let mut hh = vec![0.0; self.n_detectors];
        for d in 0..self.n_detectors {
            for m in 0..self.n_modes {
                for p in 0..2 {
                    dh[d] += self.dh(m, p, d).re;
                }
            }
            for k in 0..self.n_pairs {
                for p in 0..2 {
                    for pp in 0..2 {
                        hh[d] += self.hh(k, p, pp, d).re;
                    }
                }
            }
        }
        (dh, hh)
    }
}

/// Relative-binning likelihood without marginalization.
pub struct RelativeBinningLikelihood {
    event: EventData,
    model: Arc<dyn WaveformModel>,
    space: ParameterSpace,
    reference: WaveformParameters,
    bins: FrequencyBins,
    pairs: Vec<(usize, usize)>,
    h0_fbin: Vec<PolarizationStrain>,
    /// `[m][p][d][b]`
    dh_weights: Vec<Complex64>,
    /// `[k][p][P][d][b]`
    hh_weights: Vec<Complex64>,
}

impl std::fmt::Debug for RelativeBinningLikelihood {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelativeBinningLikelihood")
            .field("event", &self.event.eventname)
            .field("model", &self.model.name())
            .field("n_bins", &self.bins.n_bins())
            .field("pairs", &self.pairs)
            .finish()
    }
}

fn check_strain_shape(
    modes: &[PolarizationStrain],
    n_modes: usize,
    n_freq: usize,
    what: &str,
) -> Result<()> {
    if modes.len() != n_modes {
        return Err(Error::Validation(format!(
            "{what}: waveform returned {} harmonics, expected {n_modes}",
            modes.len()
        )));
    }
    if modes.iter().any(|m| m[0].len() != n_freq || m[1].len() != n_freq) {
        return Err(Error::Validation(format!(
            "{what}: waveform returned strain of wrong length, expected {n_freq}"
        )));
    }
    Ok(())
}

impl RelativeBinningLikelihood {
    /// Precompute summary weights around `reference`.
    pub fn new(
        event: EventData,
        model: Arc<dyn WaveformModel>,
        reference: WaveformParameters,
        bins: FrequencyBins,
    ) -> Result<Self> {
        event.validate()?;
        let space = ParameterSpace::new(model.params())?;
        if reference.names() != space.waveform_names() {
            return Err(Error::Configuration(format!(
                "reference parameters {:?} do not match model parameters {:?}",
                reference.names(),
                space.waveform_names()
            )));
        }
        let modes = model.harmonic_modes();
        let n_modes = modes.len();
        if n_modes == 0 {
            return Err(Error::Configuration("waveform model declares no harmonics".to_string()));
        }
        let pairs = harmonic_pairs(n_modes);
        let n_pairs = pairs.len();
        let n_det = event.n_detectors();
        let n_edges = bins.edges().len();

        let first = bins.indices()[0];
        let last = bins.indices()[n_edges - 1];
        let freqs = &event.frequencies[first..=last];
        let h0_full = model.hplus_hcross_by_mode(freqs, &reference)?;
        check_strain_shape(&h0_full, n_modes, freqs.len(), "reference on grid")?;
        let h0_fbin = model.hplus_hcross_by_mode(bins.edges(), &reference)?;
        check_strain_shape(&h0_fbin, n_modes, n_edges, "reference at bin edges")?;

        let mut dh_weights = vec![ZERO; n_modes * 2 * n_det * n_edges];
        let mut hh_weights = vec![ZERO; n_pairs * 4 * n_det * n_edges];
        let idx = bins.indices();

        for d in 0..n_det {
            let det = &event.detectors[d];
            for (j, i) in (first..=last).enumerate() {
                let w = event.weight(d, i);
                if w == 0.0 {
                    continue;
                }
                // Hat basis on the edges: weight (1 - t) to edge b, t to b + 1.
                let b = (idx.partition_point(|&e| e <= i) - 1).min(n_edges - 2);
                let t = (i - idx[b]) as f64 / (idx[b + 1] - idx[b]) as f64;
                let data = event.strain[d][i] * w;

                for m in 0..n_modes {
                    for p in 0..2 {
                        let val = data * h0_full[m][p][j].conj() * det.antenna(p);
                        let base = ((m * 2 + p) * n_det + d) * n_edges;
                        dh_weights[base + b] += val * (1.0 - t);
                        dh_weights[base + b + 1] += val * t;
                    }
                }
                for (k, &(m1, m2)) in pairs.iter().enumerate() {
                    let c_k = if m1 == m2 { w } else { 2.0 * w };
                    for p in 0..2 {
                        for pp in 0..2 {
                            let val = h0_full[m1][p][j] * h0_full[m2][pp][j].conj()
                                * (det.antenna(p) * det.antenna(pp) * c_k);
                            let base = (((k * 2 + p) * 2 + pp) * n_det + d) * n_edges;
                            hh_weights[base + b] += val * (1.0 - t);
                            hh_weights[base + b + 1] += val * t;
                        }
                    }
                }
            }
        }

        log::debug!(
            "relative binning for {}: {} harmonics, {} pairs, {} bins, {} detectors",
            event.eventname,
            n_modes,
            n_pairs,
            bins.n_bins(),
            n_det
        );

        Ok(Self { event, model, space, reference, bins, pairs, h0_fbin, dh_weights, hh_weights })
    }

    /// Event data.
    pub fn event(&self) -> &EventData {
        &self.event
    }

    /// Waveform model.
    pub fn model(&self) -> &Arc<dyn WaveformModel> {
        &self.model
    }

    /// Parameter layout of the model.
    pub fn space(&self) -> &ParameterSpace {
        &self.space
    }

    /// Reference waveform parameters.
    pub fn reference_parameters(&self) -> &WaveformParameters {
        &self.reference
    }

    /// Frequency bins.
    pub fn bins(&self) -> &FrequencyBins {
        &self.bins
    }

    /// Harmonic pair order of the `hh` summaries.
    pub fn harmonic_pairs(&self) -> &[(usize, usize)] {
        &self.pairs
    }

    /// `asd_drift^-2` per detector.
    pub fn asd_drift_weights(&self) -> Vec<f64> {
        self.event.asd_drift_weights()
    }

    /// Complex summary arrays at `par`, not weighted by ASD drift.
    pub fn dh_hh_complex_no_asd_drift(&self, par: &WaveformParameters) -> Result<SummaryArrays> {
        let n_modes = self.h0_fbin.len();
        let n_edges = self.bins.edges().len();
        let n_det = self.event.n_detectors();

        let h = self.model.hplus_hcross_by_mode(self.bins.edges(), par)?;
        check_strain_shape(&h, n_modes, n_edges, "trial at bin edges")?;

        // ratio[m][p][b]
        let ratio: Vec<[Vec<Complex64>; 2]> = h
            .iter()
            .zip(&self.h0_fbin)
            .map(|(hm, h0m)| {
                let r = |p: usize| -> Vec<Complex64> {
                    hm[p]
                        .iter()
                        .zip(&h0m[p])
                        .map(|(&a, &b)| if b == ZERO { ZERO } else { a / b })
                        .collect()
                };
                [r(0), r(1)]
            })
            .collect();

        let mut out = SummaryArrays::zeros(n_modes, self.pairs.len(), n_det);
        for m in 0..n_modes {
            for p in 0..2 {
                for d in 0..n_det {
                    let base = ((m * 2 + p) * n_det + d) * n_edges;
                    let w = &self.dh_weights[base..base + n_edges];
                    *out.dh_mut(m, p, d) =
                        ratio[m][p].iter().zip(w).map(|(r, &wb)| r.conj() * wb).sum();
                }
            }
        }
        for (k, &(m1, m2)) in self.pairs.iter().enumerate() {
            for p in 0..2 {
                for pp in 0..2 {
                    let rr: Vec<Complex64> = ratio[m1][p]
                        .iter()
                        .zip(&ratio[m2][pp])
                        .map(|(&a, &b)| a * b.conj())
                        .collect();
                    for d in 0..n_det {
                        let base = (((k * 2 + p) * 2 + pp) * n_det + d) * n_edges;
                        let w = &self.hh_weights[base..base + n_edges];
                        *out.hh_mut(k, p, pp, d) = rr.iter().zip(w).map(|(&r, &wb)| r * wb).sum();
                    }
                }
            }
        }
        Ok(out)
    }

    /// Real per-detector overlaps `(Re<d|h>, <h|h>)` at `par`.
    pub fn dh_hh_no_asd_drift(&self, par: &WaveformParameters) -> Result<(Vec<f64>, Vec<f64>)> {
        Ok(self.dh_hh_complex_no_asd_drift(par)?.per_detector())
    }

    /// `Σ_d (<d|h>_d - <h|h>_d / 2) / asd_drift_d^2`.
    pub fn lnlike_no_marginalization(&self, par: &WaveformParameters) -> Result<f64> {
        let (dh, hh) = self.dh_hh_no_asd_drift(par)?;
        Ok(self
            .asd_drift_weights()
            .iter()
            .zip(dh.iter().zip(&hh))
            .map(|(&w, (&dh_d, &hh_d))| w * (dh_d - 0.5 * hh_d))
            .sum())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::direct;
    use crate::event_data::tests::flat_event;
    use approx::assert_relative_eq;
    use gm_waveform::HarmonicPowerLaw;

    pub(crate) fn power_law() -> Arc<dyn WaveformModel> {
        Arc::new(HarmonicPowerLaw::new(50.0, vec![2, 3], vec![1.0, 0.4]).unwrap())
    }

    pub(crate) fn power_law_par(
        model: &dyn WaveformModel,
        amplitude: f64,
        tc: f64,
        phi_ref: f64,
        d_luminosity: f64,
    ) -> WaveformParameters {
        let space = ParameterSpace::new(model.params()).unwrap();
        // Intrinsic names sorted: amplitude, iota, tc.
        let intrinsic = space.intrinsic_from_values(vec![amplitude, 0.4, tc]).unwrap();
        space.with_extrinsic(&intrinsic, phi_ref, d_luminosity)
    }

    fn injected_event(model: &dyn WaveformModel) -> EventData {
        let mut event = flat_event();
        event.inject_signal(model, &power_law_par(model, 2.0, 0.001, 0.3, 1.0)).unwrap();
        event
    }

    #[test]
    fn test_reference_point_is_exact() {
        let model = power_law();
        let event = injected_event(model.as_ref());
        let reference = power_law_par(model.as_ref(), 2.0, 0.001, 0.0, 1.0);
        let bins = FrequencyBins::from_edges(&event, &[20.0, 40.0, 80.0, 200.0]).unwrap();
        let rb = RelativeBinningLikelihood::new(
            event.clone(),
            Arc::clone(&model),
            reference.clone(),
            bins,
        )
        .unwrap();
        let (dh, hh) = rb.dh_hh_no_asd_drift(&reference).unwrap();
        let (dh_exact, hh_exact) = direct::inner_products(&event, model.as_ref(), &reference).unwrap();
        for d in 0..2 {
            assert_relative_eq!(dh[d], dh_exact[d], max_relative = 1e-10);
            assert_relative_eq!(hh[d], hh_exact[d], max_relative = 1e-10);
        }
    }

    #[test]
    fn test_nearby_point_with_dense_bins() {
        let model = power_law();
        let event = injected_event(model.as_ref());
        let reference = power_law_par(model.as_ref(), 2.0, 0.001, 0.0, 1.0);
        let bins = FrequencyBins::from_pn_phase_tol(&event, 0.05, 2).unwrap();
        let rb =
            RelativeBinningLikelihood::new(event.clone(), Arc::clone(&model), reference, bins)
                .unwrap();
        let par = power_law_par(model.as_ref(), 1.7, 0.0012, 0.5, 1.0);
        let lnl = rb.lnlike_no_marginalization(&par).unwrap();
        let exact = direct::lnlike_no_marginalization(&event, model.as_ref(), &par).unwrap();
        assert_relative_eq!(lnl, exact, max_relative = 1e-4);
    }

    #[test]
    fn test_pair_count_matches_harmonics() {
        let model = power_law();
        let event = flat_event();
        let reference = power_law_par(model.as_ref(), 1.0, 0.0, 0.0, 1.0);
        let bins = FrequencyBins::from_edges(&event, &[20.0, 200.0]).unwrap();
        let rb = RelativeBinningLikelihood::new(event, model, reference.clone(), bins).unwrap();
        assert_eq!(rb.harmonic_pairs(), &[(0, 0), (0, 1), (1, 1)]);
        let s = rb.dh_hh_complex_no_asd_drift(&reference).unwrap();
        assert_eq!((s.n_modes(), s.n_pairs(), s.n_detectors()), (2, 3, 2));
    }

    #[test]
    fn test_reference_must_match_model_parameters() {
        let model = power_law();
        let event = flat_event();
        let bins = FrequencyBins::from_edges(&event, &[20.0, 200.0]).unwrap();
        let reference =
            WaveformParameters::new(vec!["amplitude".to_string()], vec![1.0]).unwrap();
        let err = RelativeBinningLikelihood::new(event, model, reference, bins).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }
}
