//! Relative-binning frequency edges.

use std::f64::consts::PI;

use gm_core::{Error, Result};
use gm_prob::interp;

use crate::event_data::EventData;

/// Points used to tabulate the proxy phase.
const N_PHASE_SAMPLES: usize = 10_000;

/// Bin edges snapped onto the event's frequency grid.
#[derive(Debug, Clone, PartialEq)]
pub struct FrequencyBins {
    edges: Vec<f64>,
    indices: Vec<usize>,
}

impl FrequencyBins {
    /// Snap arbitrary edges [Hz] to the nearest in-band grid frequency.
    ///
    /// Edges outside `fbounds` are clamped to the band; duplicates after
    /// snapping are dropped.
    pub fn from_edges(event: &EventData, edges: &[f64]) -> Result<Self> {
        if edges.iter().any(|f| !f.is_finite()) {
            return Err(Error::Configuration("frequency bin edges must be finite".to_string()));
        }
        let band = event.band_indices();
        if band.is_empty() {
            return Err(Error::Configuration("analysis band contains no frequencies".to_string()));
        }
        let f0 = event.frequencies[0];
        let df = event.df();
        let mut indices: Vec<usize> = edges
            .iter()
            .map(|&f| {
                let nearest = ((f - f0) / df).round().max(0.0) as usize;
                nearest.clamp(band.start, band.end - 1)
            })
            .collect();
        indices.sort_unstable();
        indices.dedup();
        if indices.len() < 2 {
            return Err(Error::Configuration(format!(
                "need at least two distinct frequency bin edges, got {}",
                indices.len()
            )));
        }
        let edges = indices.iter().map(|&i| event.frequencies[i]).collect();
        Ok(Self { edges, indices })
    }

    /// Edges with a proxy-phase change of at most `pn_phase_tol` per bin.
    pub fn from_pn_phase_tol(event: &EventData, pn_phase_tol: f64, n_harmonics: usize) -> Result<Self> {
        let edges = pn_phase_edges(event.fbounds, pn_phase_tol, &pn_exponents(n_harmonics))?;
        Self::from_edges(event, &edges)
    }

    /// Edge frequencies [Hz].
    pub fn edges(&self) -> &[f64] {
        &self.edges
    }

    /// Grid indices of the edges.
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    /// Number of bins (edges minus one).
    pub fn n_bins(&self) -> usize {
        self.edges.len() - 1
    }
}

/// Power-law exponents of the proxy phase: leading order, 1PN and the
/// time shift, plus a 1.5PN-like term when higher harmonics are present.
pub fn pn_exponents(n_harmonics: usize) -> Vec<f64> {
    let mut exponents = vec![-5.0 / 3.0, -2.0 / 3.0, 1.0];
    if n_harmonics > 1 {
        exponents.push(-4.0 / 3.0);
    }
    exponents
}

/// Split `[f_min, f_max]` into bins of equal proxy phase.
///
/// Each exponent `α` contributes `sign(α) c_α f^α` with `c_α` normalizing
/// its total variation over the band to `2π`.
pub fn pn_phase_edges(fbounds: [f64; 2], pn_phase_tol: f64, exponents: &[f64]) -> Result<Vec<f64>> {
    let [f_min, f_max] = fbounds;
    if !(f_min > 0.0 && f_max > f_min && f_max.is_finite()) {
        return Err(Error::Configuration(format!(
            "PN binning needs 0 < f_min < f_max, got [{f_min}, {f_max}]"
        )));
    }
    if !(pn_phase_tol.is_finite() && pn_phase_tol > 0.0) {
        return Err(Error::Configuration(format!(
            "pn_phase_tol must be positive, got {pn_phase_tol}"
        )));
    }

    let step = (f_max - f_min) / (N_PHASE_SAMPLES - 1) as f64;
    let f_arr: Vec<f64> = (0..N_PHASE_SAMPLES).map(|i| f_min + step * i as f64).collect();
    let coeffs: Vec<f64> =
        exponents.iter().map(|&a| 2.0 * PI / (f_min.powf(a) - f_max.powf(a)).abs()).collect();
    let mut phase: Vec<f64> = f_arr
        .iter()
        .map(|&f| exponents.iter().zip(&coeffs).map(|(&a, &c)| a.signum() * c * f.powf(a)).sum())
        .collect();
    let phase0 = phase[0];
    phase.iter_mut().for_each(|p| *p -= phase0);

    let total = phase[N_PHASE_SAMPLES - 1];
    let n_bins = (total / pn_phase_tol).ceil().max(1.0) as usize;
    let edges = (0..=n_bins)
        .map(|k| interp(total * k as f64 / n_bins as f64, &phase, &f_arr))
        .collect();
    log::debug!("PN phase binning: {n_bins} bins over [{f_min}, {f_max}] Hz");
    Ok(edges)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_data::tests::flat_event;
    use approx::assert_relative_eq;

    #[test]
    fn test_edges_snap_and_dedup() {
        let event = flat_event();
        let bins = FrequencyBins::from_edges(&event, &[10.0, 20.1, 20.2, 64.26, 300.0]).unwrap();
        assert_eq!(bins.edges(), &[20.0, 64.5, 200.0]);
        assert_eq!(bins.indices(), &[40, 129, 400]);
        assert_eq!(bins.n_bins(), 2);
    }

    #[test]
    fn test_single_edge_rejected() {
        let event = flat_event();
        let err = FrequencyBins::from_edges(&event, &[5.0, 10.0]).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_pn_edges_cover_band_with_expected_count() {
        let exponents = pn_exponents(1);
        let edges = pn_phase_edges([20.0, 200.0], 0.5, &exponents).unwrap();
        // Each of the three terms contributes 2π of proxy phase.
        let expected_bins = (6.0 * PI / 0.5).ceil() as usize;
        assert_eq!(edges.len(), expected_bins + 1);
        assert_relative_eq!(edges[0], 20.0);
        assert_relative_eq!(edges[expected_bins], 200.0, epsilon = 1e-9);
        assert!(edges.windows(2).all(|w| w[1] > w[0]));
        // The leading-order term packs bins at low frequency.
        assert!(edges[1] - edges[0] < edges[expected_bins] - edges[expected_bins - 1]);
    }

    #[test]
    fn test_higher_harmonics_add_exponent() {
        assert_eq!(pn_exponents(1).len(), 3);
        assert_eq!(pn_exponents(3).len(), 4);
    }
}
