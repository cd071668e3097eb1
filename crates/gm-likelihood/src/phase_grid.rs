//! Phase grid, harmonic pairs and phasor matrices.

use std::f64::consts::TAU;

use gm_core::{Error, Result};
use num_complex::Complex64;

use crate::relative_binning::SummaryArrays;

/// All `(i, j)` with `i <= j < n`, lexicographic by index.
///
/// Fixes the order of the cross-harmonic axis in both the `hh` summaries and
/// the cross phasor.
pub fn harmonic_pairs(n: usize) -> Vec<(usize, usize)> {
    (0..n).flat_map(|i| (i..n).map(move |j| (i, j))).collect()
}

/// Phase samples and the phasors that rotate summaries onto them.
///
/// Built once per likelihood and shared read-only across evaluations.
#[derive(Debug, Clone, PartialEq)]
pub struct MarginalizationGrid {
    harmonics: Vec<i32>,
    pairs: Vec<(usize, usize)>,
    phi: Vec<f64>,
    /// `exp(-i m phi_o)`, `[mode][o]`.
    dh_phasor: Vec<Vec<Complex64>>,
    /// `exp(i (m_i - m_j) phi_o)`, `[pair][o]`.
    hh_phasor: Vec<Vec<Complex64>>,
}

impl MarginalizationGrid {
    /// `n_phi` phases `2π o / n_phi`, `o = 0..n_phi`.
    pub fn new(harmonics: &[i32], n_phi: usize) -> Result<Self> {
        Self::with_offset(harmonics, n_phi, 0.0)
    }

    /// Grid rotated by `phi0`: phases `phi0 + 2π o / n_phi`.
    pub fn with_offset(harmonics: &[i32], n_phi: usize, phi0: f64) -> Result<Self> {
        if n_phi == 0 {
            return Err(Error::Configuration("n_phi must be at least 1".to_string()));
        }
        if harmonics.is_empty() {
            return Err(Error::Configuration("harmonic set is empty".to_string()));
        }
        for (i, m) in harmonics.iter().enumerate() {
            if harmonics[..i].contains(m) {
                return Err(Error::Configuration(format!("duplicate harmonic m = {m}")));
            }
        }
        if !phi0.is_finite() {
            return Err(Error::Configuration(format!("phase offset must be finite, got {phi0}")));
        }

        let pairs = harmonic_pairs(harmonics.len());
        let phi: Vec<f64> = (0..n_phi).map(|o| phi0 + TAU * o as f64 / n_phi as f64).collect();
        let dh_phasor = harmonics
            .iter()
            .map(|&m| phi.iter().map(|&p| Complex64::from_polar(1.0, -(m as f64) * p)).collect())
            .collect();
        let hh_phasor = pairs
            .iter()
            .map(|&(i, j)| {
                let dm = (harmonics[i] - harmonics[j]) as f64;
                phi.iter().map(|&p| Complex64::from_polar(1.0, dm * p)).collect()
            })
            .collect();

        let grid = Self { harmonics: harmonics.to_vec(), pairs, phi, dh_phasor, hh_phasor };
        grid.validate()?;
        Ok(grid)
    }

    /// Same harmonics and resolution, rotated by `phi0`.
    pub fn rotated(&self, phi0: f64) -> Result<Self> {
        Self::with_offset(&self.harmonics, self.n_phi(), phi0)
    }

    /// Harmonic numbers.
    pub fn harmonics(&self) -> &[i32] {
        &self.harmonics
    }

    /// Harmonic pair index.
    pub fn harmonic_pairs(&self) -> &[(usize, usize)] {
        &self.pairs
    }

    /// Phase samples [rad].
    pub fn phi(&self) -> &[f64] {
        &self.phi
    }

    /// Number of phase samples.
    pub fn n_phi(&self) -> usize {
        self.phi.len()
    }

    /// Linear phasor `[mode][o]`.
    pub fn dh_phasor(&self) -> &[Vec<Complex64>] {
        &self.dh_phasor
    }

    /// Cross phasor `[pair][o]`.
    pub fn hh_phasor(&self) -> &[Vec<Complex64>] {
        &self.hh_phasor
    }

    /// Shape and well-formedness checks.
    ///
    /// Both phasors must have one row per harmonic (pair) and one column per
    /// phase sample, and the column at the first grid phase must be the
    /// rotation by that phase (all ones for an unrotated grid).
    pub fn validate(&self) -> Result<()> {
        let h = self.harmonics.len();
        let n_phi = self.phi.len();
        if self.pairs.len() != h * (h + 1) / 2 {
            return Err(Error::Configuration(format!(
                "{} harmonic pairs for {h} harmonics",
                self.pairs.len()
            )));
        }
        if self.dh_phasor.len() != h || self.dh_phasor.iter().any(|row| row.len() != n_phi) {
            return Err(Error::Configuration("linear phasor has the wrong shape".to_string()));
        }
        if self.hh_phasor.len() != self.pairs.len()
            || self.hh_phasor.iter().any(|row| row.len() != n_phi)
        {
            return Err(Error::Configuration("cross phasor has the wrong shape".to_string()));
        }
        let phi0 = self.phi[0];
        let tol = 1e-12;
        for (row, &m) in self.dh_phasor.iter().zip(&self.harmonics) {
            let unrotated = row[0] * Complex64::from_polar(1.0, m as f64 * phi0);
            if (unrotated - 1.0).norm() > tol {
                return Err(Error::Configuration(format!(
                    "linear phasor of m = {m} is not one at phase 0"
                )));
            }
        }
        for (row, &(i, j)) in self.hh_phasor.iter().zip(&self.pairs) {
            let dm = (self.harmonics[i] - self.harmonics[j]) as f64;
            let unrotated = row[0] * Complex64::from_polar(1.0, -dm * phi0);
            if (unrotated - 1.0).norm() > tol {
                return Err(Error::Configuration(format!(
                    "cross phasor of pair ({i}, {j}) is not one at phase 0"
                )));
            }
        }
        Ok(())
    }

    /// Overlaps `(Re<d|h>_o, <h|h>_o)` at every grid phase, weighted by
    /// `asd_weights` (one per detector).
    pub fn contract(
        &self,
        summary: &SummaryArrays,
        asd_weights: &[f64],
    ) -> Result<(Vec<f64>, Vec<f64>)> {
        let n_det = summary.n_detectors();
        if summary.n_modes() != self.harmonics.len()
            || summary.n_pairs() != self.pairs.len()
            || asd_weights.len() != n_det
        {
            return Err(Error::Validation(format!(
                "summary shape ({}, {}, {}) does not match grid ({}, {}) with {} noise weights",
                summary.n_modes(),
                summary.n_pairs(),
                n_det,
                self.harmonics.len(),
                self.pairs.len(),
                asd_weights.len()
            )));
        }

        // Sum polarizations and detectors first; the phasor depends only on
        // the harmonic (pair).
        let dh_m: Vec<Complex64> = (0..self.harmonics.len())
            .map(|m| {
                let mut acc = Complex64::new(0.0, 0.0);
                for p in 0..2 {
                    for (d, &w) in asd_weights.iter().enumerate() {
                        acc += summary.dh(m, p, d) * w;
                    }
                }
                acc
            })
            .collect();
        let hh_k: Vec<Complex64> = (0..self.pairs.len())
            .map(|k| {
                let mut acc = Complex64::new(0.0, 0.0);
                for p in 0..2 {
                    for pp in 0..2 {
                        for (d, &w) in asd_weights.iter().enumerate() {
                            acc += summary.hh(k, p, pp, d) * w;
                        }
                    }
                }
                acc
            })
            .collect();

        let n_phi = self.n_phi();
        let dh_o = (0..n_phi)
            .map(|o| dh_m.iter().zip(&self.dh_phasor).map(|(a, row)| (a * row[o]).re).sum())
            .collect();
        let hh_o = (0..n_phi)
            .map(|o| hh_k.iter().zip(&self.hh_phasor).map(|(b, row)| (b * row[o]).re).sum())
            .collect();
        Ok((dh_o, hh_o))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_pair_count_and_order() {
        for h in 1..6 {
            let pairs = harmonic_pairs(h);
            assert_eq!(pairs.len(), h * (h + 1) / 2);
            assert!(pairs.iter().all(|&(i, j)| i <= j && j < h));
            let mut sorted = pairs.clone();
            sorted.sort();
            sorted.dedup();
            assert_eq!(sorted, pairs);
        }
        assert_eq!(harmonic_pairs(3), vec![(0, 0), (0, 1), (0, 2), (1, 1), (1, 2), (2, 2)]);
    }

    #[test]
    fn test_phasors_are_one_at_phase_zero() {
        let grid = MarginalizationGrid::new(&[2, 3, 4], 16).unwrap();
        assert_eq!(grid.phi()[0], 0.0);
        for row in grid.dh_phasor().iter().chain(grid.hh_phasor()) {
            assert_eq!(row[0], Complex64::new(1.0, 0.0));
        }
    }

    #[test]
    fn test_grid_excludes_endpoint() {
        let grid = MarginalizationGrid::new(&[2], 4).unwrap();
        let expected = [0.0, TAU / 4.0, TAU / 2.0, 3.0 * TAU / 4.0];
        for (a, b) in grid.phi().iter().zip(expected) {
            assert_relative_eq!(*a, b, epsilon = 1e-15);
        }
        // exp(-2i π/2) = -1
        assert_relative_eq!(grid.dh_phasor()[0][1].re, -1.0, epsilon = 1e-15);
    }

    #[test]
    fn test_cross_phasor_uses_harmonic_difference() {
        let grid = MarginalizationGrid::new(&[2, 3], 8).unwrap();
        // pair (0, 1): exp(i (2 - 3) phi)
        let z = grid.hh_phasor()[1][1];
        assert_relative_eq!(z.re, (-TAU / 8.0).cos(), epsilon = 1e-15);
        assert_relative_eq!(z.im, (-TAU / 8.0).sin(), epsilon = 1e-15);
        // diagonal pairs do not rotate
        assert!(grid.hh_phasor()[0].iter().all(|z| *z == Complex64::new(1.0, 0.0)));
    }

    #[test]
    fn test_rotated_grid_validates() {
        let grid = MarginalizationGrid::new(&[2, 3], 10).unwrap();
        let rotated = grid.rotated(0.37).unwrap();
        assert_relative_eq!(rotated.phi()[0], 0.37);
        assert_relative_eq!(rotated.phi()[3], grid.phi()[3] + 0.37, epsilon = 1e-15);
    }

    #[test]
    fn test_invalid_grids_rejected() {
        assert!(matches!(MarginalizationGrid::new(&[2], 0), Err(Error::Configuration(_))));
        assert!(matches!(MarginalizationGrid::new(&[], 4), Err(Error::Configuration(_))));
        assert!(matches!(MarginalizationGrid::new(&[2, 2], 4), Err(Error::Configuration(_))));
    }

    #[test]
    fn test_contract_single_harmonic() {
        let grid = MarginalizationGrid::new(&[2], 4).unwrap();
        let mut s = SummaryArrays::zeros(1, 1, 1);
        *s.dh_mut(0, 0, 0) = Complex64::new(1.0, 0.0);
        *s.hh_mut(0, 0, 0, 0) = Complex64::new(2.0, 0.0);
        let (dh, hh) = grid.contract(&s, &[1.0]).unwrap();
        let expected_dh = [1.0, -1.0, 1.0, -1.0];
        for o in 0..4 {
            assert_relative_eq!(dh[o], expected_dh[o], epsilon = 1e-12);
            assert_relative_eq!(hh[o], 2.0, epsilon = 1e-15);
        }
        assert!(grid.contract(&s, &[1.0, 1.0]).is_err());
    }
}
