//! Distance- and phase-marginalized likelihood.
//!
//! Harmonic `m` of the waveform scales as `exp(i m phi_ref)`, so the
//! summaries computed once at `phi_ref = 0` are rotated onto every point of a
//! uniform phase grid by the phasors of [`MarginalizationGrid`]. Each phase is
//! marginalized over distance by the lookup table, and the phase integral is
//! the mean of the per-phase likelihoods.

use std::collections::BTreeMap;
use std::sync::Arc;

use gm_core::{
    Error, IntrinsicParameters, MarginalLikelihood, Result, WaveformModel, WaveformParameters,
};
use gm_prob::log_mean_exp;

use crate::config::{BinningConfig, LikelihoodConfig};
use crate::distance_marginal::MarginalizedDistanceLikelihood;
use crate::event_data::EventData;
use crate::fbin::FrequencyBins;
use crate::lookup_table::LookupTable;
use crate::phase_grid::MarginalizationGrid;
use crate::relative_binning::RelativeBinningLikelihood;

/// Likelihood marginalized over `d_luminosity` and `phi_ref`.
#[derive(Debug)]
pub struct MarginalizedDistancePhaseLikelihood {
    base: MarginalizedDistanceLikelihood,
    grid: MarginalizationGrid,
}

impl MarginalizedDistancePhaseLikelihood {
    /// Wrap `base` with a fresh `n_phi`-point grid.
    pub fn new(base: MarginalizedDistanceLikelihood, n_phi: usize) -> Result<Self> {
        let grid = MarginalizationGrid::new(
            base.relative_binning().model().harmonic_modes(),
            n_phi,
        )?;
        Self::with_grid(base, grid)
    }

    /// Wrap `base` with an existing grid.
    ///
    /// The grid must describe exactly the model's harmonics, in order, with
    /// the same pair index as the relative-binning summaries.
    pub fn with_grid(base: MarginalizedDistanceLikelihood, grid: MarginalizationGrid) -> Result<Self> {
        let rb = base.relative_binning();
        let modes = rb.model().harmonic_modes();
        if grid.harmonics() != modes {
            return Err(Error::Configuration(format!(
                "grid harmonics {:?} do not match model harmonics {:?}",
                grid.harmonics(),
                modes
            )));
        }
        if grid.harmonic_pairs() != rb.harmonic_pairs() {
            return Err(Error::Configuration(
                "grid pair index differs from the relative-binning pair index".to_string(),
            ));
        }
        grid.validate()?;
        log::debug!(
            "phase marginalization: {} harmonics {:?}, n_phi = {}",
            modes.len(),
            modes,
            grid.n_phi()
        );
        Ok(Self { base, grid })
    }

    /// Build the full stack (bins, relative binning, lookup table, grid)
    /// from configuration.
    pub fn from_config(
        event: EventData,
        model: Arc<dyn WaveformModel>,
        reference: WaveformParameters,
        config: &LikelihoodConfig,
    ) -> Result<Self> {
        config.validate()?;
        let bins = match &config.binning {
            BinningConfig::Edges { edges } => FrequencyBins::from_edges(&event, edges)?,
            BinningConfig::PnPhaseTol { pn_phase_tol } => FrequencyBins::from_pn_phase_tol(
                &event,
                *pn_phase_tol,
                model.harmonic_modes().len(),
            )?,
        };
        let rb = RelativeBinningLikelihood::new(event, model, reference, bins)?;
        let table = LookupTable::new(&config.lookup_table)?;
        let base = MarginalizedDistanceLikelihood::new(rb, Arc::new(table))?;
        Self::new(base, config.n_phi)
    }

    /// Distance-only likelihood this wraps.
    pub fn base(&self) -> &MarginalizedDistanceLikelihood {
        &self.base
    }

    /// Phase grid.
    pub fn grid(&self) -> &MarginalizationGrid {
        &self.grid
    }

    /// Validate a sampler mapping into intrinsic parameters.
    pub fn intrinsic(&self, par: &BTreeMap<String, f64>) -> Result<IntrinsicParameters> {
        self.base.relative_binning().space().intrinsic_from_map(par)
    }

    fn dh_hh_on(
        &self,
        intrinsic: &IntrinsicParameters,
        grid: &MarginalizationGrid,
    ) -> Result<(Vec<f64>, Vec<f64>)> {
        let summary = self.base.summaries_at(intrinsic, 0.0)?;
        grid.contract(&summary, &self.base.relative_binning().asd_drift_weights())
    }

    fn lnlike_on(&self, intrinsic: &IntrinsicParameters, grid: &MarginalizationGrid) -> Result<Vec<f64>> {
        let (dh, hh) = self.dh_hh_on(intrinsic, grid)?;
        self.base.lookup_table().lnlike_marginalized(&dh, &hh)
    }

    /// Noise-weighted `(<d|h>_o, <h|h>_o)` at every grid phase and the
    /// reference distance.
    pub fn dh_hh_on_phi_grid(&self, intrinsic: &IntrinsicParameters) -> Result<(Vec<f64>, Vec<f64>)> {
        self.dh_hh_on(intrinsic, &self.grid)
    }

    /// Distance-marginalized log-likelihood at every grid phase.
    pub fn lnlike_dist_marg_on_phi_grid(&self, intrinsic: &IntrinsicParameters) -> Result<Vec<f64>> {
        self.lnlike_on(intrinsic, &self.grid)
    }

    /// As [`lnlike_dist_marg_on_phi_grid`](Self::lnlike_dist_marg_on_phi_grid)
    /// on the grid rotated by `phi0`.
    pub fn lnlike_dist_marg_on_phi_grid_from(
        &self,
        intrinsic: &IntrinsicParameters,
        phi0: f64,
    ) -> Result<Vec<f64>> {
        self.lnlike_on(intrinsic, &self.grid.rotated(phi0)?)
    }

    /// Phase- and distance-marginalized log-likelihood.
    ///
    /// `-inf` when the likelihood vanishes on the whole grid.
    pub fn lnlike(&self, intrinsic: &IntrinsicParameters) -> Result<f64> {
        Ok(log_mean_exp(&self.lnlike_dist_marg_on_phi_grid(intrinsic)?))
    }

    /// Distance-marginalized log-likelihood at an explicit `phi_ref`.
    pub fn lnlike_no_phase_marginalization(
        &self,
        intrinsic: &IntrinsicParameters,
        phi_ref: f64,
    ) -> Result<f64> {
        self.base.lnlike(intrinsic, phi_ref)
    }

    /// Log-likelihood at explicit `phi_ref` and `d_luminosity`.
    pub fn lnlike_no_marginalization(
        &self,
        intrinsic: &IntrinsicParameters,
        phi_ref: f64,
        d_luminosity: f64,
    ) -> Result<f64> {
        self.base.lnlike_no_marginalization(intrinsic, phi_ref, d_luminosity)
    }
}

impl MarginalLikelihood for MarginalizedDistancePhaseLikelihood {
    fn params(&self) -> &[String] {
        self.base.relative_binning().space().intrinsic_names()
    }

    fn lnlike_map(&self, par: &BTreeMap<String, f64>) -> Result<f64> {
        let intrinsic = self.intrinsic(par)?;
        self.lnlike(&intrinsic)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_data::tests::flat_event;
    use crate::relative_binning::tests::{power_law, power_law_par};
    use approx::assert_relative_eq;

    fn likelihood(n_phi: usize) -> MarginalizedDistancePhaseLikelihood {
        let model = power_law();
        let mut event = flat_event();
        event
            .inject_signal(model.as_ref(), &power_law_par(model.as_ref(), 0.02, 0.001, 1.0, 1.0))
            .unwrap();
        let reference = power_law_par(model.as_ref(), 0.02, 0.001, 0.0, 1.0);
        let config = LikelihoodConfig { n_phi, ..LikelihoodConfig::default() };
        MarginalizedDistancePhaseLikelihood::from_config(event, model, reference, &config).unwrap()
    }

    fn map(amplitude: f64, iota: f64, tc: f64) -> BTreeMap<String, f64> {
        [("amplitude", amplitude), ("iota", iota), ("tc", tc)]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect()
    }

    #[test]
    fn test_params_exclude_marginalized() {
        let like = likelihood(8);
        assert_eq!(like.params(), &["amplitude", "iota", "tc"]);
    }

    #[test]
    fn test_lnlike_bounded_by_grid_values() {
        let like = likelihood(32);
        let intrinsic = like.intrinsic(&map(0.02, 0.4, 0.001)).unwrap();
        let grid = like.lnlike_dist_marg_on_phi_grid(&intrinsic).unwrap();
        let lnl = like.lnlike(&intrinsic).unwrap();
        let ln_n = (grid.len() as f64).ln();
        let max = grid.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        assert!(grid.iter().all(|&x| lnl >= x - ln_n - 1e-12));
        assert!(lnl <= max + 1e-12);
    }

    #[test]
    fn test_grid_points_match_fixed_phase() {
        let like = likelihood(16);
        let intrinsic = like.intrinsic(&map(0.02, 0.4, 0.001)).unwrap();
        let grid = like.lnlike_dist_marg_on_phi_grid(&intrinsic).unwrap();
        for (o, &phi) in like.grid().phi().iter().enumerate() {
            let fixed = like.lnlike_no_phase_marginalization(&intrinsic, phi).unwrap();
            assert_relative_eq!(grid[o], fixed, epsilon = 1e-9, max_relative = 1e-9);
        }
    }

    #[test]
    fn test_lnlike_map_rejects_bad_keys() {
        let like = likelihood(4);
        let mut par = map(0.02, 0.4, 0.001);
        par.remove("iota");
        assert!(matches!(like.lnlike_map(&par), Err(Error::MissingParameter(name)) if name == "iota"));
        let mut par = map(0.02, 0.4, 0.001);
        par.insert("phi_ref".to_string(), 0.0);
        assert!(matches!(like.lnlike_map(&par), Err(Error::UnknownParameter(_))));
    }

    #[test]
    fn test_grid_harmonics_must_match_model() {
        let like = likelihood(4);
        let MarginalizedDistancePhaseLikelihood { base, .. } = like;
        let grid = MarginalizationGrid::new(&[2], 4).unwrap();
        let err = MarginalizedDistancePhaseLikelihood::with_grid(base, grid).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }
}
