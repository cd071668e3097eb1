//! Posterior resampling of the marginalized `phi_ref` and `d_luminosity`.
//!
//! For every posterior sample of the intrinsic parameters, `phi_ref` is drawn
//! from the per-phase likelihood on the marginalization grid and
//! `d_luminosity` from the lookup table at that phase. Each sample owns an
//! RNG stream seeded with `seed + index`, so results do not depend on
//! scheduling.

use std::f64::consts::TAU;

use gm_core::{D_LUMINOSITY, Error, IntrinsicParameters, PHI_REF, Result, SampleTable};
use gm_prob::{inverse_cdf, relative_weights};
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::phase_marginal::MarginalizedDistancePhaseLikelihood;

/// Options for [`MarginalizedDistancePhaseLikelihood::postprocess_samples`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostprocessOptions {
    /// Replace existing finite `d_luminosity` values. When `false`, only rows
    /// without a finite distance receive the draw.
    pub overwrite_distance: bool,
    /// Base seed; drawn from the thread RNG when `None`.
    pub seed: Option<u64>,
    /// Distribute samples over the rayon pool.
    pub parallel: bool,
}

impl Default for PostprocessOptions {
    fn default() -> Self {
        Self { overwrite_distance: true, seed: None, parallel: true }
    }
}

/// A sample whose extrinsic draw failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleFailure {
    /// Row index in the input table.
    pub index: usize,
    /// Error message.
    pub message: String,
}

/// Augmented samples and per-row failures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostprocessReport {
    /// Input table with `phi_ref` and `d_luminosity` columns (`NaN` on failed rows).
    pub samples: SampleTable,
    /// Rows that could not be resampled.
    pub failures: Vec<SampleFailure>,
}

/// Draw a phase from per-phase log-likelihoods on a uniform grid.
///
/// Grid point `o` carries the mass of the cell `[phi_o - Δ/2, phi_o + Δ/2)`;
/// the piecewise-linear CDF over the cell edges is inverted at `uniform` and
/// the result wrapped into `[0, 2π)`. Interpolating the cumulative weights
/// against the grid points themselves would instead put a point mass at
/// `phi = 0` and shift every draw by half a cell.
pub fn sample_phase_from_grid(phi: &[f64], lnl: &[f64], uniform: f64) -> Result<f64> {
    if phi.is_empty() || phi.len() != lnl.len() {
        return Err(Error::Validation(format!(
            "{} phases but {} log-likelihoods",
            phi.len(),
            lnl.len()
        )));
    }
    let weights = relative_weights(lnl)?;
    let n = phi.len();
    let delta = TAU / n as f64;
    let edges: Vec<f64> = (0..=n).map(|k| phi[0] - 0.5 * delta + delta * k as f64).collect();
    let mut cdf = Vec::with_capacity(n + 1);
    cdf.push(0.0);
    let mut acc = 0.0;
    for w in &weights {
        acc += w;
        cdf.push(acc);
    }
    Ok(inverse_cdf(uniform, &edges, &cdf)?.rem_euclid(TAU))
}

impl MarginalizedDistancePhaseLikelihood {
    /// Draw `phi_ref` from its conditional posterior.
    pub fn sample_phase(&self, intrinsic: &IntrinsicParameters, rng: &mut dyn RngCore) -> Result<f64> {
        let lnl = self.lnlike_dist_marg_on_phi_grid(intrinsic)?;
        sample_phase_from_grid(self.grid().phi(), &lnl, rng.random::<f64>())
    }

    /// Draw `d_luminosity` from its conditional posterior at `phi_ref`.
    pub fn sample_distance(
        &self,
        intrinsic: &IntrinsicParameters,
        phi_ref: f64,
        rng: &mut dyn RngCore,
    ) -> Result<f64> {
        self.base().sample_distance(intrinsic, phi_ref, rng)
    }

    /// Draw `(phi_ref, d_luminosity)` for one sample.
    pub fn sample_extrinsic(
        &self,
        intrinsic: &IntrinsicParameters,
        rng: &mut dyn RngCore,
    ) -> Result<(f64, f64)> {
        let phi_ref = self.sample_phase(intrinsic, rng)?;
        let d_luminosity = self.sample_distance(intrinsic, phi_ref, rng)?;
        Ok((phi_ref, d_luminosity))
    }

    /// Add `phi_ref` and `d_luminosity` columns to a table of posterior
    /// samples.
    ///
    /// Every intrinsic parameter must be a column; that is checked before any
    /// sample is evaluated. Rows that fail get `NaN` in both new columns and
    /// are listed in the report. `phi_ref` is always (re)drawn; with
    /// `overwrite_distance == false` rows that already hold a finite
    /// `d_luminosity` keep it.
    pub fn postprocess_samples(
        &self,
        samples: &SampleTable,
        options: &PostprocessOptions,
    ) -> Result<PostprocessReport> {
        samples.validate()?;
        let existing_distance =
            if options.overwrite_distance { None } else { samples.column(D_LUMINOSITY) };

        let space = self.base().relative_binning().space();
        let columns = space
            .intrinsic_names()
            .iter()
            .map(|name| {
                samples.column_index(name).ok_or_else(|| Error::MissingParameter(name.clone()))
            })
            .collect::<Result<Vec<usize>>>()?;

        let base_seed = options.seed.unwrap_or_else(|| rand::rng().random());
        let draw = |i: usize| -> Result<(f64, f64)> {
            let row = &samples.rows[i];
            let intrinsic = space.intrinsic_from_values(columns.iter().map(|&j| row[j]).collect())?;
            let mut rng = StdRng::seed_from_u64(base_seed.wrapping_add(i as u64));
            self.sample_extrinsic(&intrinsic, &mut rng)
        };

        let n = samples.n_rows();
        let draws: Vec<Result<(f64, f64)>> = if options.parallel {
            (0..n).into_par_iter().map(draw).collect()
        } else {
            (0..n).map(draw).collect()
        };

        let mut phi = Vec::with_capacity(n);
        let mut distance = Vec::with_capacity(n);
        let mut failures = Vec::new();
        for (index, result) in draws.into_iter().enumerate() {
            match result {
                Ok((p, d)) => {
                    phi.push(p);
                    distance.push(d);
                }
                Err(e) => {
                    log::warn!("sample {index}: {e}");
                    failures.push(SampleFailure { index, message: e.to_string() });
                    phi.push(f64::NAN);
                    distance.push(f64::NAN);
                }
            }
        }
        log::info!(
            "resampled {} of {n} samples (seed {base_seed})",
            n - failures.len()
        );

        if let Some(existing) = existing_distance {
            let kept = existing.iter().filter(|d| d.is_finite()).count();
            log::info!("keeping {kept} existing {D_LUMINOSITY} values");
            for (d, old) in distance.iter_mut().zip(existing) {
                if old.is_finite() {
                    *d = old;
                }
            }
        }

        let mut out = samples.clone();
        out.set_column(PHI_REF, phi)?;
        out.set_column(D_LUMINOSITY, distance)?;
        Ok(PostprocessReport { samples: out, failures })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_uniform_likelihood_gives_uniform_phase() {
        let phi: Vec<f64> = (0..4).map(|o| TAU * o as f64 / 4.0).collect();
        let lnl = [0.0; 4];
        // Cells start at -π/4; u = 0.2 lands at 0.15π.
        assert_relative_eq!(
            sample_phase_from_grid(&phi, &lnl, 0.2).unwrap(),
            0.15 * TAU / 2.0,
            epsilon = 1e-12
        );
        assert_relative_eq!(
            sample_phase_from_grid(&phi, &lnl, 0.625).unwrap(),
            TAU / 2.0,
            epsilon = 1e-12
        );
        // The first half cell wraps to the end of the turn.
        assert_relative_eq!(
            sample_phase_from_grid(&phi, &lnl, 0.0).unwrap(),
            TAU - TAU / 8.0,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_single_hot_cell() {
        let phi: Vec<f64> = (0..8).map(|o| TAU * o as f64 / 8.0).collect();
        let mut lnl = vec![f64::NEG_INFINITY; 8];
        lnl[3] = -5.0;
        for u in [0.0, 0.3, 0.999] {
            let p = sample_phase_from_grid(&phi, &lnl, u).unwrap();
            assert!((p - phi[3]).abs() <= TAU / 16.0 + 1e-12, "phase {p}");
        }
    }

    #[test]
    fn test_degenerate_grid_reported() {
        let phi = [0.0, TAU / 2.0];
        let err = sample_phase_from_grid(&phi, &[f64::NEG_INFINITY; 2], 0.5).unwrap_err();
        assert!(matches!(err, Error::DegenerateLikelihood(_)));
        assert!(matches!(sample_phase_from_grid(&phi, &[0.0], 0.5), Err(Error::Validation(_))));
    }
}
