//! Distance-marginalized likelihood at a fixed phase.

use std::sync::Arc;

use gm_core::{DistanceMarginalization, Error, IntrinsicParameters, Result};
use rand::RngCore;

use crate::relative_binning::{RelativeBinningLikelihood, SummaryArrays};

/// Relative-binning likelihood with distance integrated out by a lookup table.
///
/// Overlaps are always computed at the table's reference distance.
pub struct MarginalizedDistanceLikelihood {
    rb: RelativeBinningLikelihood,
    lookup_table: Arc<dyn DistanceMarginalization>,
}

impl std::fmt::Debug for MarginalizedDistanceLikelihood {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarginalizedDistanceLikelihood")
            .field("rb", &self.rb)
            .field("reference_distance", &self.lookup_table.reference_distance())
            .finish()
    }
}

impl MarginalizedDistanceLikelihood {
    /// Combine a relative-binning likelihood with a distance integrator.
    pub fn new(
        rb: RelativeBinningLikelihood,
        lookup_table: Arc<dyn DistanceMarginalization>,
    ) -> Result<Self> {
        let d_ref = lookup_table.reference_distance();
        if !(d_ref.is_finite() && d_ref > 0.0) {
            return Err(Error::Configuration(format!(
                "lookup table reference distance must be positive, got {d_ref}"
            )));
        }
        Ok(Self { rb, lookup_table })
    }

    /// Underlying relative-binning likelihood.
    pub fn relative_binning(&self) -> &RelativeBinningLikelihood {
        &self.rb
    }

    /// Distance integrator.
    pub fn lookup_table(&self) -> &Arc<dyn DistanceMarginalization> {
        &self.lookup_table
    }

    /// Distance [Mpc] at which every overlap is evaluated.
    pub fn reference_distance(&self) -> f64 {
        self.lookup_table.reference_distance()
    }

    /// Complex summaries at `phi_ref` and the reference distance.
    pub fn summaries_at(
        &self,
        intrinsic: &IntrinsicParameters,
        phi_ref: f64,
    ) -> Result<SummaryArrays> {
        let par = self.rb.space().with_extrinsic(intrinsic, phi_ref, self.reference_distance());
        self.rb.dh_hh_complex_no_asd_drift(&par)
    }

    /// Noise-weighted scalar overlaps `(<d|h>, <h|h>)` at `phi_ref` and the
    /// reference distance.
    pub fn overlaps(&self, intrinsic: &IntrinsicParameters, phi_ref: f64) -> Result<(f64, f64)> {
        let (dh, hh) = self.summaries_at(intrinsic, phi_ref)?.per_detector();
        let weights = self.rb.asd_drift_weights();
        let d_h: f64 = dh.iter().zip(&weights).map(|(x, w)| x * w).sum();
        let h_h: f64 = hh.iter().zip(&weights).map(|(x, w)| x * w).sum();
        Ok((d_h, h_h))
    }

    /// Distance-marginalized log-likelihood at `phi_ref`.
    pub fn lnlike(&self, intrinsic: &IntrinsicParameters, phi_ref: f64) -> Result<f64> {
        let (d_h, h_h) = self.overlaps(intrinsic, phi_ref)?;
        let lnl = self.lookup_table.lnlike_marginalized(&[d_h], &[h_h])?;
        Ok(lnl[0])
    }

    /// Log-likelihood at an explicit `phi_ref` and `d_luminosity`.
    pub fn lnlike_no_marginalization(
        &self,
        intrinsic: &IntrinsicParameters,
        phi_ref: f64,
        d_luminosity: f64,
    ) -> Result<f64> {
        let par = self.rb.space().with_extrinsic(intrinsic, phi_ref, d_luminosity);
        self.rb.lnlike_no_marginalization(&par)
    }

    /// Draw `d_luminosity` from its conditional posterior at `phi_ref`.
    pub fn sample_distance(
        &self,
        intrinsic: &IntrinsicParameters,
        phi_ref: f64,
        rng: &mut dyn RngCore,
    ) -> Result<f64> {
        let (d_h, h_h) = self.overlaps(intrinsic, phi_ref)?;
        self.lookup_table.sample_distance(d_h, h_h, rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LookupTableConfig;
    use crate::event_data::tests::flat_event;
    use crate::fbin::FrequencyBins;
    use crate::lookup_table::LookupTable;
    use crate::relative_binning::tests::{power_law, power_law_par};
    use approx::assert_relative_eq;

    struct BadTable;

    impl DistanceMarginalization for BadTable {
        fn reference_distance(&self) -> f64 {
            0.0
        }

        fn lnlike_marginalized(&self, d_h: &[f64], _h_h: &[f64]) -> Result<Vec<f64>> {
            Ok(vec![0.0; d_h.len()])
        }

        fn sample_distance(&self, _d_h: f64, _h_h: f64, _rng: &mut dyn RngCore) -> Result<f64> {
            Ok(1.0)
        }
    }

    fn rb() -> RelativeBinningLikelihood {
        let model = power_law();
        let mut event = flat_event();
        event.inject_signal(model.as_ref(), &power_law_par(model.as_ref(), 0.05, 0.0, 0.2, 1.0)).unwrap();
        let reference = power_law_par(model.as_ref(), 0.05, 0.0, 0.0, 1.0);
        let bins = FrequencyBins::from_edges(&event, &[20.0, 50.0, 100.0, 200.0]).unwrap();
        RelativeBinningLikelihood::new(event, model, reference, bins).unwrap()
    }

    #[test]
    fn test_reference_distance_guarded() {
        let err = MarginalizedDistanceLikelihood::new(rb(), Arc::new(BadTable)).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_overlaps_scale_with_distance() {
        let table = LookupTable::new(&LookupTableConfig::default()).unwrap();
        let like = MarginalizedDistanceLikelihood::new(rb(), Arc::new(table)).unwrap();
        let space = like.relative_binning().space().clone();
        let intrinsic = space.intrinsic_from_values(vec![0.05, 0.4, 0.0]).unwrap();
        let (d_h, h_h) = like.overlaps(&intrinsic, 0.2).unwrap();

        // ln L(d) = d_h (d_ref/d) - h_h (d_ref/d)^2 / 2
        let d = 3.0;
        let expected = d_h / d - 0.5 * h_h / (d * d);
        let lnl = like.lnlike_no_marginalization(&intrinsic, 0.2, d).unwrap();
        assert_relative_eq!(lnl, expected, max_relative = 1e-10);
    }
}
