//! Run configuration: event, waveform model, reference point and likelihood
//! settings in one JSON document.

use anyhow::{Context, Result};
use gm_core::{D_LUMINOSITY, PHI_REF, ParameterSpace, WaveformParameters};
use gm_likelihood::{EventData, LikelihoodConfig, MarginalizedDistancePhaseLikelihood};
use gm_waveform::WaveformConfig;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

/// Contents of a `run.json` file.
#[derive(Debug, Clone, Deserialize)]
pub struct RunConfig {
    /// Whitened event data.
    pub event: EventData,
    /// Waveform model selection.
    pub waveform: WaveformConfig,
    /// Reference waveform for relative binning. `phi_ref` defaults to 0 and
    /// `d_luminosity` to the lookup table's reference distance.
    pub reference_parameters: BTreeMap<String, f64>,
    /// Binning, phase grid and lookup-table settings.
    #[serde(default)]
    pub likelihood: LikelihoodConfig,
}

/// Read and parse a run configuration.
pub fn read_run_config(path: &Path) -> Result<RunConfig> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("reading run config {}", path.display()))?;
    let cfg: RunConfig = serde_json::from_str(&json)
        .with_context(|| format!("parsing run config {}", path.display()))?;
    Ok(cfg)
}

impl RunConfig {
    fn reference(&self, space: &ParameterSpace) -> Result<WaveformParameters> {
        let mut intrinsic = self.reference_parameters.clone();
        let phi_ref = intrinsic.remove(PHI_REF).unwrap_or(0.0);
        let d_luminosity = intrinsic
            .remove(D_LUMINOSITY)
            .unwrap_or(self.likelihood.lookup_table.reference_distance);
        let intrinsic = space.intrinsic_from_map(&intrinsic).context("reference_parameters")?;
        Ok(space.with_extrinsic(&intrinsic, phi_ref, d_luminosity))
    }

    /// Build the marginalized likelihood.
    pub fn build(self) -> Result<MarginalizedDistancePhaseLikelihood> {
        let model = self.waveform.build()?;
        let space = ParameterSpace::new(model.params())?;
        let reference = self.reference(&space)?;
        tracing::info!(
            model = model.name(),
            event = %self.event.eventname,
            detectors = self.event.n_detectors(),
            n_phi = self.likelihood.n_phi,
            "building likelihood"
        );
        let like =
            MarginalizedDistancePhaseLikelihood::from_config(self.event, model, reference, &self.likelihood)?;
        tracing::info!(
            bins = like.base().relative_binning().bins().n_bins(),
            "likelihood ready"
        );
        Ok(like)
    }
}
