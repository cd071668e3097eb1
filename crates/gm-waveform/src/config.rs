//! Serde configuration for selecting a waveform model.

use std::sync::Arc;

use gm_core::{Result, WaveformModel};
use serde::{Deserialize, Serialize};

use crate::{HarmonicPowerLaw, TaylorF2Qdol};

fn default_f_ref() -> f64 {
    100.0
}

fn default_true() -> bool {
    true
}

/// Waveform model selection, tagged by `model`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum WaveformConfig {
    /// [`TaylorF2Qdol`].
    TaylorF2Qdol {
        /// Reference frequency [Hz].
        #[serde(default = "default_f_ref")]
        f_ref: f64,
        /// Impose the black-hole superradiance condition on the 4PN dissipation term.
        #[serde(default = "default_true")]
        fix_bh_superradiance: bool,
    },
    /// [`HarmonicPowerLaw`].
    HarmonicPowerLaw {
        /// Reference frequency [Hz].
        #[serde(default = "default_f_ref")]
        f_ref: f64,
        /// Azimuthal harmonic numbers.
        modes: Vec<i32>,
        /// Relative amplitude of each harmonic.
        relative_amplitudes: Vec<f64>,
    },
}

impl WaveformConfig {
    /// Instantiate the configured model.
    pub fn build(&self) -> Result<Arc<dyn WaveformModel>> {
        Ok(match self {
            Self::TaylorF2Qdol { f_ref, fix_bh_superradiance } => {
                Arc::new(TaylorF2Qdol::new(*f_ref, *fix_bh_superradiance)?)
            }
            Self::HarmonicPowerLaw { f_ref, modes, relative_amplitudes } => {
                Arc::new(HarmonicPowerLaw::new(*f_ref, modes.clone(), relative_amplitudes.clone())?)
            }
        })
    }
}
