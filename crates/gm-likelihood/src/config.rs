//! Likelihood configuration (JSON).

use std::path::Path;

use gm_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// Default number of phase-grid samples.
pub const DEFAULT_N_PHI: usize = 100;
/// Default PN phase tolerance per bin [rad].
pub const DEFAULT_PN_PHASE_TOL: f64 = 0.05;

/// How relative-binning frequency edges are chosen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "scheme", rename_all = "snake_case")]
pub enum BinningConfig {
    /// Explicit edges [Hz], snapped to the data grid.
    Edges {
        /// Bin edges [Hz].
        edges: Vec<f64>,
    },
    /// Equal steps of a post-Newtonian proxy phase.
    PnPhaseTol {
        /// Maximum proxy-phase change per bin [rad].
        pn_phase_tol: f64,
    },
}

impl Default for BinningConfig {
    fn default() -> Self {
        Self::PnPhaseTol { pn_phase_tol: DEFAULT_PN_PHASE_TOL }
    }
}

/// Distance lookup-table settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LookupTableConfig {
    /// Distance [Mpc] at which overlaps are evaluated.
    pub reference_distance: f64,
    /// Upper edge of the `d^2` distance prior [Mpc].
    pub d_luminosity_max: f64,
    /// Log-spaced nodes covering the full prior support.
    pub n_log_nodes: usize,
    /// Uniform nodes resolving the likelihood peak.
    pub n_peak_nodes: usize,
}

impl Default for LookupTableConfig {
    fn default() -> Self {
        Self {
            reference_distance: 1.0,
            d_luminosity_max: 15_000.0,
            n_log_nodes: 512,
            n_peak_nodes: 256,
        }
    }
}

impl LookupTableConfig {
    /// Check ranges.
    pub fn validate(&self) -> Result<()> {
        if !(self.reference_distance.is_finite() && self.reference_distance > 0.0) {
            return Err(Error::Configuration(format!(
                "reference_distance must be positive, got {}",
                self.reference_distance
            )));
        }
        if !(self.d_luminosity_max.is_finite() && self.d_luminosity_max > 0.0) {
            return Err(Error::Configuration(format!(
                "d_luminosity_max must be positive, got {}",
                self.d_luminosity_max
            )));
        }
        if self.n_log_nodes < 2 || self.n_peak_nodes < 2 {
            return Err(Error::Configuration(format!(
                "lookup table needs at least 2 nodes per layout, got {} and {}",
                self.n_log_nodes, self.n_peak_nodes
            )));
        }
        Ok(())
    }
}

/// Top-level likelihood configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LikelihoodConfig {
    /// Phase-grid resolution.
    pub n_phi: usize,
    /// Relative-binning edges.
    pub binning: BinningConfig,
    /// Distance marginalization.
    pub lookup_table: LookupTableConfig,
}

impl Default for LikelihoodConfig {
    fn default() -> Self {
        Self {
            n_phi: DEFAULT_N_PHI,
            binning: BinningConfig::default(),
            lookup_table: LookupTableConfig::default(),
        }
    }
}

impl LikelihoodConfig {
    /// Parse from a JSON string.
    pub fn from_json_str(s: &str) -> Result<Self> {
        let cfg: Self = serde_json::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Read from a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Check every field.
    pub fn validate(&self) -> Result<()> {
        if self.n_phi == 0 {
            return Err(Error::Configuration("n_phi must be at least 1".to_string()));
        }
        if let BinningConfig::PnPhaseTol { pn_phase_tol } = self.binning {
            if !(pn_phase_tol.is_finite() && pn_phase_tol > 0.0) {
                return Err(Error::Configuration(format!(
                    "pn_phase_tol must be positive, got {pn_phase_tol}"
                )));
            }
        }
        self.lookup_table.validate()
    }
}
