//! Core traits for gwmarg
//!
//! The marginalization layer talks to its collaborators (waveform model,
//! distance integrator) only through these traits, so concrete models and
//! tables can be swapped without touching the likelihood code.

use std::collections::BTreeMap;

use num_complex::Complex64;
use rand::RngCore;

use crate::Result;
use crate::types::WaveformParameters;

/// Plus and cross polarizations of one harmonic, sampled on a frequency array.
pub type PolarizationStrain = [Vec<Complex64>; 2];

/// Frequency-domain waveform model, resolved by azimuthal harmonic.
pub trait WaveformModel: Send + Sync {
    /// Model name (e.g. "TaylorF2Qdol")
    fn name(&self) -> &str;

    /// Ordered, distinct azimuthal harmonic numbers `m` produced by the model.
    fn harmonic_modes(&self) -> &[i32];

    /// Names of every parameter the model reads, including `phi_ref` and
    /// `d_luminosity`.
    fn params(&self) -> &[&'static str];

    /// Reference frequency [Hz] at which `phi_ref` is defined.
    fn f_ref(&self) -> f64;

    /// Plus/cross strain for every harmonic (in `harmonic_modes` order).
    ///
    /// Harmonic `m` must scale as `exp(i m phi_ref)` and the whole strain as
    /// `1 / d_luminosity`; the marginalization layer relies on both.
    fn hplus_hcross_by_mode(
        &self,
        frequencies: &[f64],
        par: &WaveformParameters,
    ) -> Result<Vec<PolarizationStrain>>;
}

/// Distance-marginalization integrator (lookup table).
///
/// All overlaps passed in must be evaluated at [`reference_distance`](Self::reference_distance).
pub trait DistanceMarginalization: Send + Sync {
    /// Distance [Mpc] at which `d_h` and `h_h` are expected.
    fn reference_distance(&self) -> f64;

    /// `ln ∫ p(d) L(d) dd` for each `(d_h[i], h_h[i])` pair.
    fn lnlike_marginalized(&self, d_h: &[f64], h_h: &[f64]) -> Result<Vec<f64>>;

    /// Draw a luminosity distance [Mpc] from the conditional posterior.
    fn sample_distance(&self, d_h: f64, h_h: f64, rng: &mut dyn RngCore) -> Result<f64>;
}

/// Sampler-facing marginal likelihood.
pub trait MarginalLikelihood: Send + Sync {
    /// Parameter names expected by [`lnlike_map`](Self::lnlike_map) (sorted).
    fn params(&self) -> &[String];

    /// Log-likelihood for a parameter mapping.
    fn lnlike_map(&self, par: &BTreeMap<String, f64>) -> Result<f64>;
}
