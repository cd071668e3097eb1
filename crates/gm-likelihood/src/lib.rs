//! # gm-likelihood
//!
//! Gravitational-wave likelihood marginalized over luminosity distance and
//! reference phase.
//!
//! ## Pipeline
//!
//! 1. [`RelativeBinningLikelihood`] compresses the data into summary weights
//!    around a reference waveform and evaluates complex `<d|h>` / `<h|h>`
//!    summaries from a handful of waveform samples.
//! 2. [`MarginalizationGrid`] rotates those summaries onto a uniform phase
//!    grid, one phasor per harmonic (pair).
//! 3. [`LookupTable`] integrates each phase over distance.
//! 4. [`MarginalizedDistancePhaseLikelihood`] averages over phase and, after
//!    sampling, redraws `phi_ref` and `d_luminosity` per posterior sample.

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Likelihood configuration.
pub mod config;
/// Exact overlaps on the full frequency grid.
pub mod direct;
/// Distance-marginalized likelihood at fixed phase.
pub mod distance_marginal;
/// Event data container.
pub mod event_data;
/// Relative-binning frequency edges.
pub mod fbin;
/// Distance lookup table.
pub mod lookup_table;
/// Phase grid and phasors.
pub mod phase_grid;
/// Distance- and phase-marginalized likelihood.
pub mod phase_marginal;
/// Relative-binning summaries.
pub mod relative_binning;
/// Posterior resampling of phase and distance.
pub mod resample;

pub use config::{BinningConfig, LikelihoodConfig, LookupTableConfig};
pub use distance_marginal::MarginalizedDistanceLikelihood;
pub use event_data::{Detector, EventData};
pub use fbin::FrequencyBins;
pub use lookup_table::LookupTable;
pub use phase_grid::{MarginalizationGrid, harmonic_pairs};
pub use phase_marginal::MarginalizedDistancePhaseLikelihood;
pub use relative_binning::{RelativeBinningLikelihood, SummaryArrays};
pub use resample::{PostprocessOptions, PostprocessReport, SampleFailure, sample_phase_from_grid};
