//! # gm-waveform
//!
//! Frequency-domain waveform models implementing [`gm_core::WaveformModel`].
//!
//! - [`TaylorF2Qdol`]: TaylorF2 inspiral with spin-induced multipoles, tidal
//!   dissipation and Love numbers (dominant harmonic only).
//! - [`HarmonicPowerLaw`]: analytic multi-harmonic model for validation.

#![warn(missing_docs)]

pub mod config;
pub mod power_law;
pub mod qdol;

pub use config::WaveformConfig;
pub use power_law::HarmonicPowerLaw;
pub use qdol::{QdolIntrinsic, TaylorF2Qdol};
