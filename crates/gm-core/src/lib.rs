//! # gm-core
//!
//! Core types, traits and error handling shared by the gwmarg crates.
//!
//! Concrete waveform models, distance integrators and likelihoods live in
//! downstream crates and meet here only through the traits in [`traits`].

#![warn(missing_docs)]

pub mod error;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
pub use traits::{DistanceMarginalization, MarginalLikelihood, PolarizationStrain, WaveformModel};
pub use types::{
    D_LUMINOSITY, IntrinsicParameters, PHI_REF, ParameterSpace, SampleTable, WaveformParameters,
};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
