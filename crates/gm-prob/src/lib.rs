//! Numerical building blocks for gwmarg.
//!
//! - stable log/exp primitives (log-sum-exp, sigmoid)
//! - piecewise-linear interpolation and inverse-CDF sampling
//! - finite differences on non-uniform grids

pub mod finite_diff;
pub mod interp;
pub mod math;

pub use interp::{interp, inverse_cdf};
pub use math::{ln_exprel, log_mean_exp, logsumexp, relative_weights, sigmoid};
