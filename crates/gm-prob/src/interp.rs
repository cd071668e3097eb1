//! Piecewise-linear interpolation and inverse-CDF sampling.

use gm_core::{Error, Result};

/// One-dimensional linear interpolation with NumPy `interp` semantics.
///
/// `xp` must be non-decreasing. Values outside `[xp[0], xp[n-1]]` are clamped
/// to the end values of `fp`. On flat runs of `xp` the right-most segment
/// that brackets `x` is used, so ties never divide by zero.
pub fn interp(x: f64, xp: &[f64], fp: &[f64]) -> f64 {
    debug_assert_eq!(xp.len(), fp.len());
    let n = xp.len();
    if n == 0 {
        return f64::NAN;
    }
    if x <= xp[0] {
        return fp[0];
    }
    if x >= xp[n - 1] {
        return fp[n - 1];
    }
    // First index with xp[idx] > x; xp[idx - 1] <= x < xp[idx].
    let idx = xp.partition_point(|&v| v <= x);
    let (x0, x1) = (xp[idx - 1], xp[idx]);
    let t = (x - x0) / (x1 - x0);
    fp[idx - 1] + t * (fp[idx] - fp[idx - 1])
}

/// Invert a tabulated, non-decreasing CDF at `u ∈ [0, 1]`.
///
/// `cdf[k]` is the (possibly un-normalized) cumulative mass at `x[k]`, with
/// `cdf[0] == 0`. The inverse is left-continuous: the target mass `u * total`
/// falls in the first segment whose upper value reaches it, so runs of zero
/// mass at either end are never returned.
pub fn inverse_cdf(u: f64, x: &[f64], cdf: &[f64]) -> Result<f64> {
    if x.len() != cdf.len() || x.len() < 2 {
        return Err(Error::Validation(format!(
            "inverse_cdf needs matching tables of length >= 2, got {} and {}",
            x.len(),
            cdf.len()
        )));
    }
    let total = cdf[cdf.len() - 1];
    if !(total.is_finite() && total > 0.0) {
        return Err(Error::DegenerateLikelihood(format!("cumulative mass is {total}")));
    }
    if !(0.0..=1.0).contains(&u) {
        return Err(Error::Validation(format!("u must lie in [0, 1], got {u}")));
    }
    let target = u * total;
    if target <= cdf[0] {
        // Start of the first segment carrying mass.
        let k = cdf.partition_point(|&c| c <= cdf[0]);
        return Ok(x[k - 1]);
    }
    let k = cdf.partition_point(|&c| c < target).min(cdf.len() - 1);
    let t = (target - cdf[k - 1]) / (cdf[k] - cdf[k - 1]);
    Ok(x[k - 1] + t * (x[k] - x[k - 1]))
}
