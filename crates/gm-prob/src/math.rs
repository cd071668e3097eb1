//! Small numerically-stable math utilities used across the likelihood code.

use gm_core::{Error, Result};

/// Stable sigmoid: `1 / (1 + exp(-x))`.
///
/// Branchless core: single `exp(-|x|)`, then `cmov` for the sign flip.
#[inline]
pub fn sigmoid(x: f64) -> f64 {
    let abs_x = x.abs();
    let e = (-abs_x).exp();
    let recip = 1.0 / (1.0 + e);
    // x >= 0: sigmoid = 1/(1+exp(-x)) = recip
    // x <  0: sigmoid = exp(x)/(1+exp(x)) = e/(1+e) = e*recip
    if x >= 0.0 { recip } else { e * recip }
}

/// Stable `log(sum(exp(xs)))` by max subtraction.
///
/// Returns `-inf` for an empty slice or when every entry is `-inf`, `+inf` if
/// any entry is `+inf`, and `NaN` if any entry is `NaN`.
pub fn logsumexp(xs: &[f64]) -> f64 {
    if xs.iter().any(|x| x.is_nan()) {
        return f64::NAN;
    }
    let max = xs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !max.is_finite() {
        return max;
    }
    let sum: f64 = xs.iter().map(|&x| (x - max).exp()).sum();
    max + sum.ln()
}

/// `logsumexp(xs) - ln(len)`: the log of the arithmetic mean of `exp(xs)`.
pub fn log_mean_exp(xs: &[f64]) -> f64 {
    if xs.is_empty() {
        return f64::NEG_INFINITY;
    }
    logsumexp(xs) - (xs.len() as f64).ln()
}

/// `ln((exp(x) - 1) / x)`, the log of the mean of `exp` over `[0, x]`.
///
/// Finite for every finite `x`; tends to `x` for large positive `x` and to
/// `-ln(-x)` for large negative `x`.
pub fn ln_exprel(x: f64) -> f64 {
    if x.abs() < 1e-6 {
        x * (0.5 + x / 24.0)
    } else if x > 0.0 {
        x + (-(-x).exp_m1()).ln() - x.ln()
    } else {
        (-x.exp_m1()).ln() - (-x).ln()
    }
}

/// Un-normalized weights `exp(x - max(x))`, all in `[0, 1]`.
///
/// Fails with [`Error::DegenerateLikelihood`] when every entry is `-inf`
/// (there is no mass to normalize) and with [`Error::Computation`] on `NaN`
/// or `+inf` entries.
pub fn relative_weights(log_w: &[f64]) -> Result<Vec<f64>> {
    if log_w.iter().any(|x| x.is_nan()) {
        return Err(Error::Computation("NaN in log-weights".to_string()));
    }
    let max = log_w.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if max == f64::INFINITY {
        return Err(Error::Computation("+inf in log-weights".to_string()));
    }
    if max == f64::NEG_INFINITY {
        return Err(Error::DegenerateLikelihood(format!(
            "all {} log-weights are -inf",
            log_w.len()
        )));
    }
    Ok(log_w.iter().map(|&x| (x - max).exp()).collect())
}
