//! Finite differences on non-uniform grids.

use gm_core::{Error, Result};

/// Derivative `dy/dx` with NumPy `gradient` semantics on a non-uniform grid:
/// second-order central differences inside, first-order one-sided at the ends.
pub fn gradient(y: &[f64], x: &[f64]) -> Result<Vec<f64>> {
    let n = y.len();
    if n != x.len() {
        return Err(Error::Validation(format!("gradient: {} values at {} points", n, x.len())));
    }
    if n < 2 {
        return Err(Error::Validation("gradient needs at least two points".to_string()));
    }
    let mut g = vec![0.0; n];
    g[0] = (y[1] - y[0]) / (x[1] - x[0]);
    g[n - 1] = (y[n - 1] - y[n - 2]) / (x[n - 1] - x[n - 2]);
    for i in 1..n - 1 {
        let hd = x[i] - x[i - 1];
        let hs = x[i + 1] - x[i];
        g[i] = (hd * hd * y[i + 1] - hs * hs * y[i - 1] + (hs * hs - hd * hd) * y[i])
            / (hs * hd * (hd + hs));
    }
    Ok(g)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_gradient_exact_for_quadratic_inside() {
        let x = [0.0, 0.5, 1.5, 1.75, 3.0];
        let y: Vec<f64> = x.iter().map(|&v| v * v).collect();
        let g = gradient(&y, &x).unwrap();
        for i in 1..x.len() - 1 {
            assert_relative_eq!(g[i], 2.0 * x[i], epsilon = 1e-12);
        }
        // One-sided ends are first order.
        assert_relative_eq!(g[0], 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_gradient_rejects_short_input() {
        assert!(gradient(&[1.0], &[0.0]).is_err());
        assert!(gradient(&[1.0, 2.0], &[0.0]).is_err());
    }
}
