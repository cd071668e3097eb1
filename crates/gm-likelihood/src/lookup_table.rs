//! Distance marginalization by adaptive quadrature.
//!
//! With overlaps `dh`, `hh` evaluated at a reference distance `d_ref`, the
//! likelihood at distance `d` is `exp(dh u - hh u^2 / 2)` with `u = d_ref / d`.
//! Under a `d^2` prior on `(0, d_max]` the density of `u` is
//! `p(u) = 3 d_ref^3 / (d_max^3 u^4)` for `u >= d_ref / d_max`, so
//!
//! `ln L_marg = ln ∫ p(u) exp(dh u - hh u^2 / 2) du`.
//!
//! Nodes are a log-spaced layout covering the prior support merged with a
//! uniform layout around the likelihood peak `u* = dh / hh`. Between nodes
//! the log integrand is taken to be linear in `s = ln u`, which integrates
//! the `u^-4` prior tail exactly; segment masses are combined with
//! log-sum-exp and the same segments are inverted when sampling.

use gm_core::{DistanceMarginalization, Error, Result};
use gm_prob::{ln_exprel, logsumexp, relative_weights};
use rand::{Rng, RngCore};

use crate::config::LookupTableConfig;

/// Half-width of the peak layout in units of `hh^-1/2`.
const PEAK_HALF_WIDTH: f64 = 12.0;

/// Distance lookup table under a uniform-in-volume prior.
#[derive(Debug, Clone)]
pub struct LookupTable {
    reference_distance: f64,
    d_luminosity_max: f64,
    u_min: f64,
    /// `ln p(u) + 4 ln u`
    ln_prior_norm: f64,
    /// Log-spaced fractions `k / (n - 1)`.
    log_fractions: Vec<f64>,
    n_peak_nodes: usize,
}

/// Piecewise log-linear integrand in `s = ln u`.
struct Segments {
    s: Vec<f64>,
    /// `ln(p(u) L(u) u)` at each node.
    ln_f: Vec<f64>,
    /// Log mass of each segment.
    ln_mass: Vec<f64>,
}

impl LookupTable {
    /// Build from configuration.
    pub fn new(config: &LookupTableConfig) -> Result<Self> {
        config.validate()?;
        let d_ref = config.reference_distance;
        let d_max = config.d_luminosity_max;
        let n_log = config.n_log_nodes;
        log::debug!(
            "lookup table: d_ref = {d_ref} Mpc, d_max = {d_max} Mpc, {n_log} + {} nodes",
            config.n_peak_nodes
        );
        Ok(Self {
            reference_distance: d_ref,
            d_luminosity_max: d_max,
            u_min: d_ref / d_max,
            ln_prior_norm: 3.0_f64.ln() + 3.0 * (d_ref / d_max).ln(),
            log_fractions: (0..n_log).map(|k| k as f64 / (n_log - 1) as f64).collect(),
            n_peak_nodes: config.n_peak_nodes,
        })
    }

    /// Upper edge of the distance prior [Mpc].
    pub fn d_luminosity_max(&self) -> f64 {
        self.d_luminosity_max
    }

    fn check(dh: f64, hh: f64) -> Result<()> {
        if !dh.is_finite() || !hh.is_finite() {
            return Err(Error::Computation(format!("non-finite overlaps dh = {dh}, hh = {hh}")));
        }
        if hh <= 0.0 {
            return Err(Error::Computation(format!("<h|h> must be positive, got {hh}")));
        }
        Ok(())
    }

    /// Sorted quadrature nodes in `u` for one `(dh, hh)`.
    fn nodes(&self, dh: f64, hh: f64) -> Vec<f64> {
        let sigma = hh.sqrt().recip();
        let u_peak = dh / hh;
        let u_hi = u_peak.max(self.u_min) + PEAK_HALF_WIDTH * sigma;
        let log_span = (u_hi / self.u_min).ln();

        let mut u: Vec<f64> =
            self.log_fractions.iter().map(|&f| self.u_min * (f * log_span).exp()).collect();

        let lo = (u_peak - PEAK_HALF_WIDTH * sigma).max(self.u_min);
        let hi = (u_peak + PEAK_HALF_WIDTH * sigma).max(self.u_min);
        if hi > lo {
            let step = (hi - lo) / (self.n_peak_nodes - 1) as f64;
            u.extend((0..self.n_peak_nodes).map(|k| lo + step * k as f64));
        }
        u.sort_by(f64::total_cmp);
        u.dedup_by(|a, b| (*a - *b).abs() <= 1e-14 * b.abs());
        u
    }

    /// Log integrand `ln p(u) + dh u - hh u^2 / 2`.
    #[inline]
    fn ln_integrand(&self, u: f64, dh: f64, hh: f64) -> f64 {
        self.ln_prior_norm - 4.0 * u.ln() + dh * u - 0.5 * hh * u * u
    }

    fn segments(&self, dh: f64, hh: f64) -> Result<Segments> {
        Self::check(dh, hh)?;
        let u = self.nodes(dh, hh);
        let s: Vec<f64> = u.iter().map(|x| x.ln()).collect();
        // du = u ds
        let ln_f: Vec<f64> =
            u.iter().zip(&s).map(|(&uk, &sk)| self.ln_integrand(uk, dh, hh) + sk).collect();
        let ln_mass = (0..u.len() - 1)
            .map(|k| (s[k + 1] - s[k]).ln() + ln_f[k] + ln_exprel(ln_f[k + 1] - ln_f[k]))
            .collect();
        Ok(Segments { s, ln_f, ln_mass })
    }

    fn lnlike_one(&self, dh: f64, hh: f64) -> Result<f64> {
        Ok(logsumexp(&self.segments(dh, hh)?.ln_mass))
    }

    /// Draw `u` from the conditional posterior given a uniform variate.
    fn sample_u(&self, dh: f64, hh: f64, uniform: f64) -> Result<f64> {
        let seg = self.segments(dh, hh)?;
        let masses = relative_weights(&seg.ln_mass)?;
        let total: f64 = masses.iter().sum();
        let target = uniform * total;

        let mut acc = 0.0;
        let mut k = masses.len() - 1;
        for (j, &m) in masses.iter().enumerate() {
            if acc + m >= target && m > 0.0 {
                k = j;
                break;
            }
            acc += m;
        }
        let q = if masses[k] > 0.0 { ((target - acc) / masses[k]).clamp(0.0, 1.0) } else { 0.5 };

        // Invert exp(delta x) on [0, 1], reflecting for a rising segment so
        // that expm1 never overflows.
        let delta = seg.ln_f[k + 1] - seg.ln_f[k];
        let x = if delta.abs() < 1e-9 {
            q
        } else if delta < 0.0 {
            (q * delta.exp_m1()).ln_1p() / delta
        } else {
            1.0 - ((1.0 - q) * (-delta).exp_m1()).ln_1p() / (-delta)
        };
        let s = seg.s[k] + x * (seg.s[k + 1] - seg.s[k]);
        Ok(s.exp())
    }
}

impl DistanceMarginalization for LookupTable {
    fn reference_distance(&self) -> f64 {
        self.reference_distance
    }

    fn lnlike_marginalized(&self, d_h: &[f64], h_h: &[f64]) -> Result<Vec<f64>> {
        if d_h.len() != h_h.len() {
            return Err(Error::Validation(format!(
                "{} <d|h> values but {} <h|h> values",
                d_h.len(),
                h_h.len()
            )));
        }
        d_h.iter().zip(h_h).map(|(&dh, &hh)| self.lnlike_one(dh, hh)).collect()
    }

    fn sample_distance(&self, d_h: f64, h_h: f64, rng: &mut dyn RngCore) -> Result<f64> {
        let u = self.sample_u(d_h, h_h, rng.random::<f64>())?;
        Ok(self.reference_distance / u)
    }
}
