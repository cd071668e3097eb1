//! TaylorF2 inspiral with finite-size effects (quadrupole-only).
//!
//! Point-particle phase through 4PN, aligned-spin terms through 3.5PN with
//! spin-induced quadrupoles (`kappa`) and octupoles (`lambda`), tidal
//! dissipation (linear-, cubic- and spin-independent) and the 5PN Love-number
//! term. Above the inspiral cutoff the amplitude is tapered by a logistic
//! merger model and the intrinsic phase is frozen.

use std::f64::consts::PI;

use gm_core::{Error, PolarizationStrain, Result, WaveformModel, WaveformParameters};
use gm_prob::finite_diff::gradient;
use gm_prob::sigmoid;
use num_complex::Complex64;

const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;
/// Solar mass [kg].
const MSUN: f64 = 1.988_409_902_147_041_6e30;
/// Newton's constant [m^3 / kg / s^2].
const G_NEWTON: f64 = 6.67430e-11;
/// Speed of light [m / s].
const C_LIGHT: f64 = 299_792_458.0;
/// `G MSUN / c^3` [s].
const GT: f64 = G_NEWTON * MSUN / (C_LIGHT * C_LIGHT * C_LIGHT);
/// `(G MSUN / c^3)^(5/6) c / Mpc` in strain units at 1 Mpc.
const AMPLITUDE_PREFACTOR: f64 = 3.668_693_487_553_099_6e-19;
/// Replaces a zero frequency to keep the amplitude finite.
const F_ZERO_GUARD: f64 = 1e-4;
/// Added to the strain so reference ratios never divide by zero.
const STRAIN_FLOOR: f64 = 1e-30;

const PARAMS: [&str; 19] = [
    "m1",
    "m2",
    "s1z",
    "s2z",
    "kappa1",
    "kappa2",
    "h1s1",
    "h2s1",
    "lambda1",
    "lambda2",
    "h1s3",
    "h2s3",
    "h1s0",
    "h2s0",
    "l1",
    "l2",
    "d_luminosity",
    "phi_ref",
    "iota",
];

/// Intrinsic source parameters entering the phase.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QdolIntrinsic {
    /// Chirp mass [Msun].
    pub mchirp: f64,
    /// Symmetric mass ratio `m1 m2 / (m1 + m2)^2`.
    pub eta: f64,
    /// Aligned spin of the primary.
    pub chi1: f64,
    /// Aligned spin of the secondary.
    pub chi2: f64,
    /// Spin-induced quadrupoles.
    pub kappa: [f64; 2],
    /// Linear-in-spin dissipation numbers.
    pub h_s1: [f64; 2],
    /// Spin-induced octupoles.
    pub lambda: [f64; 2],
    /// Cubic-in-spin dissipation numbers.
    pub h_s3: [f64; 2],
    /// Spin-independent dissipation numbers.
    pub h_s0: [f64; 2],
    /// Love numbers.
    pub love: [f64; 2],
}

impl QdolIntrinsic {
    /// Read from a waveform parameter record, validating the masses.
    pub fn from_parameters(par: &WaveformParameters) -> Result<Self> {
        let m1 = par.get("m1")?;
        let m2 = par.get("m2")?;
        if !(m1.is_finite() && m2.is_finite() && m1 > 0.0 && m2 > 0.0) {
            return Err(Error::PhysicalParameter(format!(
                "component masses must be finite and positive, got m1={m1}, m2={m2}"
            )));
        }
        let mtot = m1 + m2;
        let eta = m1 * m2 / (mtot * mtot);
        Ok(Self {
            mchirp: mtot * eta.powf(0.6),
            eta,
            chi1: par.get("s1z")?,
            chi2: par.get("s2z")?,
            kappa: [par.get("kappa1")?, par.get("kappa2")?],
            h_s1: [par.get("h1s1")?, par.get("h2s1")?],
            lambda: [par.get("lambda1")?, par.get("lambda2")?],
            h_s3: [par.get("h1s3")?, par.get("h2s3")?],
            h_s0: [par.get("h1s0")?, par.get("h2s0")?],
            love: [par.get("l1")?, par.get("l2")?],
        })
    }

    fn total_mass(&self) -> f64 {
        self.mchirp / self.eta.powf(0.6)
    }
}

/// TaylorF2 + finite-size waveform model, `(l, |m|) = (2, 2)` only.
#[derive(Debug, Clone)]
pub struct TaylorF2Qdol {
    f_ref: f64,
    fix_bh_superradiance: bool,
}

impl TaylorF2Qdol {
    /// Create a model with reference frequency `f_ref` [Hz].
    ///
    /// `fix_bh_superradiance` replaces the spin-independent dissipation
    /// numbers by the black-hole superradiance value derived from `h_s1`.
    pub fn new(f_ref: f64, fix_bh_superradiance: bool) -> Result<Self> {
        if !(f_ref.is_finite() && f_ref > 0.0) {
            return Err(Error::Configuration(format!("f_ref must be positive, got {f_ref}")));
        }
        Ok(Self { f_ref, fix_bh_superradiance })
    }

    /// Whether the superradiance condition is imposed on the 4PN dissipation term.
    pub fn fix_bh_superradiance(&self) -> bool {
        self.fix_bh_superradiance
    }

    /// Frequency-domain phase `Psi(f)` (time and phase of coalescence zero).
    pub fn phase(&self, f: f64, theta: &QdolIntrinsic) -> f64 {
        phase_qdol(f, theta, self.fix_bh_superradiance)
    }

    /// Complex strain of the dominant harmonic before inclination factors.
    fn strain_h0(
        &self,
        frequencies: &[f64],
        theta: &QdolIntrinsic,
        d_luminosity: f64,
        phi_ref: f64,
    ) -> Result<Vec<Complex64>> {
        let f: Vec<f64> =
            frequencies.iter().map(|&v| if v == 0.0 { F_ZERO_GUARD } else { v }).collect();
        let mtot = theta.total_mass();

        let amp_ins: Vec<f64> = f
            .iter()
            .map(|&fi| {
                theta.mchirp.powf(5.0 / 6.0) * (5.0f64 / 24.0).sqrt()
                    / PI.powf(2.0 / 3.0)
                    / (fi + 1e-30).powf(7.0 / 6.0)
                    / d_luminosity
            })
            .collect();

        let psi: Vec<f64> = f.iter().map(|&fi| self.phase(fi, theta)).collect();
        let grad_psi = gradient(&psi, &f)?;
        if grad_psi.iter().any(|g| !g.is_finite()) {
            return Err(Error::PhysicalParameter(format!(
                "non-finite phase derivative for mchirp={}, eta={}",
                theta.mchirp, theta.eta
            )));
        }

        let i_phase_cutoff = argmax(&grad_psi);
        let f_isco = 4.4e3 / mtot;
        let f_cutoff = f_isco.min(f[i_phase_cutoff]);
        let i_cutoff = argmin_by(&f, |fi| (fi - f_cutoff).abs());
        let t0 = grad_psi[i_cutoff];
        let psi_ref = self.phase(self.f_ref, theta);

        let merger_scale = amp_ins[i_cutoff] / f_cutoff.powf(-7.0 / 6.0);

        let h: Vec<Complex64> = f
            .iter()
            .zip(psi.iter().zip(amp_ins.iter()))
            .map(|(&fi, (&p, &a))| {
                let inspiral_phase =
                    if fi <= f_cutoff { p - t0 * (fi - self.f_ref) - psi_ref } else { 0.0 };
                // Applied everywhere so each harmonic rotates exactly with phi_ref.
                let phase = inspiral_phase - 2.0 * phi_ref;

                let amp_merger = sigmoid(1.2 * f_cutoff - fi) * merger_scale * fi.powf(-7.0 / 6.0);
                let amp = a * heaviside(f_cutoff - fi, 0.5) + amp_merger * heaviside(fi - f_cutoff, 0.5);

                Complex64::from_polar(amp * AMPLITUDE_PREFACTOR, -phase) + STRAIN_FLOOR
            })
            .collect();

        if h.iter().any(|z| !z.is_finite()) {
            return Err(Error::PhysicalParameter(format!(
                "non-finite strain for mchirp={}, eta={}",
                theta.mchirp, theta.eta
            )));
        }
        Ok(h)
    }
}

impl WaveformModel for TaylorF2Qdol {
    fn name(&self) -> &str {
        "TaylorF2Qdol"
    }

    fn harmonic_modes(&self) -> &[i32] {
        &[2]
    }

    fn params(&self) -> &[&'static str] {
        &PARAMS
    }

    fn f_ref(&self) -> f64 {
        self.f_ref
    }

    fn hplus_hcross_by_mode(
        &self,
        frequencies: &[f64],
        par: &WaveformParameters,
    ) -> Result<Vec<PolarizationStrain>> {
        let theta = QdolIntrinsic::from_parameters(par)?;
        let d_luminosity = par.get("d_luminosity")?;
        if !(d_luminosity.is_finite() && d_luminosity > 0.0) {
            return Err(Error::PhysicalParameter(format!(
                "d_luminosity must be positive, got {d_luminosity}"
            )));
        }
        let iota = par.get("iota")?;
        let phi_ref = par.get("phi_ref")?;

        let h0 = self.strain_h0(frequencies, &theta, d_luminosity, phi_ref)?;
        let cos_iota = iota.cos();
        let plus_factor = 0.5 * (1.0 + cos_iota * cos_iota);
        let cross_factor = Complex64::new(0.0, -cos_iota);

        let hplus = h0.iter().map(|&h| h * plus_factor).collect();
        let hcross = h0.iter().map(|&h| h * cross_factor).collect();
        Ok(vec![[hplus, hcross]])
    }
}

fn heaviside(x: f64, at_zero: f64) -> f64 {
    if x > 0.0 {
        1.0
    } else if x < 0.0 {
        0.0
    } else {
        at_zero
    }
}

/// Index of the first maximum.
fn argmax(xs: &[f64]) -> usize {
    let mut best = 0;
    for (i, &x) in xs.iter().enumerate() {
        if x > xs[best] {
            best = i;
        }
    }
    best
}

/// Index of the first minimum of `key(x)`.
fn argmin_by(xs: &[f64], key: impl Fn(f64) -> f64) -> usize {
    let mut best = 0;
    let mut best_key = f64::INFINITY;
    for (i, &x) in xs.iter().enumerate() {
        let k = key(x);
        if k < best_key {
            best = i;
            best_key = k;
        }
    }
    best
}

/// TaylorF2 phase with finite-size corrections.
fn phase_qdol(f: f64, theta: &QdolIntrinsic, fix_bh_superradiance: bool) -> f64 {
    let eta = theta.eta;
    let m = theta.total_mass();
    let disc = (m * m - 4.0 * eta * m * m).max(0.0).sqrt();
    let m1 = 0.5 * (m + disc);
    let m2 = 0.5 * (m - disc);
    let delta = (1.0 - 4.0 * eta).max(0.0).sqrt();

    // Constant log(v/v_lso) pieces are absorbed into the overall phase and time.
    let v = (PI * m * (f + 1e-100) * GT).cbrt();
    let log_v = v.ln();
    let v2 = v * v;
    let v3 = v2 * v;
    let v4 = v2 * v2;
    let v5 = v4 * v;
    let v6 = v3 * v3;
    let v7 = v3 * v4;
    let v8 = v4 * v4;
    let v10 = v5 * v5;
    let eta2 = eta * eta;
    let eta3 = eta2 * eta;
    let eta4 = eta3 * eta;
    let pi2 = PI * PI;

    let chi_s = 0.5 * (theta.chi1 + theta.chi2);
    let chi_a = 0.5 * (theta.chi1 - theta.chi2);
    let k_s = 0.5 * (theta.kappa[0] + theta.kappa[1]);
    let k_a = 0.5 * (theta.kappa[0] - theta.kappa[1]);
    let lambda_s = 0.5 * (theta.lambda[0] + theta.lambda[1]);
    let lambda_a = 0.5 * (theta.lambda[0] - theta.lambda[1]);

    let m1_3 = m1.powi(3);
    let m2_3 = m2.powi(3);
    let m1_4 = m1.powi(4);
    let m2_4 = m2.powi(4);
    let mtot3 = m.powi(3);
    let mtot4 = m.powi(4);

    let l_tilde = 16.0
        * ((m1 + 12.0 * m2) * m1_4 * theta.love[0] + (m2 + 12.0 * m1) * m2_4 * theta.love[1])
        / (13.0 * m.powi(5));

    let hs = (theta.h_s1[0] * m1_3 + theta.h_s1[1] * m2_3) / mtot3;
    let ha = (theta.h_s1[0] * m1_3 - theta.h_s1[1] * m2_3) / mtot3;
    let hs3 = (theta.h_s3[0] * m1_3 + theta.h_s3[1] * m2_3) / mtot3;
    let ha3 = (theta.h_s3[0] * m1_3 - theta.h_s3[1] * m2_3) / mtot3;

    // Leading-order superradiance: exact only for Schwarzschild black holes.
    let h0 = if fix_bh_superradiance {
        (-2.0 * theta.h_s1[0] * m1_4 - 2.0 * theta.h_s1[1] * m2_4) / mtot4
    } else {
        (theta.h_s0[0] * m1_4 + theta.h_s0[1] * m2_4) / mtot4
    };

    // Point particle, non-spinning.
    let psi_ns_0pn = 1.0;
    let psi_ns_1pn = (3715.0 / 756.0 + 55.0 * eta / 9.0) * v2;
    let psi_ns_15pn = -16.0 * PI * v3;
    let psi_ns_2pn = (15293365.0 / 508032.0 + 27145.0 * eta / 504.0 + 3085.0 * eta2 / 72.0) * v4;
    let psi_ns_25pn = PI * (38645.0 / 756.0 - 65.0 * eta / 9.0) * (1.0 + 3.0 * log_v) * v5;
    let psi_ns_3pn = (11583231236531.0 / 4694215680.0 - 640.0 * pi2 / 3.0
        - 6848.0 * EULER_GAMMA / 21.0
        + (2255.0 * pi2 / 12.0 - 15737765635.0 / 3048192.0) * eta
        + 76055.0 / 1728.0 * eta2
        - 127825.0 / 1296.0 * eta3
        - 6848.0 * (4.0 * v).ln() / 21.0)
        * v6;
    let psi_ns_35pn =
        PI * (77096675.0 / 254016.0 + 378515.0 * eta / 1512.0 - 74045.0 * eta2 / 756.0) * v7;
    let psi_ns_4pn = (-90490.0 * pi2 / 567.0 - 36812.0 * EULER_GAMMA / 189.0
        + 2550713843998885153.0 / 830425530654720.0
        - 26325.0 / 196.0 * 3f64.ln()
        - 1011020.0 / 3969.0 * 2f64.ln()
        + (-680712846248317.0 / 126743823360.0 - 3911888.0 * EULER_GAMMA / 3969.0
            + 109295.0 * pi2 / 672.0
            - 9964112.0 / 3969.0 * 2f64.ln()
            + 26325.0 / 49.0 * 3f64.ln())
            * eta
        + (7510073635.0 / 9144576.0 - 11275.0 / 432.0 * pi2) * eta2
        + 1292395.0 / 36288.0 * eta3
        - 5975.0 / 288.0 * eta4)
        * v8
        * (1.0 - 3.0 * log_v);
    let psi_ns_4pn_log2 = (18406.0 / 63.0 + 1955944.0 / 1323.0 * eta) * v8 * log_v * log_v;

    // Love numbers and spin-independent dissipation.
    let psi_tln_5pn = -(39.0 * l_tilde / 2.0) * v10;
    let psi_tdn_ns_4pn = 25.0 / 2.0 * h0 * v8 * (1.0 - 3.0 * log_v);

    // Aligned spins.
    let psi_s_15pn =
        ((113.0 / 3.0 - 76.0 * eta / 3.0) * chi_s + 113.0 * delta * chi_a / 3.0) * v3;

    let psi_s_2pn = (-(5.0 / 8.0)
        * (1.0 + 156.0 * eta + 80.0 * delta * k_a + 80.0 * (1.0 - 2.0 * eta) * k_s)
        * chi_s
        * chi_s
        - (5.0 / 8.0)
            * (1.0 - 160.0 * eta + 80.0 * delta * k_a + 80.0 * (1.0 - 2.0 * eta) * k_s)
            * chi_a
            * chi_a
        - (5.0 / 4.0)
            * (delta + 80.0 * delta * k_s + 80.0 * (1.0 - 2.0 * eta) * k_a)
            * chi_s
            * chi_a)
        * v4;

    let psi_s_25pn = (-(732985.0 / 2268.0 - 24260.0 * eta / 81.0 - 340.0 * eta2 / 9.0) * chi_s
        - (732985.0 / 2268.0 + 140.0 * eta / 9.0) * delta * chi_a)
        * v5
        * (1.0 + 3.0 * log_v);

    let mut psi_s_3pn =
        (2270.0 / 3.0 - 520.0 * eta) * PI * chi_s + (2270.0 * PI / 3.0) * delta * chi_a;
    psi_s_3pn += ((26015.0 / 14.0 - 88510.0 * eta / 21.0 - 480.0 * eta2) * k_a
        + delta
            * (-1344475.0 / 1008.0 + 745.0 * eta / 18.0
                + (26015.0 / 14.0 - 1495.0 * eta / 3.0) * k_s))
        * chi_s
        * chi_a;
    psi_s_3pn += (-1344475.0 / 2016.0 + 829705.0 * eta / 504.0 + 3415.0 * eta2 / 9.0
        + (26015.0 / 28.0 - 44255.0 * eta / 21.0 - 240.0 * eta2) * k_s
        + delta * (26015.0 / 28.0 - 1495.0 * eta / 6.0) * k_a)
        * chi_s
        * chi_s;
    psi_s_3pn += (-1344475.0 / 2016.0 + 267815.0 * eta / 252.0 - 240.0 * eta2
        + (26015.0 / 28.0 - 44255.0 * eta / 21.0 - 240.0 * eta2) * k_s
        + delta * (26015.0 / 28.0 - 1495.0 * eta / 6.0) * k_a)
        * chi_a
        * chi_a;
    psi_s_3pn *= v6;

    // 3.5PN spin-orbit.
    let mut psi_s_35pn = (-25150083775.0 / 3048192.0 + 10566655595.0 * eta / 762048.0
        - 1042165.0 * eta2 / 3024.0
        + 5345.0 * eta3 / 36.0)
        * chi_s;
    psi_s_35pn +=
        (-25150083775.0 / 3048192.0 + 26804935.0 * eta / 6048.0 - 1985.0 * eta2 / 48.0)
            * delta
            * chi_a;
    // 3.5PN spin-spin.
    psi_s_35pn += (-15.0 * PI / 2.0 - 400.0 * PI * delta * k_a - 400.0 * PI * k_s
        + eta * (800.0 * PI + 800.0 * PI * k_s))
        * chi_a
        * chi_a;
    psi_s_35pn += (-15.0 * PI * delta - 800.0 * PI * k_a + 1600.0 * PI * eta * k_a
        - 800.0 * PI * delta * k_s)
        * chi_a
        * chi_s;
    psi_s_35pn += (-15.0 * PI / 2.0 - 400.0 * PI * delta * k_a - 400.0 * PI * k_s
        + eta * (-770.0 * PI + 800.0 * PI * k_s))
        * chi_s
        * chi_s;
    // 3.5PN spin-spin-spin.
    psi_s_35pn += (265.0 / 24.0 + 4035.0 * eta / 2.0 - 20.0 * eta2 / 3.0
        + (3110.0 / 3.0 - 10250.0 * eta / 3.0 + 40.0 * eta2) * k_s
        - 440.0 * (1.0 - 3.0 * eta) * lambda_s
        + delta * ((3110.0 / 3.0 - 4030.0 * eta / 3.0) * k_a - 440.0 * (1.0 - eta) * lambda_a))
        * chi_s.powi(3);
    psi_s_35pn += ((3110.0 / 3.0 - 8470.0 * eta / 3.0) * k_a
        - 440.0 * (1.0 - 3.0 * eta) * lambda_a
        + delta
            * (265.0 / 24.0 - 2070.0 * eta + (3110.0 / 3.0 - 750.0 * eta) * k_s
                - 440.0 * (1.0 - eta) * lambda_s))
        * chi_a.powi(3);
    psi_s_35pn += ((3110.0 - 28970.0 * eta / 3.0 + 80.0 * eta2) * k_a
        - 1320.0 * (1.0 - 3.0 * eta) * lambda_a
        + delta
            * (265.0 / 8.0 + 12055.0 * eta / 6.0 + (3110.0 - 10310.0 * eta / 3.0) * k_s
                - 1320.0 * (1.0 - eta) * lambda_s))
        * chi_s
        * chi_s
        * chi_a;
    psi_s_35pn += (265.0 / 8.0 - 6500.0 * eta / 3.0 + 40.0 * eta2
        + (3110.0 - 27190.0 * eta / 3.0 + 40.0 * eta2) * k_s
        - 1320.0 * (1.0 - 3.0 * eta) * lambda_s
        + delta * ((3110.0 - 8530.0 * eta / 3.0) * k_a - 1320.0 * (1.0 - eta) * lambda_a))
        * chi_a
        * chi_a
        * chi_s;
    psi_s_35pn *= v7;

    // Spin-dependent tidal dissipation (Kerr, E/B duality).
    let psi_tdn_s_25pn =
        (25.0 * hs * chi_s / 4.0 + 25.0 * ha * chi_a / 4.0) * v5 * (1.0 + 3.0 * log_v);
    let mut psi_tdn_s_35pn =
        (115575.0 / 448.0 * ha + 1425.0 / 16.0 * eta * ha + 675.0 / 32.0 * delta * hs) * chi_a;
    psi_tdn_s_35pn +=
        (115575.0 / 448.0 * hs + 1425.0 / 16.0 * eta * hs + 675.0 / 32.0 * delta * ha) * chi_s;
    psi_tdn_s_35pn += (225.0 / 8.0 * ha3) * chi_a.powi(3);
    psi_tdn_s_35pn += (225.0 / 8.0 * hs3) * chi_s.powi(3);
    psi_tdn_s_35pn += (675.0 / 8.0 * ha3) * chi_a * chi_s * chi_s;
    psi_tdn_s_35pn += (675.0 / 8.0 * hs3) * chi_a * chi_a * chi_s;
    psi_tdn_s_35pn *= v7;

    let psi_ns = psi_ns_0pn
        + psi_ns_1pn
        + psi_ns_15pn
        + psi_ns_2pn
        + psi_ns_25pn
        + psi_ns_3pn
        + psi_ns_35pn
        + psi_ns_4pn
        + psi_ns_4pn_log2;
    let psi_s = psi_s_15pn + psi_s_2pn + psi_s_25pn + psi_s_3pn + psi_s_35pn;
    let psi_tdn = psi_tdn_s_25pn + psi_tdn_s_35pn + psi_tdn_ns_4pn;

    3.0 / 128.0 / eta / v5 * (psi_ns + psi_s + psi_tdn + psi_tln_5pn)
}
