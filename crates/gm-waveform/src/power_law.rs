//! Analytic multi-harmonic power-law model.
//!
//! `h_m(f) = A a_m (f / f_ref)^(-7/6) exp(i (m phi_ref - 2π f tc)) / d_luminosity`,
//! projected with the quadrupole inclination factors. Cheap, exactly
//! harmonic in `phi_ref`, and useful for validating the phasor algebra with
//! more than one harmonic.

use std::f64::consts::PI;

use gm_core::{Error, PolarizationStrain, Result, WaveformModel, WaveformParameters};
use num_complex::Complex64;

const PARAMS: [&str; 5] = ["amplitude", "tc", "iota", "d_luminosity", "phi_ref"];

/// Multi-harmonic power-law waveform.
#[derive(Debug, Clone)]
pub struct HarmonicPowerLaw {
    f_ref: f64,
    modes: Vec<i32>,
    relative_amplitudes: Vec<f64>,
}

impl HarmonicPowerLaw {
    /// Create a model with one relative amplitude per harmonic.
    pub fn new(f_ref: f64, modes: Vec<i32>, relative_amplitudes: Vec<f64>) -> Result<Self> {
        if !(f_ref.is_finite() && f_ref > 0.0) {
            return Err(Error::Configuration(format!("f_ref must be positive, got {f_ref}")));
        }
        if modes.is_empty() || modes.len() != relative_amplitudes.len() {
            return Err(Error::Configuration(format!(
                "need one relative amplitude per harmonic, got {} modes and {} amplitudes",
                modes.len(),
                relative_amplitudes.len()
            )));
        }
        Ok(Self { f_ref, modes, relative_amplitudes })
    }
}

impl WaveformModel for HarmonicPowerLaw {
    fn name(&self) -> &str {
        "HarmonicPowerLaw"
    }

    fn harmonic_modes(&self) -> &[i32] {
        &self.modes
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
        let amplitude = par.get("amplitude")?;
        let tc = par.get("tc")?;
        let iota = par.get("iota")?;
        let d_luminosity = par.get("d_luminosity")?;
        let phi_ref = par.get("phi_ref")?;
        if !(d_luminosity.is_finite() && d_luminosity > 0.0) {
            return Err(Error::PhysicalParameter(format!(
                "d_luminosity must be positive, got {d_luminosity}"
            )));
        }
        if frequencies.iter().any(|&f| f <= 0.0) {
            return Err(Error::Validation("frequencies must be positive".to_string()));
        }

        let cos_iota = iota.cos();
        let plus_factor = 0.5 * (1.0 + cos_iota * cos_iota);
        let cross_factor = Complex64::new(0.0, -cos_iota);

        Ok(self
            .modes
            .iter()
            .zip(&self.relative_amplitudes)
            .map(|(&m, &a_m)| {
                let h: Vec<Complex64> = frequencies
                    .iter()
                    .map(|&f| {
                        let amp = amplitude * a_m * (f / self.f_ref).powf(-7.0 / 6.0) / d_luminosity;
                        Complex64::from_polar(amp, m as f64 * phi_ref - 2.0 * PI * f * tc)
                    })
                    .collect();
                let hplus = h.iter().map(|&z| z * plus_factor).collect();
                let hcross = h.iter().map(|&z| z * cross_factor).collect();
                [hplus, hcross]
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn par(phi_ref: f64) -> WaveformParameters {
        WaveformParameters::new(
            PARAMS.iter().map(|s| s.to_string()).collect(),
            vec![2.0, 0.01, 0.3, 10.0, phi_ref],
        )
        .unwrap()
    }

    #[test]
    fn test_each_harmonic_rotates_with_its_m() {
        let model = HarmonicPowerLaw::new(50.0, vec![2, 3, 4], vec![1.0, 0.3, 0.1]).unwrap();
        let f = [30.0, 60.0, 120.0];
        let h0 = model.hplus_hcross_by_mode(&f, &par(0.0)).unwrap();
        let h1 = model.hplus_hcross_by_mode(&f, &par(0.9)).unwrap();
        for (i, &m) in model.harmonic_modes().iter().enumerate() {
            let rot = Complex64::from_polar(1.0, m as f64 * 0.9);
            for p in 0..2 {
                for k in 0..f.len() {
                    let expected = h0[i][p][k] * rot;
                    assert_relative_eq!(h1[i][p][k].re, expected.re, epsilon = 1e-12);
                    assert_relative_eq!(h1[i][p][k].im, expected.im, epsilon = 1e-12);
                }
            }
        }
    }

    #[test]
    fn test_amplitude_at_reference_frequency() {
        let model = HarmonicPowerLaw::new(50.0, vec![2], vec![1.0]).unwrap();
        let h = model.hplus_hcross_by_mode(&[50.0], &par(0.0)).unwrap();
        let plus_factor = 0.5 * (1.0 + 0.3f64.cos().powi(2));
        assert_relative_eq!(h[0][0][0].norm(), 2.0 / 10.0 * plus_factor, epsilon = 1e-14);
    }

    #[test]
    fn test_mismatched_amplitudes_rejected() {
        assert!(HarmonicPowerLaw::new(50.0, vec![2, 3], vec![1.0]).is_err());
        assert!(HarmonicPowerLaw::new(-1.0, vec![2], vec![1.0]).is_err());
    }
}
