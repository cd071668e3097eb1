//! Detector strain, noise weighting and frequency grid of one event.

use std::ops::Range;

use gm_core::{Error, PolarizationStrain, Result, WaveformModel, WaveformParameters};
use num_complex::Complex64;
use rand::SeedableRng;
use rand_distr::{Distribution, StandardNormal};
use serde::{Deserialize, Serialize};

/// A detector with a fixed antenna response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detector {
    /// Detector name (e.g. "H1").
    pub name: String,
    /// Plus-polarization antenna factor.
    pub fplus: f64,
    /// Cross-polarization antenna factor.
    pub fcross: f64,
}

impl Detector {
    /// Create a detector.
    pub fn new(name: impl Into<String>, fplus: f64, fcross: f64) -> Self {
        Self { name: name.into(), fplus, fcross }
    }

    /// Antenna factor for polarization index `p` (0 = plus, 1 = cross).
    #[inline]
    pub fn antenna(&self, p: usize) -> f64 {
        if p == 0 { self.fplus } else { self.fcross }
    }
}

/// Frequency-domain data of a multi-detector event.
///
/// Inner products are `<a|b>_d = Σ_f a(f) conj(b(f)) wht_filter[d][f]^2`,
/// further divided by `asd_drift[d]^2` when the likelihood is formed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventData {
    /// Event name.
    pub eventname: String,
    /// Detectors, in the order of the per-detector arrays below.
    pub detectors: Vec<Detector>,
    /// Uniform frequency grid [Hz].
    pub frequencies: Vec<f64>,
    /// Analysis band `[f_min, f_max]` [Hz].
    pub fbounds: [f64; 2],
    /// Strain per detector and frequency.
    pub strain: Vec<Vec<Complex64>>,
    /// Whitening filter per detector and frequency, zero outside the band.
    pub wht_filter: Vec<Vec<f64>>,
    /// ASD drift correction per detector.
    pub asd_drift: Vec<f64>,
}

impl EventData {
    /// Noise-only container with zero strain and `wht_filter = sqrt(4 df / PSD)`
    /// inside `fbounds`.
    pub fn from_psd(
        eventname: impl Into<String>,
        detectors: Vec<Detector>,
        frequencies: Vec<f64>,
        psd: &[Vec<f64>],
        fbounds: [f64; 2],
    ) -> Result<Self> {
        if psd.len() != detectors.len() {
            return Err(Error::Validation(format!(
                "{} PSDs for {} detectors",
                psd.len(),
                detectors.len()
            )));
        }
        if frequencies.len() < 2 {
            return Err(Error::Validation("need at least two frequencies".to_string()));
        }
        let df = frequencies[1] - frequencies[0];
        let wht_filter = psd
            .iter()
            .map(|psd_d| {
                if psd_d.len() != frequencies.len() {
                    return Err(Error::Validation(format!(
                        "PSD has {} values for {} frequencies",
                        psd_d.len(),
                        frequencies.len()
                    )));
                }
                Ok(frequencies
                    .iter()
                    .zip(psd_d)
                    .map(|(&f, &s)| {
                        if f >= fbounds[0] && f <= fbounds[1] && s > 0.0 {
                            (4.0 * df / s).sqrt()
                        } else {
                            0.0
                        }
                    })
                    .collect())
            })
            .collect::<Result<Vec<Vec<f64>>>>()?;

        let n_det = detectors.len();
        let data = Self {
            eventname: eventname.into(),
            strain: vec![vec![Complex64::new(0.0, 0.0); frequencies.len()]; n_det],
            wht_filter,
            asd_drift: vec![1.0; n_det],
            detectors,
            frequencies,
            fbounds,
        };
        data.validate()?;
        Ok(data)
    }

    /// Replace the ASD drift corrections.
    pub fn with_asd_drift(mut self, asd_drift: Vec<f64>) -> Result<Self> {
        self.asd_drift = asd_drift;
        self.validate()?;
        Ok(self)
    }

    /// Check shapes, grid uniformity, band and drift values.
    pub fn validate(&self) -> Result<()> {
        let n_det = self.detectors.len();
        let n_f = self.frequencies.len();
        if n_det == 0 {
            return Err(Error::Validation("event has no detectors".to_string()));
        }
        if n_f < 2 {
            return Err(Error::Validation("need at least two frequencies".to_string()));
        }
        if self.strain.len() != n_det
            || self.wht_filter.len() != n_det
            || self.asd_drift.len() != n_det
        {
            return Err(Error::Validation(format!(
                "per-detector arrays must have {n_det} entries (strain {}, wht_filter {}, asd_drift {})",
                self.strain.len(),
                self.wht_filter.len(),
                self.asd_drift.len()
            )));
        }
        if let Some(d) =
            (0..n_det).find(|&d| self.strain[d].len() != n_f || self.wht_filter[d].len() != n_f)
        {
            return Err(Error::Validation(format!(
                "detector {} arrays do not match {n_f} frequencies",
                self.detectors[d].name
            )));
        }
        let df = self.df();
        if !(df > 0.0) {
            return Err(Error::Validation(format!("frequency step must be positive, got {df}")));
        }
        if self.frequencies.windows(2).any(|w| ((w[1] - w[0]) - df).abs() > 1e-6 * df) {
            return Err(Error::Validation("frequency grid must be uniform".to_string()));
        }
        let [f_min, f_max] = self.fbounds;
        if !(f_min < f_max && f_min >= self.frequencies[0] && f_max <= self.frequencies[n_f - 1]) {
            return Err(Error::Validation(format!(
                "fbounds [{f_min}, {f_max}] must be an increasing range inside the frequency grid"
            )));
        }
        if let Some(&bad) = self.asd_drift.iter().find(|&&x| !(x.is_finite() && x > 0.0)) {
            return Err(Error::Validation(format!("asd_drift must be positive, got {bad}")));
        }
        Ok(())
    }

    /// Number of detectors.
    pub fn n_detectors(&self) -> usize {
        self.detectors.len()
    }

    /// Frequency resolution [Hz].
    pub fn df(&self) -> f64 {
        self.frequencies[1] - self.frequencies[0]
    }

    /// Indices of the frequencies inside `fbounds` (inclusive).
    pub fn band_indices(&self) -> Range<usize> {
        let [f_min, f_max] = self.fbounds;
        let start = self.frequencies.partition_point(|&f| f < f_min);
        let end = self.frequencies.partition_point(|&f| f <= f_max);
        start..end
    }

    /// Inner-product weight `wht_filter^2` of detector `d` at frequency index `i`.
    #[inline]
    pub fn weight(&self, d: usize, i: usize) -> f64 {
        let w = self.wht_filter[d][i];
        w * w
    }

    /// `asd_drift^-2` per detector.
    pub fn asd_drift_weights(&self) -> Vec<f64> {
        self.asd_drift.iter().map(|&x| 1.0 / (x * x)).collect()
    }

    /// Project harmonic polarizations onto detector `d`: `Σ_m Σ_p F_p h_mp`.
    pub fn project(&self, modes: &[PolarizationStrain], d: usize) -> Vec<Complex64> {
        let det = &self.detectors[d];
        let n = modes.first().map_or(0, |m| m[0].len());
        let mut out = vec![Complex64::new(0.0, 0.0); n];
        for mode in modes {
            for (p, pol) in mode.iter().enumerate() {
                let f_p = det.antenna(p);
                for (o, &h) in out.iter_mut().zip(pol) {
                    *o += h * f_p;
                }
            }
        }
        out
    }

    /// Add a noise-free signal inside the band.
    pub fn inject_signal(
        &mut self,
        model: &dyn WaveformModel,
        par: &WaveformParameters,
    ) -> Result<()> {
        let band = self.band_indices();
        let modes = model.hplus_hcross_by_mode(&self.frequencies[band.clone()], par)?;
        for d in 0..self.n_detectors() {
            let h = self.project(&modes, d);
            for (s, hf) in self.strain[d][band.clone()].iter_mut().zip(h) {
                *s += hf;
            }
        }
        log::debug!("injected {} signal into event {}", model.name(), self.eventname);
        Ok(())
    }

    /// Add stationary Gaussian noise with unit whitened variance per
    /// frequency (each quadrature has standard deviation `1 / wht_filter`).
    pub fn add_gaussian_noise(&mut self, seed: u64) {
        let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
        for d in 0..self.n_detectors() {
            for (s, &w) in self.strain[d].iter_mut().zip(&self.wht_filter[d]) {
                if w > 0.0 {
                    let re: f64 = StandardNormal.sample(&mut rng);
                    let im: f64 = StandardNormal.sample(&mut rng);
                    *s += Complex64::new(re, im) / w;
                }
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Two detectors, 0.5 Hz grid over [0, 256] Hz, flat unit PSD in [20, 200] Hz.
    pub(crate) fn flat_event() -> EventData {
        let frequencies: Vec<f64> = (0..=512).map(|i| 0.5 * i as f64).collect();
        let psd = vec![vec![1.0; frequencies.len()]; 2];
        EventData::from_psd(
            "flat",
            vec![Detector::new("H1", 0.6, 0.3), Detector::new("L1", -0.5, 0.4)],
            frequencies,
            &psd,
            [20.0, 200.0],
        )
        .unwrap()
    }

    #[test]
    fn test_from_psd_weights_and_band() {
        let event = flat_event();
        let band = event.band_indices();
        assert_eq!(event.frequencies[band.start], 20.0);
        assert_eq!(event.frequencies[band.end - 1], 200.0);
        assert_relative_eq!(event.weight(0, band.start), 4.0 * 0.5, epsilon = 1e-14);
        assert_eq!(event.weight(0, band.start - 1), 0.0);
        assert_eq!(event.weight(1, band.end), 0.0);
    }

    #[test]
    fn test_validate_rejects_bad_shapes() {
        let mut event = flat_event();
        event.asd_drift = vec![1.0];
        assert!(event.validate().is_err());

        let event = flat_event().with_asd_drift(vec![1.0, 0.0]);
        assert!(event.is_err());

        let mut event = flat_event();
        event.frequencies[3] += 0.1;
        assert!(event.validate().is_err());
    }

    #[test]
    fn test_gaussian_noise_has_unit_whitened_power() {
        let mut event = flat_event();
        event.add_gaussian_noise(7);
        let band = event.band_indices();
        let n = band.len() as f64;
        let power: f64 =
            band.clone().map(|i| event.strain[0][i].norm_sqr() * event.weight(0, i)).sum::<f64>() / n;
        // E|n|^2 w = 2 per frequency.
        assert!((power - 2.0).abs() < 0.5, "whitened power {power}");
        assert_eq!(event.strain[0][0], Complex64::new(0.0, 0.0));
    }
}
