//! Exact overlaps on the full frequency grid.
//!
//! Slow; used to check relative binning and to build synthetic events.

use gm_core::{Result, WaveformModel, WaveformParameters};

use crate::event_data::EventData;

/// Per-detector `(Re<d|h>, <h|h>)` summed over the analysis band, without
/// ASD drift.
pub fn inner_products(
    event: &EventData,
    model: &dyn WaveformModel,
    par: &WaveformParameters,
) -> Result<(Vec<f64>, Vec<f64>)> {
    let band = event.band_indices();
    let modes = model.hplus_hcross_by_mode(&event.frequencies[band.clone()], par)?;
    let n_det = event.n_detectors();
    let mut dh = vec![0.0; n_det];
    let mut hh = vec![0.0; n_det];
    for d in 0..n_det {
        let h = event.project(&modes, d);
        for (j, i) in band.clone().enumerate() {
            let w = event.weight(d, i);
            dh[d] += (event.strain[d][i] * h[j].conj()).re * w;
            hh[d] += h[j].norm_sqr() * w;
        }
    }
    Ok((dh, hh))
}

/// `Σ_d (<d|h>_d - <h|h>_d / 2) / asd_drift_d^2` on the full grid.
pub fn lnlike_no_marginalization(
    event: &EventData,
    model: &dyn WaveformModel,
    par: &WaveformParameters,
) -> Result<f64> {
    let (dh, hh) = inner_products(event, model, par)?;
    Ok(event
        .asd_drift_weights()
        .iter()
        .zip(dh.iter().zip(&hh))
        .map(|(&w, (&dh_d, &hh_d))| w * (dh_d - 0.5 * hh_d))
        .sum())
}
