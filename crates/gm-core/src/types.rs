//! Common data types for gwmarg
//!
//! Parameter assignments are typed records rather than free-form maps: a
//! [`ParameterSpace`] validates a mapping once, producing an
//! [`IntrinsicParameters`] record, and merges the marginalized extrinsic
//! values back in with [`ParameterSpace::with_extrinsic`].

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Name of the reference orbital phase parameter [rad].
pub const PHI_REF: &str = "phi_ref";

/// Name of the luminosity distance parameter [Mpc].
pub const D_LUMINOSITY: &str = "d_luminosity";

/// Parameter layout of a waveform model, split into marginalized extrinsic
/// parameters (`phi_ref`, `d_luminosity`) and the remaining intrinsic ones.
#[derive(Debug, Clone)]
pub struct ParameterSpace {
    waveform: Arc<[String]>,
    intrinsic: Vec<String>,
    /// Position of each intrinsic name inside `waveform`.
    intrinsic_slots: Vec<usize>,
    phi_slot: usize,
    distance_slot: usize,
}

impl ParameterSpace {
    /// Build from the names a waveform model declares.
    ///
    /// The list must contain `phi_ref` and `d_luminosity` and no duplicates.
    pub fn new(waveform_params: &[&str]) -> Result<Self> {
        let waveform: Vec<String> = waveform_params.iter().map(|s| s.to_string()).collect();

        let mut seen = std::collections::BTreeSet::new();
        for name in &waveform {
            if !seen.insert(name.as_str()) {
                return Err(Error::Configuration(format!(
                    "duplicate waveform parameter '{name}'"
                )));
            }
        }

        let slot = |name: &str| {
            waveform.iter().position(|n| n == name).ok_or_else(|| {
                Error::Configuration(format!("waveform model does not declare '{name}'"))
            })
        };
        let phi_slot = slot(PHI_REF)?;
        let distance_slot = slot(D_LUMINOSITY)?;

        let mut intrinsic: Vec<String> = waveform
            .iter()
            .filter(|n| n.as_str() != PHI_REF && n.as_str() != D_LUMINOSITY)
            .cloned()
            .collect();
        intrinsic.sort();
        let intrinsic_slots =
            intrinsic.iter().map(|n| slot(n)).collect::<Result<Vec<usize>>>()?;

        Ok(Self { waveform: waveform.into(), intrinsic, intrinsic_slots, phi_slot, distance_slot })
    }

    /// All waveform parameter names, in the model's declaration order.
    pub fn waveform_names(&self) -> &[String] {
        &self.waveform
    }

    /// Intrinsic parameter names (sorted), i.e. everything except
    /// `phi_ref` and `d_luminosity`.
    pub fn intrinsic_names(&self) -> &[String] {
        &self.intrinsic
    }

    /// Validate a mapping in a single pass.
    ///
    /// Fails with [`Error::MissingParameter`] on the first (sorted) missing
    /// name and with [`Error::UnknownParameter`] on an unrecognized key.
    pub fn intrinsic_from_map(&self, map: &BTreeMap<String, f64>) -> Result<IntrinsicParameters> {
        let values = self
            .intrinsic
            .iter()
            .map(|name| map.get(name).copied().ok_or_else(|| Error::MissingParameter(name.clone())))
            .collect::<Result<Vec<f64>>>()?;
        if let Some(extra) = map.keys().find(|k| self.intrinsic.binary_search(*k).is_err()) {
            return Err(Error::UnknownParameter(extra.clone()));
        }
        Ok(IntrinsicParameters { values })
    }

    /// Wrap values already ordered like [`intrinsic_names`](Self::intrinsic_names).
    pub fn intrinsic_from_values(&self, values: Vec<f64>) -> Result<IntrinsicParameters> {
        if values.len() != self.intrinsic.len() {
            return Err(Error::Validation(format!(
                "expected {} intrinsic values, got {}",
                self.intrinsic.len(),
                values.len()
            )));
        }
        Ok(IntrinsicParameters { values })
    }

    /// Merge intrinsic values with explicit `phi_ref` and `d_luminosity`.
    pub fn with_extrinsic(
        &self,
        intrinsic: &IntrinsicParameters,
        phi_ref: f64,
        d_luminosity: f64,
    ) -> WaveformParameters {
        let mut values = vec![0.0; self.waveform.len()];
        for (&slot, &v) in self.intrinsic_slots.iter().zip(intrinsic.values.iter()) {
            values[slot] = v;
        }
        values[self.phi_slot] = phi_ref;
        values[self.distance_slot] = d_luminosity;
        WaveformParameters { names: Arc::clone(&self.waveform), values }
    }

    /// Full waveform assignment from a mapping (every declared name required).
    pub fn waveform_from_map(&self, map: &BTreeMap<String, f64>) -> Result<WaveformParameters> {
        let values = self
            .waveform
            .iter()
            .map(|name| map.get(name).copied().ok_or_else(|| Error::MissingParameter(name.clone())))
            .collect::<Result<Vec<f64>>>()?;
        if let Some(extra) = map.keys().find(|k| !self.waveform.iter().any(|n| n == *k)) {
            return Err(Error::UnknownParameter(extra.clone()));
        }
        Ok(WaveformParameters { names: Arc::clone(&self.waveform), values })
    }
}

/// Intrinsic parameter values, ordered like [`ParameterSpace::intrinsic_names`].
#[derive(Debug, Clone, PartialEq)]
pub struct IntrinsicParameters {
    values: Vec<f64>,
}

impl IntrinsicParameters {
    /// Raw values.
    pub fn values(&self) -> &[f64] {
        &self.values
    }
}

/// Complete, name-addressable parameter assignment consumed by waveform models.
#[derive(Debug, Clone, PartialEq)]
pub struct WaveformParameters {
    names: Arc<[String]>,
    values: Vec<f64>,
}

impl WaveformParameters {
    /// Build directly from parallel name/value lists.
    pub fn new(names: Vec<String>, values: Vec<f64>) -> Result<Self> {
        if names.len() != values.len() {
            return Err(Error::Validation(format!(
                "{} names but {} values",
                names.len(),
                values.len()
            )));
        }
        Ok(Self { names: names.into(), values })
    }

    /// Value of `name`.
    pub fn get(&self, name: &str) -> Result<f64> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| self.values[i])
            .ok_or_else(|| Error::MissingParameter(name.to_string()))
    }

    /// Copy with `name` set to `value`.
    pub fn with(&self, name: &str, value: f64) -> Result<Self> {
        let i = self
            .names
            .iter()
            .position(|n| n == name)
            .ok_or_else(|| Error::MissingParameter(name.to_string()))?;
        let mut out = self.clone();
        out.values[i] = value;
        Ok(out)
    }

    /// Parameter names.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Parameter values, parallel to [`names`](Self::names).
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Name → value mapping.
    pub fn to_map(&self) -> BTreeMap<String, f64> {
        self.names.iter().cloned().zip(self.values.iter().copied()).collect()
    }
}

/// Table of posterior samples: one row per sample, one column per parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleTable {
    /// Column names.
    pub columns: Vec<String>,
    /// Row-major values; every row has `columns.len()` entries.
    pub rows: Vec<Vec<f64>>,
}

impl SampleTable {
    /// Empty table with the given columns.
    pub fn new(columns: Vec<String>) -> Self {
        Self { columns, rows: Vec::new() }
    }

    /// Check that every row matches the column count.
    pub fn validate(&self) -> Result<()> {
        if let Some((i, row)) = self.rows.iter().enumerate().find(|(_, r)| r.len() != self.columns.len())
        {
            return Err(Error::Validation(format!(
                "row {i} has {} values, expected {}",
                row.len(),
                self.columns.len()
            )));
        }
        Ok(())
    }

    /// Append a row.
    pub fn push_row(&mut self, row: Vec<f64>) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(Error::Validation(format!(
                "row has {} values, expected {}",
                row.len(),
                self.columns.len()
            )));
        }
        self.rows.push(row);
        Ok(())
    }

    /// Number of samples.
    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    /// Index of a column.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Copy of one column.
    pub fn column(&self, name: &str) -> Option<Vec<f64>> {
        let j = self.column_index(name)?;
        Some(self.rows.iter().map(|r| r[j]).collect())
    }

    /// Add a column, or replace it if it already exists.
    pub fn set_column(&mut self, name: &str, values: Vec<f64>) -> Result<()> {
        if values.len() != self.rows.len() {
            return Err(Error::Validation(format!(
                "column '{name}' has {} values, table has {} rows",
                values.len(),
                self.rows.len()
            )));
        }
        match self.column_index(name) {
            Some(j) => {
                for (row, v) in self.rows.iter_mut().zip(values) {
                    row[j] = v;
                }
            }
            None => {
                self.columns.push(name.to_string());
                for (row, v) in self.rows.iter_mut().zip(values) {
                    row.push(v);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn space() -> ParameterSpace {
        ParameterSpace::new(&["m1", "m2", "d_luminosity", "phi_ref", "iota"]).unwrap()
    }

    #[test]
    fn test_intrinsic_names_sorted_without_extrinsic() {
        let s = space();
        assert_eq!(s.intrinsic_names(), &["iota", "m1", "m2"]);
        assert_eq!(s.waveform_names().len(), 5);
    }

    #[test]
    fn test_space_requires_extrinsic_names() {
        assert!(matches!(
            ParameterSpace::new(&["m1", "phi_ref"]),
            Err(Error::Configuration(_))
        ));
        assert!(matches!(
            ParameterSpace::new(&["m1", "m1", "phi_ref", "d_luminosity"]),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn test_intrinsic_from_map_missing_and_unknown() {
        let s = space();
        let mut map = BTreeMap::from([("m1".to_string(), 1.4), ("iota".to_string(), 0.3)]);
        match s.intrinsic_from_map(&map) {
            Err(Error::MissingParameter(name)) => assert_eq!(name, "m2"),
            other => panic!("expected missing m2, got {other:?}"),
        }
        map.insert("m2".to_string(), 1.3);
        map.insert("chirp".to_string(), 1.0);
        assert!(matches!(s.intrinsic_from_map(&map), Err(Error::UnknownParameter(_))));
    }

    #[test]
    fn test_with_extrinsic_merges_by_name() {
        let s = space();
        let map = BTreeMap::from([
            ("m1".to_string(), 1.4),
            ("m2".to_string(), 1.3),
            ("iota".to_string(), 0.3),
        ]);
        let intrinsic = s.intrinsic_from_map(&map).unwrap();
        let par = s.with_extrinsic(&intrinsic, 0.5, 100.0);
        assert_eq!(par.get("m1").unwrap(), 1.4);
        assert_eq!(par.get("iota").unwrap(), 0.3);
        assert_eq!(par.get(PHI_REF).unwrap(), 0.5);
        assert_eq!(par.get(D_LUMINOSITY).unwrap(), 100.0);
        assert_eq!(par.names(), s.waveform_names());

        let moved = par.with(PHI_REF, 1.0).unwrap();
        assert_eq!(moved.get(PHI_REF).unwrap(), 1.0);
        assert!(matches!(par.get("s1z"), Err(Error::MissingParameter(_))));
    }

    #[test]
    fn test_sample_table_set_column() {
        let mut t = SampleTable::new(vec!["m1".to_string()]);
        t.push_row(vec![1.0]).unwrap();
        t.push_row(vec![2.0]).unwrap();
        assert!(t.push_row(vec![1.0, 2.0]).is_err());

        t.set_column("phi_ref", vec![0.1, 0.2]).unwrap();
        assert_eq!(t.columns, vec!["m1", "phi_ref"]);
        t.set_column("m1", vec![3.0, 4.0]).unwrap();
        assert_eq!(t.column("m1").unwrap(), vec![3.0, 4.0]);
        assert_eq!(t.column("phi_ref").unwrap(), vec![0.1, 0.2]);
        assert!(t.set_column("x", vec![1.0]).is_err());
        t.validate().unwrap();
    }
}
