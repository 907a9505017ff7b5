//! Diagnostics reported by builders that calibrate to quotes.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Fit of one calibrated object: residual per pillar.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CalibrationRecord {
    pub pillars: Vec<String>,
    pub residuals: Vec<f64>,
}

impl CalibrationRecord {
    pub fn new(pillars: Vec<String>, residuals: Vec<f64>) -> Self {
        Self { pillars, residuals }
    }

    pub fn max_abs_residual(&self) -> f64 {
        self.residuals.iter().fold(0.0_f64, |m, r| m.max(r.abs()))
    }
}

/// Calibration records of every built object, keyed by spec name (swap
/// indices by `name@configuration`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CalibrationInfo {
    pub records: BTreeMap<String, CalibrationRecord>,
}

impl CalibrationInfo {
    pub fn new() -> Self { Self::default() }

    pub fn insert(&mut self, name: impl Into<String>, record: CalibrationRecord) {
        self.records.entry(name.into()).or_insert(record);
    }

    pub fn get(&self, name: &str) -> Option<&CalibrationRecord> {
        self.records.get(name)
    }

    pub fn len(&self) -> usize { self.records.len() }

    pub fn is_empty(&self) -> bool { self.records.is_empty() }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_abs_residual() {
        let r = CalibrationRecord::new(vec!["1Y".into(), "5Y".into()], vec![1e-9, -3e-8]);
        assert_eq!(r.max_abs_residual(), 3e-8);
        assert_eq!(CalibrationRecord::default().max_abs_residual(), 0.0);
    }

    #[test]
    fn test_info_serializes_records() {
        let mut info = CalibrationInfo::new();
        info.insert("Yield/EUR/EUR1D", CalibrationRecord::new(vec!["1Y".into()], vec![0.0]));
        let back: CalibrationInfo = serde_json::from_str(&info.to_json().unwrap()).unwrap();
        assert_eq!(back, info);
    }
}
