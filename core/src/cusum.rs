//! Smoothed CUSUM change-point statistic.
//!
//! `cusum[0] = 0`, then for each sample
//! `cusum[i+1] = s * (cusum[i] + x[i] - reference) + (1 - s) * cusum[i]`.
//! With `s = 1` this is the raw cumulative sum; smaller `s` damps single-week
//! spikes at the cost of detection latency.

use crate::{
    config::DetectorConfig,
    error::{SimError, SimResult},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CusumResult {
    /// One longer than the input; starts at 0.
    pub cusum_values: Vec<f64>,
    /// First `i` with `|cusum[i+1]| > threshold`.
    pub anomaly_index: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CusumDetector {
    smoothing: f64,
    reference: f64,
    threshold: f64,
    ignore_zero_values: bool,
}

impl CusumDetector {
    pub fn new(smoothing: f64, reference: f64, threshold: f64, ignore_zero_values: bool) -> SimResult<Self> {
        if !(0.0..=1.0).contains(&smoothing) {
            return Err(SimError::config("smoothing", format!("must be in [0, 1], got {smoothing}")));
        }
        if !reference.is_finite() {
            return Err(SimError::config("reference", format!("must be finite, got {reference}")));
        }
        if !threshold.is_finite() || threshold < 0.0 {
            return Err(SimError::config("threshold", format!("must be finite and >= 0, got {threshold}")));
        }
        Ok(Self { smoothing, reference, threshold, ignore_zero_values })
    }

    pub fn from_config(config: &DetectorConfig) -> SimResult<Self> {
        Self::new(
            config.smoothing,
            config.reference,
            config.resolved_threshold(),
            config.ignore_zero_values,
        )
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn detect(&self, signal: &[f64]) -> CusumResult {
        let s = self.smoothing;
        let mut cusum_values = Vec::with_capacity(signal.len() + 1);
        cusum_values.push(0.0);
        let mut anomaly_index = None;
        let mut current = 0.0;

        for (i, &x) in signal.iter().enumerate() {
            if !(self.ignore_zero_values && x == 0.0) {
                current = s * (current + x - self.reference) + (1.0 - s) * current;
            }
            cusum_values.push(current);
            if anomaly_index.is_none() && current.abs() > self.threshold {
                anomaly_index = Some(i);
            }
        }

        CusumResult { cusum_values, anomaly_index }
    }
}
